//! Classified gestures and what to do with them.
use std::collections::HashMap;
use std::io;
use std::process::{Command, ExitStatus};
use std::thread::{self, JoinHandle};

use log::{debug, error, info, warn};
use strum::{Display, EnumString, IntoStaticStr};

use crate::config::GestureConfig;
use crate::hid::{HidSink, MouseButton, ScrollAxis};

/// Screen edge a touch started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

/// Category of a classified gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum GestureKind {
    #[strum(serialize = "edge_top")]
    EdgeTop,
    #[strum(serialize = "edge_right")]
    EdgeRight,
    #[strum(serialize = "edge_bottom")]
    EdgeBottom,
    #[strum(serialize = "edge_left")]
    EdgeLeft,
    #[strum(serialize = "two_finger")]
    TwoFinger,
    #[strum(serialize = "three_finger")]
    ThreeFinger,
}

impl From<Edge> for GestureKind {
    fn from(edge: Edge) -> Self {
        match edge {
            Edge::Top => GestureKind::EdgeTop,
            Edge::Right => GestureKind::EdgeRight,
            Edge::Bottom => GestureKind::EdgeBottom,
            Edge::Left => GestureKind::EdgeLeft,
        }
    }
}

impl GestureKind {
    /// Multi-finger category for a pointer count, if there is one.
    pub fn for_pointer_count(pointers: usize) -> Option<GestureKind> {
        match pointers {
            2 => Some(GestureKind::TwoFinger),
            3 => Some(GestureKind::ThreeFinger),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum Direction {
    #[strum(serialize = "up")]
    Up,
    #[strum(serialize = "right")]
    Right,
    #[strum(serialize = "down")]
    Down,
    #[strum(serialize = "left")]
    Left,
}

impl Direction {
    /// Direction of the dominant axis of a displacement.
    pub fn from_delta(dx: f64, dy: f64) -> Direction {
        if dx.abs() > dy.abs() {
            if dx > 0.0 { Direction::Right } else { Direction::Left }
        } else if dy > 0.0 {
            Direction::Down
        } else {
            Direction::Up
        }
    }

    pub fn axis(self) -> ScrollAxis {
        match self {
            Direction::Up | Direction::Down => ScrollAxis::Vertical,
            Direction::Left | Direction::Right => ScrollAxis::Horizontal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Gesture {
    pub kind: GestureKind,
    pub direction: Direction,
}

impl Gesture {
    pub fn new(kind: GestureKind, direction: Direction) -> Self {
        Self { kind, direction }
    }

    /// Config key of this gesture, e.g. `edge_left_right`.
    pub fn name(&self) -> String {
        format!("{}_{}", self.kind, self.direction)
    }
}

/// What the policy did with a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutcome {
    /// Not handled; the engine falls back to its default behaviour.
    Unhandled,
    /// Handled; the rest of the touch is ignored.
    Consumed,
    /// Handled by scrolling along the axis for the rest of the touch.
    Scroll(ScrollAxis),
}

/// Receives classified gestures before the engine's default handling.
pub trait GesturePolicy {
    fn on_gesture(&mut self, gesture: Gesture, sink: &mut dyn HidSink) -> GestureOutcome;
}

/// A configured gesture action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GestureAction {
    Scroll,
    Button(MouseButton),
    Ignore,
    Command(String),
}

impl GestureAction {
    pub fn parse(action: &str) -> GestureAction {
        match action.trim() {
            "scroll" => GestureAction::Scroll,
            "back" => GestureAction::Button(MouseButton::Back),
            "forward" => GestureAction::Button(MouseButton::Forward),
            "ignore" => GestureAction::Ignore,
            other => GestureAction::Command(other.to_string()),
        }
    }
}

/// Look up the action for a gesture in the device's gesture table.
///
/// Configured entries win; a disabled or action-less entry yields `None`.
/// Unconfigured two-finger swipes default to scrolling.
pub fn resolve_action(
    gesture: Gesture,
    gestures: &HashMap<String, GestureConfig>,
) -> Option<GestureAction> {
    match gestures.get(&gesture.name()) {
        Some(gc) => gc
            .action
            .as_deref()
            .filter(|_| gc.enabled)
            .map(GestureAction::parse),
        None if gesture.kind == GestureKind::TwoFinger => Some(GestureAction::Scroll),
        None => None,
    }
}

/// Policy driven by the `[gestures]` tables of the config file.
#[derive(Debug, Clone)]
pub struct ActionPolicy {
    device_id: String,
    gestures: HashMap<String, GestureConfig>,
}

impl ActionPolicy {
    pub fn new(device_id: impl Into<String>, gestures: HashMap<String, GestureConfig>) -> Self {
        Self {
            device_id: device_id.into(),
            gestures,
        }
    }
}

/// Run `cmd` through `sh -c` and reap it on a background thread.
///
/// The handle yields the exit status; dropping it detaches the waiter.
pub fn spawn_action(cmd: &str) -> io::Result<JoinHandle<Option<ExitStatus>>> {
    let mut child = Command::new("sh").arg("-c").arg(cmd).spawn()?;
    debug!("Spawned action: {cmd}");
    let cmd = cmd.to_owned();
    thread::Builder::new()
        .name("action".into())
        .spawn(move || match child.wait() {
            Ok(status) if !status.success() => {
                warn!("Action '{cmd}' exited with {status}");
                Some(status)
            }
            Ok(status) => Some(status),
            Err(e) => {
                error!("Failed to wait for action '{cmd}': {e}");
                None
            }
        })
}

impl GesturePolicy for ActionPolicy {
    fn on_gesture(&mut self, gesture: Gesture, sink: &mut dyn HidSink) -> GestureOutcome {
        let Some(action) = resolve_action(gesture, &self.gestures) else {
            debug!("{}: {} unhandled", self.device_id, gesture.name());
            return GestureOutcome::Unhandled;
        };
        info!("{}: {}", self.device_id, gesture.name());
        match action {
            GestureAction::Scroll => GestureOutcome::Scroll(gesture.direction.axis()),
            GestureAction::Button(button) => {
                sink.click(button);
                GestureOutcome::Consumed
            }
            GestureAction::Ignore => GestureOutcome::Consumed,
            GestureAction::Command(cmd) => {
                if let Err(e) = spawn_action(&cmd) {
                    error!("Failed to execute action '{cmd}': {e}");
                }
                GestureOutcome::Consumed
            }
        }
    }
}
