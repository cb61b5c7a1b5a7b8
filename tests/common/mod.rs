//! Shared test helpers: a recording sink, a scripted policy and a harness
//! that turns "finger down / move / up" calls into engine frames.
#![allow(dead_code)]

use std::collections::BTreeMap;

use hidpad::config::{EngineConfig, EngineSettings};
use hidpad::engine::TouchEngine;
use hidpad::hid::{HidSink, MouseButton, ScrollAxis};
use hidpad::policy::{Gesture, GestureOutcome, GesturePolicy};
use hidpad::touch::{TouchAction, TouchFrame, TouchSample, ViewBounds};

/// Surface used by all engine tests: 0–1000 in both axes.
pub const VIEW: ViewBounds = ViewBounds {
    min_x: 0.0,
    min_y: 0.0,
    max_x: 1000.0,
    max_y: 1000.0,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkEvent {
    Press(MouseButton),
    Release(MouseButton),
    Click(MouseButton),
    Move(i16, i16),
    Scroll(i8, i8),
}

#[derive(Debug)]
pub struct RecordingSink {
    pub events: Vec<SinkEvent>,
    pub connected: bool,
    pub smooth: bool,
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            connected: true,
            smooth: true,
        }
    }
}

impl RecordingSink {
    pub fn moves(&self) -> Vec<(i16, i16)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Move(x, y) => Some((*x, *y)),
                _ => None,
            })
            .collect()
    }

    pub fn scrolls(&self) -> Vec<(i8, i8)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Scroll(y, x) => Some((*y, *x)),
                _ => None,
            })
            .collect()
    }

    pub fn clicks(&self) -> Vec<MouseButton> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Click(b) => Some(*b),
                _ => None,
            })
            .collect()
    }
}

impl HidSink for RecordingSink {
    fn press(&mut self, button: MouseButton) {
        self.events.push(SinkEvent::Press(button));
    }

    fn release(&mut self, button: MouseButton) {
        self.events.push(SinkEvent::Release(button));
    }

    fn click(&mut self, button: MouseButton) {
        self.events.push(SinkEvent::Click(button));
    }

    fn move_relative(&mut self, dx: i16, dy: i16) {
        self.events.push(SinkEvent::Move(dx, dy));
    }

    fn scroll(&mut self, delta_y: i8, delta_x: i8) {
        self.events.push(SinkEvent::Scroll(delta_y, delta_x));
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn is_smooth_scroll_enabled(&self, _axis: ScrollAxis) -> bool {
        self.smooth
    }
}

/// Policy that records every gesture and answers with a fixed outcome.
#[derive(Debug)]
pub struct ScriptedPolicy {
    pub seen: Vec<Gesture>,
    pub outcome: GestureOutcome,
}

impl ScriptedPolicy {
    pub fn answering(outcome: GestureOutcome) -> Self {
        Self {
            seen: Vec::new(),
            outcome,
        }
    }
}

impl GesturePolicy for ScriptedPolicy {
    fn on_gesture(&mut self, gesture: Gesture, _sink: &mut dyn HidSink) -> GestureOutcome {
        self.seen.push(gesture);
        self.outcome
    }
}

/// Density 1, unit sensitivities: one pixel is one unit and dp thresholds
/// are pixel thresholds.
pub fn unit_settings() -> EngineSettings {
    EngineSettings {
        mouse_sensitivity: 1.0,
        scroll_sensitivity: 1.0,
        invert_scroll: false,
        fling_enabled: true,
        density: 1.0,
    }
}

pub fn unit_config() -> EngineConfig {
    EngineConfig::new(unit_settings())
}

/// Drives a [`TouchEngine`] with per-finger calls.
pub struct Harness<P: GesturePolicy> {
    pub engine: TouchEngine,
    pub sink: RecordingSink,
    pub policy: P,
    contacts: BTreeMap<i32, TouchSample>,
}

impl Harness<ScriptedPolicy> {
    pub fn new() -> Self {
        Self::with_policy(ScriptedPolicy::answering(GestureOutcome::Unhandled))
    }
}

impl<P: GesturePolicy> Harness<P> {
    pub fn with_policy(policy: P) -> Self {
        Self::with_config(unit_config(), policy)
    }

    pub fn with_config(config: EngineConfig, policy: P) -> Self {
        Self {
            engine: TouchEngine::new(config, VIEW),
            sink: RecordingSink::default(),
            policy,
            contacts: BTreeMap::new(),
        }
    }

    fn frame(&self, action: TouchAction, t: u64) -> TouchFrame {
        let samples = self
            .contacts
            .values()
            .map(|s| TouchSample { time_ms: t, ..*s })
            .collect();
        TouchFrame::new(action, t, samples)
    }

    pub fn send(&mut self, frame: &TouchFrame) {
        self.engine.on_frame(frame, &mut self.sink, &mut self.policy);
    }

    pub fn down(&mut self, id: i32, x: f64, y: f64, t: u64) {
        self.contacts
            .insert(id, TouchSample::new(id, x, y, 1.0, t));
        let frame = self.frame(TouchAction::Down(id), t);
        self.send(&frame);
    }

    pub fn move_to(&mut self, id: i32, x: f64, y: f64, t: u64) {
        self.move_many(&[(id, x, y)], t);
    }

    pub fn move_pressed(&mut self, id: i32, x: f64, y: f64, pressure: f64, t: u64) {
        if let Some(s) = self.contacts.get_mut(&id) {
            s.x = x;
            s.y = y;
            s.pressure = pressure;
        }
        let frame = self.frame(TouchAction::Move, t);
        self.send(&frame);
    }

    pub fn move_many(&mut self, moves: &[(i32, f64, f64)], t: u64) {
        for &(id, x, y) in moves {
            if let Some(s) = self.contacts.get_mut(&id) {
                s.x = x;
                s.y = y;
            }
        }
        let frame = self.frame(TouchAction::Move, t);
        self.send(&frame);
    }

    pub fn up(&mut self, id: i32, t: u64) {
        let frame = self.frame(TouchAction::Up(id), t);
        self.contacts.remove(&id);
        self.send(&frame);
    }

    pub fn cancel(&mut self, t: u64) {
        self.contacts.clear();
        self.send(&TouchFrame::cancel(t));
    }

    pub fn poll(&mut self, t: u64) {
        self.engine.poll(t, &mut self.sink);
    }

    /// Poll every `step` ms from `from` up to and including `to`.
    pub fn run_until(&mut self, from: u64, to: u64, step: u64) {
        let mut t = from;
        while t <= to {
            self.poll(t);
            t += step;
        }
    }

    /// Quick tap with one finger at the centre of the view.
    pub fn tap(&mut self, t: u64) {
        self.down(1, 500.0, 500.0, t);
        self.up(1, t + 40);
    }
}
