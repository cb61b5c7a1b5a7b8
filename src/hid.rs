//! HID sink abstraction: the relative-mouse surface the engine drives.

use strum::{Display, IntoStaticStr};

/// Largest relative motion a single report can carry, per axis.
pub const MOVE_LIMIT: i32 = 2047;

/// Largest wheel delta a single report can carry, per axis.
pub const SCROLL_LIMIT: i32 = 127;

/// A mouse button, encoded as its HID bitmask bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
pub enum MouseButton {
    #[strum(serialize = "primary")]
    Primary,
    #[strum(serialize = "secondary")]
    Secondary,
    #[strum(serialize = "middle")]
    Middle,
    #[strum(serialize = "back")]
    Back,
    #[strum(serialize = "forward")]
    Forward,
}

impl MouseButton {
    /// Bit of this button in the HID button byte.
    pub fn mask(self) -> u8 {
        match self {
            MouseButton::Primary => 0x01,
            MouseButton::Secondary => 0x02,
            MouseButton::Middle => 0x04,
            MouseButton::Back => 0x08,
            MouseButton::Forward => 0x10,
        }
    }

    /// Button a tap with `pointers` simultaneous fingers stands for.
    ///
    /// Counts other than 1, 2 or 3 map to no button.
    pub fn for_pointer_count(pointers: usize) -> Option<MouseButton> {
        match pointers {
            1 => Some(MouseButton::Primary),
            2 => Some(MouseButton::Secondary),
            3 => Some(MouseButton::Middle),
            _ => None,
        }
    }
}

/// Wheel axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ScrollAxis {
    #[strum(serialize = "vertical")]
    Vertical,
    #[strum(serialize = "horizontal")]
    Horizontal,
}

/// Receiver of HID mouse actions.
///
/// Values handed to `move_relative` and `scroll` are already clamped to
/// [`MOVE_LIMIT`] and [`SCROLL_LIMIT`].
pub trait HidSink {
    fn press(&mut self, button: MouseButton);
    fn release(&mut self, button: MouseButton);
    /// Press, hold briefly, release. Timing is up to the sink.
    fn click(&mut self, button: MouseButton);
    fn move_relative(&mut self, dx: i16, dy: i16);
    fn scroll(&mut self, delta_y: i8, delta_x: i8);
    fn is_connected(&self) -> bool;
    fn is_smooth_scroll_enabled(&self, axis: ScrollAxis) -> bool;
}

/// Clamp a relative motion value into the range a report can carry.
pub fn clamp_move(value: i64) -> i16 {
    value.clamp(-(MOVE_LIMIT as i64), MOVE_LIMIT as i64) as i16
}

/// Clamp a wheel value into the range a report can carry.
pub fn clamp_scroll(value: i64) -> i8 {
    value.clamp(-(SCROLL_LIMIT as i64), SCROLL_LIMIT as i64) as i8
}

/// Sink that only logs what it is asked to do. Used for `--dry-run`.
#[derive(Debug, Default)]
pub struct LogSink {
    pub smooth_vertical: bool,
    pub smooth_horizontal: bool,
}

impl HidSink for LogSink {
    fn press(&mut self, button: MouseButton) {
        log::info!("press {button}");
    }

    fn release(&mut self, button: MouseButton) {
        log::info!("release {button}");
    }

    fn click(&mut self, button: MouseButton) {
        log::info!("click {button}");
    }

    fn move_relative(&mut self, dx: i16, dy: i16) {
        log::debug!("move {dx},{dy}");
    }

    fn scroll(&mut self, delta_y: i8, delta_x: i8) {
        log::debug!("scroll {delta_y},{delta_x}");
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn is_smooth_scroll_enabled(&self, axis: ScrollAxis) -> bool {
        match axis {
            ScrollAxis::Vertical => self.smooth_vertical,
            ScrollAxis::Horizontal => self.smooth_horizontal,
        }
    }
}
