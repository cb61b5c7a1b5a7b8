//! Tap counting and click arbitration.

use crate::config::Thresholds;
use crate::hid::MouseButton;
use crate::pointer::Step;
use crate::timer::Timer;

/// A touch lasting longer than this is not a tap.
pub const TAP_TIMEOUT_MS: u64 = 150;

/// How long a single tap waits for a second one before clicking.
pub const DOUBLE_TAP_TIMEOUT_MS: u64 = 150;

/// Result of lifting the last finger while tap tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapRelease {
    /// Too long or too far to count as a tap.
    Rejected,
    /// First tap registered; a click is deferred.
    Pending,
    /// Second tap registered; both clicks are due now.
    Double(Option<MouseButton>),
}

#[derive(Debug, Clone)]
pub struct TapEngine {
    max_distance_sq: f64,
    max_multitouch_distance_sq: f64,

    max_touch_points: usize,
    tap_count: u32,
    touch_start_ms: u64,
    travel: (f64, f64),
    click_timer: Timer,
}

impl TapEngine {
    pub fn new(thresholds: &Thresholds) -> Self {
        Self {
            max_distance_sq: thresholds.max_tap_distance_sq,
            max_multitouch_distance_sq: thresholds.max_multitouch_tap_distance_sq,
            max_touch_points: 0,
            tap_count: 0,
            touch_start_ms: 0,
            travel: (0.0, 0.0),
            click_timer: Timer::default(),
        }
    }

    pub fn tap_count(&self) -> u32 {
        self.tap_count
    }

    pub fn max_touch_points(&self) -> usize {
        self.max_touch_points
    }

    /// Button the taps seen so far stand for.
    pub fn button(&self) -> Option<MouseButton> {
        MouseButton::for_pointer_count(self.max_touch_points)
    }

    pub fn has_pending_click(&self) -> bool {
        self.click_timer.is_armed()
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.click_timer.deadline()
    }

    /// Forget all taps and cancel a pending click.
    pub fn reset(&mut self) {
        self.click_timer.cancel();
        self.max_touch_points = 0;
        self.tap_count = 0;
        self.travel = (0.0, 0.0);
    }

    /// First finger of a new touch landed.
    pub fn touch_started(&mut self, now_ms: u64) {
        self.click_timer.cancel();
        self.touch_start_ms = now_ms;
        self.travel = (0.0, 0.0);
    }

    pub fn observe_pointers(&mut self, count: usize) {
        self.max_touch_points = self.max_touch_points.max(count);
    }

    pub fn add_travel(&mut self, step: &Step) {
        self.travel.0 += step.dx();
        self.travel.1 += step.dy();
    }

    fn limit_sq(&self) -> f64 {
        if self.max_touch_points > 1 {
            self.max_multitouch_distance_sq
        } else {
            self.max_distance_sq
        }
    }

    /// Whether the current touch can no longer be a tap.
    pub fn violates(&self, now_ms: u64) -> bool {
        let (dx, dy) = self.travel;
        now_ms.saturating_sub(self.touch_start_ms) > TAP_TIMEOUT_MS
            || dx * dx + dy * dy > self.limit_sq()
    }

    /// Last finger lifted.
    pub fn release(&mut self, now_ms: u64) -> TapRelease {
        if self.violates(now_ms) {
            self.reset();
            return TapRelease::Rejected;
        }
        self.tap_count += 1;
        if self.tap_count >= 2 {
            let button = self.button();
            self.reset();
            return TapRelease::Double(button);
        }
        self.click_timer.schedule(now_ms, DOUBLE_TAP_TIMEOUT_MS);
        TapRelease::Pending
    }

    /// Whether the deferred single click is due. Disarms the timer when it is.
    pub fn click_due(&mut self, now_ms: u64) -> bool {
        self.click_timer.fire_if_due(now_ms)
    }
}
