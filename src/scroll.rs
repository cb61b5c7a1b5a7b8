//! Wheel scrolling and post-release fling.

use log::debug;

use crate::config::EngineConfig;
use crate::hid::{HidSink, SCROLL_LIMIT, ScrollAxis, clamp_scroll};
use crate::pointer::Step;
use crate::timer::Timer;

/// Period of the fling loop.
pub const FLING_PERIOD_MS: u64 = 100;

/// Fraction of velocity lost per fling tick.
pub const FLING_FRICTION: f64 = 0.15;

/// Stepped wheels move this many times less per pixel than smooth ones.
pub const STEPPED_SCROLL_DIVISOR: f64 = 16.0;

/// Turns finger motion along one axis into wheel units.
#[derive(Debug, Clone)]
pub struct ScrollEngine {
    density: f64,
    sensitivity: f64,
    invert: bool,
    fling_enabled: bool,
    fling_threshold: f64,
    fling_stop: f64,

    axis: Option<ScrollAxis>,
    carry: f64,
    /// Pixels per fling period.
    velocity: f64,
    last_move_ms: Option<u64>,
    fling: Timer,
}

impl ScrollEngine {
    pub fn new(config: &EngineConfig) -> Self {
        let s = &config.settings;
        Self {
            density: s.density,
            sensitivity: s.scroll_sensitivity,
            invert: s.invert_scroll,
            fling_enabled: s.fling_enabled,
            fling_threshold: config.thresholds.fling,
            fling_stop: config.thresholds.fling_stop,
            axis: None,
            carry: 0.0,
            velocity: 0.0,
            last_move_ms: None,
            fling: Timer::default(),
        }
    }

    pub fn axis(&self) -> Option<ScrollAxis> {
        self.axis
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn is_flinging(&self) -> bool {
        self.fling.is_armed()
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.fling.deadline()
    }

    /// Start scrolling along `axis`, discarding any previous state.
    pub fn begin(&mut self, axis: ScrollAxis) {
        self.stop();
        self.axis = Some(axis);
    }

    /// Cancel any fling and forget the scroll mode.
    pub fn stop(&mut self) {
        self.fling.cancel();
        self.axis = None;
        self.carry = 0.0;
        self.velocity = 0.0;
        self.last_move_ms = None;
    }

    /// Scroll by the main pointer's motion.
    pub fn on_move(&mut self, step: &Step, sink: &mut dyn HidSink) {
        let Some(axis) = self.axis else {
            return;
        };
        let delta = match axis {
            ScrollAxis::Vertical => step.dy(),
            ScrollAxis::Horizontal => step.dx(),
        };
        self.track_velocity(delta, step);
        self.emit(axis, delta, sink);
    }

    /// Velocity is the per-step rate, smoothed over consecutive steps.
    fn track_velocity(&mut self, delta: f64, step: &Step) {
        let dt = step
            .current
            .time_ms
            .saturating_sub(step.previous.time_ms)
            .max(1) as f64;
        let instant = delta * FLING_PERIOD_MS as f64 / dt;
        self.velocity = match self.last_move_ms {
            Some(_) => (self.velocity + instant) / 2.0,
            None => instant,
        };
        self.last_move_ms = Some(step.current.time_ms);
    }

    /// Finger lifted. Returns `true` if a fling was started.
    pub fn release(&mut self, now_ms: u64) -> bool {
        let stale = self
            .last_move_ms
            .is_none_or(|last| now_ms.saturating_sub(last) > FLING_PERIOD_MS);
        if stale {
            self.velocity = 0.0;
        }
        if !self.fling_enabled || self.velocity.abs() <= self.fling_threshold {
            self.stop();
            return false;
        }
        debug!("fling starts at {:.1} px/period", self.velocity);
        self.fling.schedule(now_ms, FLING_PERIOD_MS);
        true
    }

    /// Run a due fling tick. Returns `true` while the fling continues.
    pub fn poll(&mut self, now_ms: u64, sink: &mut dyn HidSink) -> bool {
        if !self.fling.is_armed() {
            return false;
        }
        if !self.fling.fire_if_due(now_ms) {
            return true;
        }
        let Some(axis) = self.axis else {
            self.stop();
            return false;
        };
        if !sink.is_connected() {
            debug!("fling cancelled, sink disconnected");
            self.stop();
            return false;
        }

        self.velocity -= self.velocity * FLING_FRICTION;
        if self.velocity.abs() <= self.fling_stop {
            debug!("fling finished");
            self.stop();
            return false;
        }
        self.emit(axis, self.velocity, sink);
        self.fling.schedule(now_ms, FLING_PERIOD_MS);
        true
    }

    fn emit(&mut self, axis: ScrollAxis, delta_px: f64, sink: &mut dyn HidSink) {
        let mut sensitivity = self.sensitivity;
        if !sink.is_smooth_scroll_enabled(axis) {
            sensitivity /= STEPPED_SCROLL_DIVISOR;
        }
        let units_per_px = sensitivity / self.density;

        self.carry += delta_px;
        let limit = SCROLL_LIMIT as f64;
        let units = (self.carry * units_per_px).floor().clamp(-limit, limit) as i64;
        if units == 0 {
            return;
        }
        self.carry -= units as f64 / units_per_px;

        let value = clamp_scroll(if self.invert { units } else { -units });
        match axis {
            ScrollAxis::Vertical => sink.scroll(value, 0),
            ScrollAxis::Horizontal => sink.scroll(0, value),
        }
    }
}
