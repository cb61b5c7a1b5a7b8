//! Pixel deltas to relative HID motion units.

use crate::config::EngineConfig;
use crate::hid::{MOVE_LIMIT, clamp_move};
use crate::touch::{TouchSample, ViewBounds};

/// Units injected per sample while dragging near an edge.
pub const EDGE_MOVE_STEP: i64 = 4;

/// Converts main-pointer motion into relative units, keeping the
/// fractional remainder between samples.
#[derive(Debug, Clone)]
pub struct MotionTranslator {
    /// Device pixels per relative unit.
    px_per_unit: f64,
    edge_threshold: f64,
    carry_x: f64,
    carry_y: f64,
}

impl MotionTranslator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            px_per_unit: config.settings.density / config.settings.mouse_sensitivity,
            edge_threshold: config.thresholds.pointer_edge_move,
            carry_x: 0.0,
            carry_y: 0.0,
        }
    }

    pub fn reset(&mut self) {
        self.carry_x = 0.0;
        self.carry_y = 0.0;
    }

    /// Pixel motion not yet turned into units.
    pub fn carry(&self) -> (f64, f64) {
        (self.carry_x, self.carry_y)
    }

    /// Back-convert units into the pixel distance they stand for.
    pub fn units_to_px(&self, units: i64) -> f64 {
        units as f64 * self.px_per_unit
    }

    /// Add pixel motion without emitting anything.
    pub fn accumulate(&mut self, dx: f64, dy: f64) {
        self.carry_x += dx;
        self.carry_y += dy;
    }

    /// Convert the accumulated motion plus `extra` units into a report.
    ///
    /// Only the converted part of the carry is removed; `extra` is never
    /// folded into the carry.
    pub fn take(&mut self, extra: (i64, i64)) -> (i16, i16) {
        let ux = Self::whole_units(self.carry_x / self.px_per_unit);
        let uy = Self::whole_units(self.carry_y / self.px_per_unit);
        self.carry_x -= self.units_to_px(ux);
        self.carry_y -= self.units_to_px(uy);
        (clamp_move(ux + extra.0), clamp_move(uy + extra.1))
    }

    /// Accumulate a delta and convert it in one step.
    pub fn translate(&mut self, dx: f64, dy: f64) -> (i16, i16) {
        self.accumulate(dx, dy);
        self.take((0, 0))
    }

    fn whole_units(units: f64) -> i64 {
        let limit = MOVE_LIMIT as f64;
        units.floor().clamp(-limit, limit) as i64
    }

    /// Constant push toward any edge the pointer is resting near.
    pub fn edge_nudge(&self, at: &TouchSample, view: &ViewBounds) -> (i64, i64) {
        let axis = |pos: f64, min: f64, max: f64| {
            if pos - min < self.edge_threshold {
                -EDGE_MOVE_STEP
            } else if max - pos < self.edge_threshold {
                EDGE_MOVE_STEP
            } else {
                0
            }
        };
        (
            axis(at.x, view.min_x, view.max_x),
            axis(at.y, view.min_y, view.max_y),
        )
    }
}
