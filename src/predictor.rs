//! Touch-end prediction.
//!
//! Touch sensors report drifting positions while a finger peels off the
//! glass. Falling pressure with an almost stationary contact is taken as the
//! start of a lift-off, and motion is dropped until the prediction either
//! expires or is contradicted.

use crate::touch::TouchSample;

/// How long a prediction may suppress motion.
pub const TOUCH_END_PREDICT_MS: u64 = 50;

#[derive(Debug, Clone, Default)]
pub struct TouchEndPredictor {
    max_distance_sq: f64,
    prediction: Option<Prediction>,
}

#[derive(Debug, Clone, Copy)]
struct Prediction {
    time_ms: u64,
    x: f64,
    y: f64,
}

impl TouchEndPredictor {
    pub fn new(max_distance_sq: f64) -> Self {
        Self {
            max_distance_sq,
            prediction: None,
        }
    }

    pub fn is_predicting(&self) -> bool {
        self.prediction.is_some()
    }

    pub fn reset(&mut self) {
        self.prediction = None;
    }

    /// Feed the main pointer's previous and current sample.
    ///
    /// Returns `true` when motion for `current` must not be emitted.
    pub fn should_suppress(&mut self, previous: &TouchSample, current: &TouchSample) -> bool {
        if let Some(p) = self.prediction {
            let expired = current.time_ms.saturating_sub(p.time_ms) > TOUCH_END_PREDICT_MS;
            let pressing_again = current.pressure > previous.pressure;
            let drifted = current.distance_sq_to(p.x, p.y) > self.max_distance_sq;
            if expired || pressing_again || drifted {
                self.prediction = None;
                return false;
            }
            return true;
        }

        let releasing = current.pressure < previous.pressure;
        let still = current.distance_sq_to(previous.x, previous.y) < self.max_distance_sq;
        if releasing && still {
            self.prediction = Some(Prediction {
                time_ms: current.time_ms,
                x: current.x,
                y: current.y,
            });
            return true;
        }
        false
    }
}
