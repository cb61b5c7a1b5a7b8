//! Touch frame types shared by the device layer and the engine.

/// One contact as seen in a single frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchSample {
    pub id: i32,
    pub x: f64,
    pub y: f64,
    pub pressure: f64,
    pub time_ms: u64,
}

impl TouchSample {
    pub fn new(id: i32, x: f64, y: f64, pressure: f64, time_ms: u64) -> Self {
        Self {
            id,
            x,
            y,
            pressure,
            time_ms,
        }
    }

    pub fn distance_sq_to(&self, x: f64, y: f64) -> f64 {
        let dx = self.x - x;
        let dy = self.y - y;
        dx * dx + dy * dy
    }
}

/// What changed in a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchAction {
    /// A contact with this id landed.
    Down(i32),
    /// A contact with this id lifted; it is still present in the samples.
    Up(i32),
    Move,
    /// The stream was interrupted and the gesture must be abandoned.
    Cancel,
}

/// Snapshot of every contact on the surface at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct TouchFrame {
    pub action: TouchAction,
    pub time_ms: u64,
    pub samples: Vec<TouchSample>,
}

impl TouchFrame {
    pub fn new(action: TouchAction, time_ms: u64, samples: Vec<TouchSample>) -> Self {
        Self {
            action,
            time_ms,
            samples,
        }
    }

    pub fn cancel(time_ms: u64) -> Self {
        Self::new(TouchAction::Cancel, time_ms, Vec::new())
    }

    pub fn sample(&self, id: i32) -> Option<&TouchSample> {
        self.samples.iter().find(|s| s.id == id)
    }
}

/// The surface the touches land on, in device pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl ViewBounds {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }
}
