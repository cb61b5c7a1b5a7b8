//! Cancellable one-shot deadlines polled by the owner of the engine.

/// A single pending deadline in engine milliseconds.
///
/// The owner asks for [`Timer::deadline`] to know how long it may sleep and
/// calls [`Timer::fire_if_due`] when it wakes. Cancelling takes effect
/// immediately; a cancelled timer never fires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timer {
    deadline: Option<u64>,
}

impl Timer {
    pub fn schedule(&mut self, now_ms: u64, delay_ms: u64) {
        self.deadline = Some(now_ms.saturating_add(delay_ms));
    }

    /// Disarm the timer. Returns whether it was armed.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<u64> {
        self.deadline
    }

    /// Disarm and return `true` if the deadline has been reached.
    pub fn fire_if_due(&mut self, now_ms: u64) -> bool {
        match self.deadline {
            Some(at) if now_ms >= at => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Earliest of two optional deadlines.
pub fn earliest(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}
