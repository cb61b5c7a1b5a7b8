//! Active pointer bookkeeping and main-pointer motion.

use log::debug;

use crate::touch::{TouchFrame, TouchSample};

/// Movement of the main pointer between two consecutive frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub previous: TouchSample,
    pub current: TouchSample,
}

impl Step {
    pub fn dx(&self) -> f64 {
        self.current.x - self.previous.x
    }

    pub fn dy(&self) -> f64 {
        self.current.y - self.previous.y
    }
}

/// Ordered set of active pointer ids. The oldest id is the main pointer.
#[derive(Debug, Default)]
pub struct PointerTracker {
    ids: Vec<i32>,
    baseline: Option<TouchSample>,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The oldest pointer still down.
    pub fn main(&self) -> Option<i32> {
        self.ids.first().copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[i32] {
        &self.ids
    }

    pub fn pointer_down(&mut self, frame: &TouchFrame, id: i32) {
        if self.ids.contains(&id) {
            return;
        }
        self.ids.push(id);
        if self.ids.len() == 1 {
            self.rebase(frame);
        }
    }

    pub fn pointer_up(&mut self, frame: &TouchFrame, id: i32) {
        let was_main = self.main() == Some(id);
        self.ids.retain(|&p| p != id);
        if was_main {
            self.rebase(frame);
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.baseline = None;
    }

    /// Restart motion measurement from the main pointer's position in `frame`.
    pub fn rebase(&mut self, frame: &TouchFrame) {
        self.baseline = self.main().and_then(|id| frame.sample(id)).copied();
    }

    /// Advance the baseline to `frame` and return the main pointer's step.
    ///
    /// Returns `None` when there is no previous position to measure from,
    /// including when the main pointer vanished from the frame. In that case
    /// ids absent from the frame are dropped, the oldest remaining id becomes
    /// main and its position becomes the new baseline.
    pub fn track(&mut self, frame: &TouchFrame) -> Option<Step> {
        let main = self.main()?;
        let Some(current) = frame.sample(main).copied() else {
            self.ids.retain(|&id| frame.sample(id).is_some());
            debug!(
                "main pointer {main} missing from frame, main is now {:?}",
                self.main()
            );
            self.rebase(frame);
            return None;
        };

        let previous = self.baseline.replace(current)?;
        if previous.id != current.id {
            return None;
        }
        Some(Step { previous, current })
    }
}
