//! Touch event classification and frame assembly - no I/O, no hardware, fully testable.
//!
//! Raw multi-touch (protocol B) events are reduced to [`TouchEvent`]s and
//! then assembled into [`TouchFrame`]s at every `SYN_REPORT`, which is the
//! shape the engine consumes.

use std::collections::BTreeMap;

use crate::touch::{TouchAction, TouchFrame, TouchSample};

// -- TouchEvent -----------------------------------------------

/// Intermediate representation of a relevant touch event,
/// decoupled from `evdev` types for testability.
#[derive(Debug, Clone, PartialEq)]
pub enum TouchEvent {
    Slot(i32),
    TrackingId(i32),
    FingerUp,
    PositionX(f64),
    PositionY(f64),
    Pressure(f64),
    SynReport,
    /// The kernel dropped events; slot state is unknown.
    SynDropped,
}

// -- FrameAssembler -------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Landing,
    Active,
    Lifting,
}

#[derive(Debug, Clone, Copy)]
struct Contact {
    id: i32,
    x: f64,
    y: f64,
    pressure: f64,
    phase: Phase,
    changed: bool,
}

impl Contact {
    fn sample(&self, time_ms: u64) -> TouchSample {
        TouchSample::new(self.id, self.x, self.y, self.pressure, time_ms)
    }
}

/// Per-slot contact state, turned into frames on each report.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    slot: i32,
    contacts: BTreeMap<i32, Contact>,
}

impl FrameAssembler {
    /// Pressure assumed for devices that do not report it.
    pub const DEFAULT_PRESSURE: f64 = 1.0;

    pub fn new() -> Self {
        Self::default()
    }

    /// Number of contacts currently on the surface.
    pub fn active_contacts(&self) -> usize {
        self.contacts
            .values()
            .filter(|c| c.phase != Phase::Landing)
            .count()
    }

    fn current(&mut self) -> Option<&mut Contact> {
        self.contacts.get_mut(&self.slot)
    }

    /// Apply one event; returns the frames completed by it.
    pub fn push(&mut self, event: &TouchEvent, time_ms: u64) -> Vec<TouchFrame> {
        match event {
            TouchEvent::Slot(slot) => self.slot = *slot,
            TouchEvent::TrackingId(id) => {
                let (x, y, pressure) = self
                    .current()
                    .map_or((0.0, 0.0, Self::DEFAULT_PRESSURE), |c| (c.x, c.y, c.pressure));
                self.contacts.insert(
                    self.slot,
                    Contact {
                        id: *id,
                        x,
                        y,
                        pressure,
                        phase: Phase::Landing,
                        changed: false,
                    },
                );
            }
            TouchEvent::FingerUp => {
                let phase = self.current().map(|c| c.phase);
                if phase == Some(Phase::Landing) {
                    self.contacts.remove(&self.slot);
                } else if let Some(c) = self.current() {
                    c.phase = Phase::Lifting;
                }
            }
            TouchEvent::PositionX(x) => {
                if let Some(c) = self.current() {
                    c.x = *x;
                    c.changed = true;
                }
            }
            TouchEvent::PositionY(y) => {
                if let Some(c) = self.current() {
                    c.y = *y;
                    c.changed = true;
                }
            }
            TouchEvent::Pressure(p) => {
                if let Some(c) = self.current() {
                    c.pressure = *p;
                    c.changed = true;
                }
            }
            TouchEvent::SynReport => return self.flush(time_ms),
            TouchEvent::SynDropped => {
                self.contacts.clear();
                return vec![TouchFrame::cancel(time_ms)];
            }
        }
        Vec::new()
    }

    fn samples(&self, time_ms: u64) -> Vec<TouchSample> {
        self.contacts
            .values()
            .filter(|c| c.phase != Phase::Landing)
            .map(|c| c.sample(time_ms))
            .collect()
    }

    /// Emit frames for a `SYN_REPORT`: lifts, then motion, then landings.
    fn flush(&mut self, time_ms: u64) -> Vec<TouchFrame> {
        let mut frames = Vec::new();

        let moved = self
            .contacts
            .values()
            .any(|c| c.phase == Phase::Active && c.changed);

        let lifting: Vec<i32> = self
            .contacts
            .iter()
            .filter(|(_, c)| c.phase == Phase::Lifting)
            .map(|(slot, _)| *slot)
            .collect();
        for slot in lifting {
            let samples = self.samples(time_ms);
            if let Some(c) = self.contacts.remove(&slot) {
                frames.push(TouchFrame::new(TouchAction::Up(c.id), time_ms, samples));
            }
        }

        if moved {
            frames.push(TouchFrame::new(
                TouchAction::Move,
                time_ms,
                self.samples(time_ms),
            ));
        }

        let landing: Vec<i32> = self
            .contacts
            .iter()
            .filter(|(_, c)| c.phase == Phase::Landing)
            .map(|(slot, _)| *slot)
            .collect();
        for slot in landing {
            if let Some(c) = self.contacts.get_mut(&slot) {
                c.phase = Phase::Active;
                let id = c.id;
                frames.push(TouchFrame::new(
                    TouchAction::Down(id),
                    time_ms,
                    self.samples(time_ms),
                ));
            }
        }

        for c in self.contacts.values_mut() {
            c.changed = false;
        }
        frames
    }
}

// -- Core processing ------------------------------------------

/// Feed a sequence of [`TouchEvent`]s into an assembler and collect the
/// frames they complete, all stamped with `time_ms`.
pub fn process_touch_events(
    assembler: &mut FrameAssembler,
    events: &[TouchEvent],
    time_ms: u64,
) -> Vec<TouchFrame> {
    events
        .iter()
        .flat_map(|event| assembler.push(event, time_ms))
        .collect()
}

// -- Helpers --------------------------------------------------

/// Parse a USB vendor:product ID string into `(vendor, product)`.
///
/// Accepts formats like `"1234:5678"` or `"USB:1234:5678"` (case-insensitive).
/// Returns `None` if the format is invalid or the hex values cannot be parsed.
pub fn parse_usb_id(raw: &str) -> Option<(u16, u16)> {
    let cleaned = raw.to_lowercase().replace("usb:", "");
    let (vendor_str, product_str) = cleaned.split_once(':')?;
    let vendor = u16::from_str_radix(vendor_str, 16).ok()?;
    let product = u16::from_str_radix(product_str, 16).ok()?;
    Some((vendor, product))
}

/// Classify a single `evdev::InputEvent` into one of the touch-relevant
/// categories the assembler cares about.  Returns `None` for irrelevant events.
pub fn classify_event(event: &evdev::InputEvent) -> Option<TouchEvent> {
    use evdev::{AbsoluteAxisType, InputEventKind, Synchronization};

    match event.kind() {
        InputEventKind::AbsAxis(axis) => match axis {
            AbsoluteAxisType::ABS_MT_SLOT => Some(TouchEvent::Slot(event.value())),
            AbsoluteAxisType::ABS_MT_POSITION_X => {
                Some(TouchEvent::PositionX(event.value() as f64))
            }
            AbsoluteAxisType::ABS_MT_POSITION_Y => {
                Some(TouchEvent::PositionY(event.value() as f64))
            }
            AbsoluteAxisType::ABS_MT_PRESSURE => Some(TouchEvent::Pressure(event.value() as f64)),
            AbsoluteAxisType::ABS_MT_TRACKING_ID => {
                if event.value() == -1 {
                    Some(TouchEvent::FingerUp)
                } else {
                    Some(TouchEvent::TrackingId(event.value()))
                }
            }
            _ => None,
        },
        InputEventKind::Synchronization(Synchronization::SYN_REPORT) => {
            Some(TouchEvent::SynReport)
        }
        InputEventKind::Synchronization(Synchronization::SYN_DROPPED) => {
            Some(TouchEvent::SynDropped)
        }
        _ => None,
    }
}
