//! Touch-to-HID gesture engine.
//!
//! A single state machine consumes [`TouchFrame`]s and drives an
//! [`HidSink`]. It decides, without lookahead, whether a touch is a tap, a
//! pointer move or drag, a scroll or a navigational gesture handed to a
//! [`GesturePolicy`].
//!
//! The engine never blocks and never spawns. Deferred work (the single-click
//! timeout and the fling loop) is expressed as deadlines: the owner sleeps
//! until [`TouchEngine::next_deadline`] and then calls [`TouchEngine::poll`].

use log::debug;

use crate::config::EngineConfig;
use crate::hid::{HidSink, MouseButton, ScrollAxis};
use crate::motion::MotionTranslator;
use crate::pointer::{PointerTracker, Step};
use crate::policy::{Direction, Edge, Gesture, GestureKind, GestureOutcome, GesturePolicy};
use crate::predictor::TouchEndPredictor;
use crate::scroll::ScrollEngine;
use crate::tap::{TapEngine, TapRelease};
use crate::timer::earliest;
use crate::touch::{TouchAction, TouchFrame, TouchSample, ViewBounds};

/// Bookkeeping for a touch that has not yet been classified.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureSession {
    first: TouchSample,
    edge: Option<Edge>,
    travel: (f64, f64),
    resolved: bool,
    /// Pointer count changed; skip multi-finger classification for one frame.
    settling: bool,
    /// Entered from `Tap` after the tap was ruled out.
    tap_rejected: bool,
}

impl GestureSession {
    fn new(first: TouchSample, edge: Option<Edge>, tap_rejected: bool) -> Self {
        Self {
            first,
            edge,
            travel: (0.0, 0.0),
            resolved: false,
            settling: false,
            tap_rejected,
        }
    }

    pub fn first(&self) -> &TouchSample {
        &self.first
    }

    pub fn edge(&self) -> Option<Edge> {
        self.edge
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    fn travel_sq(&self) -> f64 {
        self.travel.0 * self.travel.0 + self.travel.1 * self.travel.1
    }

    fn pointer_count_changed(&mut self, count: usize) {
        if self.resolved {
            return;
        }
        if count > 1 {
            self.edge = None;
        }
        self.settling = true;
    }
}

/// Classifier state.
#[derive(Debug, Clone, PartialEq)]
pub enum State {
    Idle,
    /// Touch not classified yet.
    Gesture(GestureSession),
    /// Counting taps; a deferred click may be pending.
    Tap,
    /// Relative pointer motion, optionally with a held button.
    Pointer { button: Option<MouseButton> },
    /// Wheel scrolling; `releasing` while a fling runs after lift-off.
    Scroll { releasing: bool },
}

impl State {
    pub fn name(&self) -> &'static str {
        match self {
            State::Idle => "idle",
            State::Gesture(_) => "gesture",
            State::Tap => "tap",
            State::Pointer { .. } => "pointer",
            State::Scroll { .. } => "scroll",
        }
    }
}

pub struct TouchEngine {
    config: EngineConfig,
    view: ViewBounds,
    state: State,
    pointers: PointerTracker,
    predictor: TouchEndPredictor,
    motion: MotionTranslator,
    scroll: ScrollEngine,
    tap: TapEngine,
    offline: bool,
}

impl TouchEngine {
    pub fn new(config: EngineConfig, view: ViewBounds) -> Self {
        Self {
            view,
            state: State::Idle,
            pointers: PointerTracker::new(),
            predictor: TouchEndPredictor::new(config.thresholds.max_touch_end_predict_distance_sq),
            motion: MotionTranslator::new(&config),
            scroll: ScrollEngine::new(&config),
            tap: TapEngine::new(&config.thresholds),
            config,
            offline: false,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn pointers(&self) -> &PointerTracker {
        &self.pointers
    }

    /// When [`TouchEngine::poll`] next has work to do.
    pub fn next_deadline(&self) -> Option<u64> {
        earliest(self.tap.next_deadline(), self.scroll.next_deadline())
    }

    /// Process one touch frame.
    pub fn on_frame(
        &mut self,
        frame: &TouchFrame,
        sink: &mut dyn HidSink,
        policy: &mut dyn GesturePolicy,
    ) {
        self.check_connection(frame, sink);
        match frame.action {
            TouchAction::Down(id) => self.on_down(frame, id, sink),
            TouchAction::Up(id) => self.on_up(frame, id, sink),
            TouchAction::Move => self.on_move(frame, sink, policy),
            TouchAction::Cancel => self.cancel(sink),
        }
    }

    /// Run timers that are due at `now_ms`.
    pub fn poll(&mut self, now_ms: u64, sink: &mut dyn HidSink) {
        match self.state {
            State::Tap if self.tap.click_due(now_ms) => {
                match self.tap.button() {
                    Some(button) if sink.is_connected() => sink.click(button),
                    _ => {}
                }
                self.to_idle();
            }
            State::Scroll { releasing: true } => {
                if !self.scroll.poll(now_ms, sink) {
                    self.to_idle();
                }
            }
            _ => {}
        }
    }

    /// Abandon the touch: release any held button and drop all timers.
    pub fn cancel(&mut self, sink: &mut dyn HidSink) {
        self.release_held(sink);
        self.pointers.clear();
        self.to_idle();
    }

    fn release_held(&mut self, sink: &mut dyn HidSink) {
        if let State::Pointer {
            button: Some(button),
        } = self.state
        {
            sink.release(button);
            self.state = State::Pointer { button: None };
        }
    }

    fn set_state(&mut self, state: State) {
        if self.state.name() != state.name() {
            debug!("{} -> {}", self.state.name(), state.name());
        }
        self.state = state;
    }

    fn to_idle(&mut self) {
        self.tap.reset();
        self.scroll.stop();
        self.motion.reset();
        self.predictor.reset();
        self.set_state(State::Idle);
    }

    fn check_connection(&mut self, frame: &TouchFrame, sink: &dyn HidSink) {
        if !sink.is_connected() {
            if !self.offline {
                debug!("sink disconnected, holding output");
                self.offline = true;
            }
            return;
        }
        if self.offline {
            debug!("sink reconnected");
            self.offline = false;
            self.pointers.rebase(frame);
            self.motion.reset();
            self.predictor.reset();
        }
    }

    fn edge_at(&self, at: &TouchSample) -> Option<Edge> {
        let limit = self.config.thresholds.edge;
        let v = &self.view;
        if at.y - v.min_y < limit {
            Some(Edge::Top)
        } else if v.max_y - at.y < limit {
            Some(Edge::Bottom)
        } else if at.x - v.min_x < limit {
            Some(Edge::Left)
        } else if v.max_x - at.x < limit {
            Some(Edge::Right)
        } else {
            None
        }
    }

    fn begin_session(&mut self, frame: &TouchFrame, id: i32, sink: &mut dyn HidSink) {
        self.release_held(sink);
        self.scroll.stop();
        self.tap.reset();
        self.tap.touch_started(frame.time_ms);
        let Some(first) = frame.sample(id).copied() else {
            return;
        };
        let edge = self.edge_at(&first);
        self.set_state(State::Gesture(GestureSession::new(first, edge, false)));
    }

    fn on_down(&mut self, frame: &TouchFrame, id: i32, sink: &mut dyn HidSink) {
        let first = self.pointers.is_empty();
        self.pointers.pointer_down(frame, id);
        if first {
            self.predictor.reset();
            self.motion.reset();
            match self.state {
                State::Tap => self.tap.touch_started(frame.time_ms),
                _ => self.begin_session(frame, id, sink),
            }
        } else if let State::Gesture(session) = &mut self.state {
            session.pointer_count_changed(self.pointers.len());
        }
        self.tap.observe_pointers(self.pointers.len());
    }

    fn on_up(&mut self, frame: &TouchFrame, id: i32, sink: &mut dyn HidSink) {
        self.pointers.pointer_up(frame, id);
        let all_up = self.pointers.is_empty();
        let now = frame.time_ms;

        match &mut self.state {
            State::Idle => {}
            State::Gesture(session) if !all_up => {
                session.pointer_count_changed(self.pointers.len());
            }
            State::Gesture(session) => {
                if session.resolved {
                    self.to_idle();
                } else {
                    self.set_state(State::Tap);
                    self.release_tap(now, sink);
                }
            }
            State::Tap if all_up => self.release_tap(now, sink),
            State::Tap => {}
            State::Pointer { .. } if all_up => {
                self.release_held(sink);
                self.to_idle();
            }
            State::Pointer { .. } => self.predictor.reset(),
            State::Scroll { .. } if all_up => {
                if self.scroll.release(now) {
                    self.set_state(State::Scroll { releasing: true });
                } else {
                    self.to_idle();
                }
            }
            State::Scroll { .. } => {}
        }
    }

    fn release_tap(&mut self, now_ms: u64, sink: &mut dyn HidSink) {
        match self.tap.release(now_ms) {
            TapRelease::Rejected => self.to_idle(),
            TapRelease::Pending => {}
            TapRelease::Double(button) => {
                match button {
                    Some(button) if !self.offline => {
                        sink.click(button);
                        sink.click(button);
                    }
                    _ => {}
                }
                self.to_idle();
            }
        }
    }

    fn on_move(&mut self, frame: &TouchFrame, sink: &mut dyn HidSink, policy: &mut dyn GesturePolicy) {
        let tracking = !self.pointers.is_empty();
        let Some(step) = self.pointers.track(frame) else {
            if tracking && self.pointers.is_empty() {
                debug!("all pointers lost from frame, abandoning touch");
                self.cancel(sink);
            }
            return;
        };
        if self.offline {
            return;
        }
        match self.state {
            State::Idle | State::Scroll { releasing: true } => {}
            State::Gesture(_) => {
                self.tap.add_travel(&step);
                self.gesture_move(&step, sink, policy);
            }
            State::Tap => {
                self.tap.add_travel(&step);
                self.tap_move(&step, sink);
            }
            State::Pointer { .. } => self.pointer_move(&step, sink),
            State::Scroll { releasing: false } => self.scroll.on_move(&step, sink),
        }
    }

    fn gesture_move(&mut self, step: &Step, sink: &mut dyn HidSink, policy: &mut dyn GesturePolicy) {
        let count = self.pointers.len();
        let thresholds = &self.config.thresholds;
        let State::Gesture(session) = &mut self.state else {
            return;
        };
        session.travel.0 += step.dx();
        session.travel.1 += step.dy();
        if session.resolved {
            return;
        }

        let kind = match session.edge {
            Some(edge) => {
                if session.travel_sq() <= thresholds.min_gesture_distance_sq {
                    return;
                }
                GestureKind::from(edge)
            }
            None => match GestureKind::for_pointer_count(count) {
                Some(kind) => {
                    if std::mem::take(&mut session.settling)
                        || session.travel_sq() <= thresholds.min_multitouch_gesture_distance_sq
                    {
                        return;
                    }
                    kind
                }
                None => {
                    if count == 1 && !session.tap_rejected {
                        self.set_state(State::Tap);
                        self.tap_move(step, sink);
                    }
                    return;
                }
            },
        };

        let from_edge = session.edge.is_some();
        let gesture = Gesture::new(kind, Direction::from_delta(session.travel.0, session.travel.1));
        session.resolved = true;
        debug!("classified {}", gesture.name());

        match policy.on_gesture(gesture, sink) {
            GestureOutcome::Consumed => {}
            GestureOutcome::Scroll(axis) => self.enter_scroll(axis),
            GestureOutcome::Unhandled if from_edge => self.enter_pointer(None),
            GestureOutcome::Unhandled => {}
        }
    }

    fn tap_move(&mut self, step: &Step, sink: &mut dyn HidSink) {
        if !self.tap.violates(step.current.time_ms) {
            return;
        }
        if self.tap.tap_count() == 1 {
            let button = self.tap.button();
            self.tap.reset();
            if let Some(button) = button {
                sink.press(button);
            }
            self.enter_pointer(button);
            self.pointer_move(step, sink);
        } else if self.tap.max_touch_points() == 1 {
            self.enter_pointer(None);
            self.pointer_move(step, sink);
        } else {
            self.set_state(State::Gesture(GestureSession::new(step.current, None, true)));
        }
    }

    fn enter_pointer(&mut self, button: Option<MouseButton>) {
        self.motion.reset();
        self.predictor.reset();
        self.set_state(State::Pointer { button });
    }

    fn enter_scroll(&mut self, axis: ScrollAxis) {
        self.scroll.begin(axis);
        self.set_state(State::Scroll { releasing: false });
    }

    fn pointer_move(&mut self, step: &Step, sink: &mut dyn HidSink) {
        let State::Pointer { button } = self.state else {
            return;
        };
        if self.predictor.should_suppress(&step.previous, &step.current) {
            return;
        }
        self.motion.accumulate(step.dx(), step.dy());
        let nudge = match button {
            Some(_) => self.motion.edge_nudge(&step.current, &self.view),
            None => (0, 0),
        };
        let (dx, dy) = self.motion.take(nudge);
        if dx != 0 || dy != 0 {
            sink.move_relative(dx, dy);
        }
    }
}
