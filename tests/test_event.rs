//! Integration tests for the event-processing logic in `event`.
//!
//! Tests feed `TouchEvent`s directly (no hardware) into the frame
//! assembler and also verify `classify_event` with synthetic
//! `evdev::InputEvent`s.
use evdev::{AbsoluteAxisType, EventType, InputEvent, Synchronization};

use hidpad::event::{
    FrameAssembler, TouchEvent, classify_event, parse_usb_id, process_touch_events,
};
use hidpad::touch::{TouchAction, TouchFrame};

// -- Helpers --------------------------------------------------

/// Feed events into a fresh assembler.
fn feed(events: &[TouchEvent]) -> Vec<TouchFrame> {
    let mut assembler = FrameAssembler::new();
    process_touch_events(&mut assembler, events, 0)
}

fn land(slot: i32, id: i32, x: f64, y: f64) -> Vec<TouchEvent> {
    vec![
        TouchEvent::Slot(slot),
        TouchEvent::TrackingId(id),
        TouchEvent::PositionX(x),
        TouchEvent::PositionY(y),
    ]
}

fn actions(frames: &[TouchFrame]) -> Vec<TouchAction> {
    frames.iter().map(|f| f.action).collect()
}

fn ids(frame: &TouchFrame) -> Vec<i32> {
    frame.samples.iter().map(|s| s.id).collect()
}

// -- FrameAssembler: single contact ---------------------------

#[test]
fn test_landing_emits_down_with_position() {
    let mut events = land(0, 7, 100.0, 200.0);
    events.push(TouchEvent::SynReport);
    let frames = feed(&events);

    assert_eq!(actions(&frames), vec![TouchAction::Down(7)]);
    let sample = frames[0].sample(7).unwrap();
    assert_eq!((sample.x, sample.y), (100.0, 200.0));
    assert_eq!(sample.pressure, FrameAssembler::DEFAULT_PRESSURE);
}

#[test]
fn test_nothing_before_syn_report() {
    assert!(feed(&land(0, 1, 10.0, 10.0)).is_empty());
}

#[test]
fn test_motion_then_lift() {
    let mut assembler = FrameAssembler::new();
    let mut events = land(0, 3, 100.0, 100.0);
    events.push(TouchEvent::SynReport);
    process_touch_events(&mut assembler, &events, 0);
    assert_eq!(assembler.active_contacts(), 1);

    let moved = process_touch_events(
        &mut assembler,
        &[TouchEvent::PositionX(110.0), TouchEvent::SynReport],
        10,
    );
    assert_eq!(actions(&moved), vec![TouchAction::Move]);
    assert_eq!(moved[0].time_ms, 10);
    assert_eq!(moved[0].sample(3).unwrap().x, 110.0);
    assert_eq!(moved[0].sample(3).unwrap().y, 100.0);

    let lifted = process_touch_events(
        &mut assembler,
        &[TouchEvent::FingerUp, TouchEvent::SynReport],
        20,
    );
    assert_eq!(actions(&lifted), vec![TouchAction::Up(3)]);
    // The lifting contact is still part of its own up frame.
    assert_eq!(ids(&lifted[0]), vec![3]);
    assert_eq!(assembler.active_contacts(), 0);
}

#[test]
fn test_report_without_changes_is_silent() {
    let mut assembler = FrameAssembler::new();
    let mut events = land(0, 1, 100.0, 100.0);
    events.push(TouchEvent::SynReport);
    process_touch_events(&mut assembler, &events, 0);
    let frames = process_touch_events(&mut assembler, &[TouchEvent::SynReport], 10);
    assert!(frames.is_empty());
}

#[test]
fn test_pressure_change_is_motion() {
    let mut assembler = FrameAssembler::new();
    let mut events = land(0, 1, 100.0, 100.0);
    events.push(TouchEvent::SynReport);
    process_touch_events(&mut assembler, &events, 0);

    let frames = process_touch_events(
        &mut assembler,
        &[TouchEvent::Pressure(40.0), TouchEvent::SynReport],
        10,
    );
    assert_eq!(actions(&frames), vec![TouchAction::Move]);
    assert_eq!(frames[0].sample(1).unwrap().pressure, 40.0);
}

#[test]
fn test_touch_lifted_within_one_report_is_dropped() {
    let mut events = land(0, 1, 100.0, 100.0);
    events.push(TouchEvent::FingerUp);
    events.push(TouchEvent::SynReport);
    assert!(feed(&events).is_empty());
}

#[test]
fn test_events_for_unknown_slot_are_ignored() {
    let frames = feed(&[
        TouchEvent::Slot(4),
        TouchEvent::PositionX(5.0),
        TouchEvent::FingerUp,
        TouchEvent::SynReport,
    ]);
    assert!(frames.is_empty());
}

// -- FrameAssembler: multiple contacts ------------------------

#[test]
fn test_two_landings_emit_two_downs_in_order() {
    let mut events = land(0, 1, 100.0, 100.0);
    events.extend(land(1, 2, 300.0, 300.0));
    events.push(TouchEvent::SynReport);
    let frames = feed(&events);

    assert_eq!(
        actions(&frames),
        vec![TouchAction::Down(1), TouchAction::Down(2)]
    );
    assert_eq!(ids(&frames[0]), vec![1]);
    assert_eq!(ids(&frames[1]), vec![1, 2]);
}

#[test]
fn test_lift_comes_before_move_and_move_before_landing() {
    let mut assembler = FrameAssembler::new();
    let mut events = land(0, 1, 100.0, 100.0);
    events.extend(land(1, 2, 300.0, 300.0));
    events.push(TouchEvent::SynReport);
    process_touch_events(&mut assembler, &events, 0);

    let mut events = vec![
        TouchEvent::Slot(0),
        TouchEvent::PositionX(150.0),
        TouchEvent::Slot(1),
        TouchEvent::FingerUp,
    ];
    events.extend(land(2, 9, 500.0, 500.0));
    events.push(TouchEvent::SynReport);
    let frames = process_touch_events(&mut assembler, &events, 10);

    assert_eq!(
        actions(&frames),
        vec![TouchAction::Up(2), TouchAction::Move, TouchAction::Down(9)]
    );
    assert_eq!(ids(&frames[0]), vec![1, 2]);
    assert_eq!(ids(&frames[1]), vec![1]);
    assert_eq!(ids(&frames[2]), vec![1, 9]);
    assert_eq!(frames[1].sample(1).unwrap().x, 150.0);
    assert_eq!(assembler.active_contacts(), 2);
}

#[test]
fn test_syn_dropped_cancels_and_forgets_contacts() {
    let mut assembler = FrameAssembler::new();
    let mut events = land(0, 1, 100.0, 100.0);
    events.extend(land(1, 2, 300.0, 300.0));
    events.push(TouchEvent::SynReport);
    process_touch_events(&mut assembler, &events, 0);

    let frames = process_touch_events(&mut assembler, &[TouchEvent::SynDropped], 30);
    assert_eq!(frames, vec![TouchFrame::cancel(30)]);
    assert_eq!(assembler.active_contacts(), 0);

    // Motion after the drop does not resurrect the old contacts.
    let frames = process_touch_events(
        &mut assembler,
        &[TouchEvent::PositionX(120.0), TouchEvent::SynReport],
        40,
    );
    assert!(frames.is_empty());
}

// -- classify_event: evdev -> TouchEvent ----------------------

#[test]
fn test_classify_mt_slot() {
    let ev = InputEvent::new(EventType::ABSOLUTE, AbsoluteAxisType::ABS_MT_SLOT.0, 2);
    assert_eq!(classify_event(&ev), Some(TouchEvent::Slot(2)));
}

#[test]
fn test_classify_mt_position_x() {
    let ev = InputEvent::new(
        EventType::ABSOLUTE,
        AbsoluteAxisType::ABS_MT_POSITION_X.0,
        42,
    );
    assert_eq!(classify_event(&ev), Some(TouchEvent::PositionX(42.0)));
}

#[test]
fn test_classify_mt_position_y() {
    let ev = InputEvent::new(
        EventType::ABSOLUTE,
        AbsoluteAxisType::ABS_MT_POSITION_Y.0,
        99,
    );
    assert_eq!(classify_event(&ev), Some(TouchEvent::PositionY(99.0)));
}

#[test]
fn test_classify_mt_pressure() {
    let ev = InputEvent::new(
        EventType::ABSOLUTE,
        AbsoluteAxisType::ABS_MT_PRESSURE.0,
        31,
    );
    assert_eq!(classify_event(&ev), Some(TouchEvent::Pressure(31.0)));
}

#[test]
fn test_classify_tracking_id_new_finger() {
    let ev = InputEvent::new(
        EventType::ABSOLUTE,
        AbsoluteAxisType::ABS_MT_TRACKING_ID.0,
        5,
    );
    assert_eq!(classify_event(&ev), Some(TouchEvent::TrackingId(5)));
}

#[test]
fn test_classify_tracking_id_finger_up() {
    let ev = InputEvent::new(
        EventType::ABSOLUTE,
        AbsoluteAxisType::ABS_MT_TRACKING_ID.0,
        -1,
    );
    assert_eq!(classify_event(&ev), Some(TouchEvent::FingerUp));
}

#[test]
fn test_classify_syn_report() {
    let ev = InputEvent::new(EventType::SYNCHRONIZATION, Synchronization::SYN_REPORT.0, 0);
    assert_eq!(classify_event(&ev), Some(TouchEvent::SynReport));
}

#[test]
fn test_classify_syn_dropped() {
    let ev = InputEvent::new(EventType::SYNCHRONIZATION, Synchronization::SYN_DROPPED.0, 0);
    assert_eq!(classify_event(&ev), Some(TouchEvent::SynDropped));
}

#[test]
fn test_classify_irrelevant_abs_axis() {
    // ABS_X (not multi-touch) should be ignored
    let ev = InputEvent::new(EventType::ABSOLUTE, AbsoluteAxisType::ABS_X.0, 100);
    assert_eq!(classify_event(&ev), None);
}

#[test]
fn test_classify_key_event_ignored() {
    let ev = InputEvent::new(EventType::KEY, 0x14a, 1); // BTN_TOUCH
    assert_eq!(classify_event(&ev), None);
}

// -- parse_usb_id ---------------------------------------------

#[test]
fn test_parse_usb_id_valid() {
    assert_eq!(parse_usb_id("1234:5678"), Some((0x1234, 0x5678)));
}

#[test]
fn test_parse_usb_id_uppercase() {
    assert_eq!(parse_usb_id("ABCD:EF01"), Some((0xABCD, 0xEF01)));
}

#[test]
fn test_parse_usb_id_with_usb_prefix() {
    assert_eq!(parse_usb_id("USB:1234:5678"), Some((0x1234, 0x5678)));
}

#[test]
fn test_parse_usb_id_invalid_no_colon() {
    assert_eq!(parse_usb_id("12345678"), None);
}

#[test]
fn test_parse_usb_id_invalid_hex() {
    assert_eq!(parse_usb_id("ZZZZ:0000"), None);
}

#[test]
fn test_parse_usb_id_empty() {
    assert_eq!(parse_usb_id(""), None);
}

// -- End-to-end: events -> engine -----------------------------

#[test]
fn test_end_to_end_tap_clicks() {
    use hidpad::config::{EngineConfig, EngineSettings};
    use hidpad::engine::TouchEngine;
    use hidpad::hid::LogSink;
    use hidpad::policy::ActionPolicy;
    use hidpad::touch::ViewBounds;

    let mut assembler = FrameAssembler::new();
    let mut engine = TouchEngine::new(
        EngineConfig::new(EngineSettings::default()),
        ViewBounds::new(0.0, 0.0, 1000.0, 1000.0),
    );
    let mut sink = LogSink::default();
    let mut policy = ActionPolicy::new("e2e", Default::default());

    let mut down = land(0, 1, 500.0, 500.0);
    down.push(TouchEvent::SynReport);
    let mut frames = process_touch_events(&mut assembler, &down, 0);
    frames.extend(process_touch_events(
        &mut assembler,
        &[TouchEvent::FingerUp, TouchEvent::SynReport],
        40,
    ));
    for frame in &frames {
        engine.on_frame(frame, &mut sink, &mut policy);
    }
    assert_eq!(engine.next_deadline(), Some(190));
}
