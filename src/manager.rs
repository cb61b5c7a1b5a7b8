//! Multi-device manager and device discovery (I/O layer).
//!
//! Each device gets a reader thread that turns evdev events into touch
//! frames and an engine thread that owns the [`TouchEngine`] and the HID
//! output. Pure event-processing logic lives in [`crate::event`].
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use evdev::{AbsoluteAxisType, Device};
use log::{debug, error, info, warn};

use crate::config::{
    AppConfig, DeviceConfig, EngineConfig, HidpadError, OutputConfig, parse_config_file,
};
use crate::engine::TouchEngine;
use crate::event::{FrameAssembler, classify_event, parse_usb_id};
use crate::hid::{HidSink, LogSink};
use crate::policy::ActionPolicy;
use crate::report::{ReportSink, open_output, open_report_sink};
use crate::touch::{TouchFrame, ViewBounds};

/// Longest the engine thread sleeps without a pending deadline.
const IDLE_WAIT: Duration = Duration::from_millis(250);

/// Delay between attempts to reopen a lost HID output.
const OUTPUT_RETRY: Duration = Duration::from_secs(2);

const RECONNECT_ATTEMPTS: usize = 10;
const RECONNECT_INTERVAL: Duration = Duration::from_secs(5);

/// Millisecond clock shared by the reader and engine of one device.
#[derive(Debug, Clone, Copy)]
struct Clock(Instant);

impl Clock {
    fn now_ms(&self) -> u64 {
        self.0.elapsed().as_millis() as u64
    }
}

// -- HidpadManager (top-level orchestrator) -------------------

/// Runs one touch engine per configured device.
pub struct HidpadManager {
    config: AppConfig,
    running: Arc<AtomicBool>,
    dry_run: bool,
}

impl HidpadManager {
    pub fn new(config_path: impl AsRef<Path>) -> Result<Self, HidpadError> {
        Ok(Self {
            config: parse_config_file(config_path.as_ref())?,
            running: Arc::new(AtomicBool::new(false)),
            dry_run: false,
        })
    }

    /// Log HID actions instead of writing them to the output.
    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.dry_run = dry_run;
    }

    /// Start processing all configured devices and block until they stop.
    pub fn start(&mut self) {
        if self.config.devices.is_empty() {
            error!("No devices configured");
            return;
        }

        self.running.store(true, Ordering::Relaxed);
        info!("Starting hidpad");

        let mut handles = Vec::new();

        for (device_id, device_config) in &self.config.devices {
            let Some(device) = find_device(device_id, device_config) else {
                continue;
            };
            let device_id = device_id.clone();
            let config = device_config.clone();
            let output = self.config.output.clone();
            let running = Arc::clone(&self.running);
            let dry_run = self.dry_run;

            let spawned = thread::Builder::new()
                .name(format!("hidpad-{device_id}"))
                .spawn(move || run_device(&device_id, device, &config, &output, dry_run, &running));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => error!("Failed to spawn device thread: {e}"),
            }
        }

        if handles.is_empty() {
            error!("No devices found, exiting");
            return;
        }

        for handle in handles {
            let _ = handle.join();
        }
    }

    /// Stop processing devices.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
        info!("hidpad stopped");
    }

    /// Get a reference to the running flag for signal handling.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Get the log level from the parsed configuration.
    pub fn config_log_level(&self) -> &str {
        &self.config.log_level
    }

    /// Get the optional log file path from the parsed configuration.
    pub fn config_log_file(&self) -> Option<&str> {
        self.config.log_file.as_deref()
    }
}

// -- Device discovery -----------------------------------------

/// Devices reporting both multi-touch position axes.
fn touch_devices() -> impl Iterator<Item = (PathBuf, Device)> {
    evdev::enumerate().filter(|(_, device)| {
        device.supported_absolute_axes().is_some_and(|axes| {
            axes.contains(AbsoluteAxisType::ABS_MT_POSITION_X)
                && axes.contains(AbsoluteAxisType::ABS_MT_POSITION_Y)
        })
    })
}

/// Locate the configured touchscreen by its USB vendor:product ID.
fn find_device(device_id: &str, config: &DeviceConfig) -> Option<Device> {
    let usb_id = &config.device_usb_id;
    let Some((vendor, product)) = parse_usb_id(usb_id) else {
        warn!("Device {device_id}: '{usb_id}' is not a vendor:product USB ID");
        return None;
    };

    let found = touch_devices().find(|(_, device)| {
        let id = device.input_id();
        (id.vendor(), id.product()) == (vendor, product)
    });
    match found {
        Some((path, device)) => {
            info!(
                "Device {device_id}: {} at {} (USB {usb_id})",
                device.name().unwrap_or("unknown"),
                path.display()
            );
            Some(device)
        }
        None => {
            warn!("Device {device_id}: no touchscreen with USB ID {usb_id}");
            None
        }
    }
}

/// Read the MT axis ranges that make up the touch surface.
fn view_bounds(device_id: &str, device: &Device) -> Option<ViewBounds> {
    let abs = device
        .get_abs_state()
        .map_err(|e| error!("Device {device_id}: cannot read axis ranges: {e}"))
        .ok()?;
    let x = &abs[AbsoluteAxisType::ABS_MT_POSITION_X.0 as usize];
    let y = &abs[AbsoluteAxisType::ABS_MT_POSITION_Y.0 as usize];
    debug!(
        "Device {device_id}: surface x {}..{}, y {}..{}",
        x.minimum, x.maximum, y.minimum, y.maximum
    );
    Some(ViewBounds::new(
        x.minimum as f64,
        y.minimum as f64,
        x.maximum as f64,
        y.maximum as f64,
    ))
}

/// Set up the engine for a device, start its reader and run the engine loop.
fn run_device(
    device_id: &str,
    device: Device,
    config: &DeviceConfig,
    output: &OutputConfig,
    dry_run: bool,
    running: &Arc<AtomicBool>,
) {
    let Some(view) = view_bounds(device_id, &device) else {
        return;
    };
    info!(
        "Started processing device: {device_id} (USB {})",
        config.device_usb_id
    );

    let clock = Clock(Instant::now());
    let (tx, rx) = mpsc::channel();
    {
        let reader_id = device_id.to_string();
        let config = config.clone();
        let running = Arc::clone(running);
        let spawned = thread::Builder::new()
            .name(format!("hidpad-{device_id}-reader"))
            .spawn(move || read_loop(&reader_id, device, &config, clock, &tx, &running));
        if let Err(e) = spawned {
            error!("Device {device_id}: failed to spawn reader: {e}");
            return;
        }
    }

    let mut engine = TouchEngine::new(EngineConfig::new(config.settings.clone()), view);
    let mut policy = ActionPolicy::new(device_id, config.gestures.clone());

    if dry_run {
        let mut sink = LogSink {
            smooth_vertical: output.smooth_scroll_vertical,
            smooth_horizontal: output.smooth_scroll_horizontal,
        };
        engine_loop(&mut engine, &mut policy, &mut sink, &rx, clock, running, |_| {});
        return;
    }

    let mut sink = open_report_sink(output).unwrap_or_else(|e| {
        warn!("{e}; will retry");
        ReportSink::disconnected(output.smooth_scroll_vertical, output.smooth_scroll_horizontal)
    });
    let mut last_attempt = Instant::now();
    engine_loop(&mut engine, &mut policy, &mut sink, &rx, clock, running, |sink: &mut ReportSink<File>| {
        if sink.is_connected() || last_attempt.elapsed() < OUTPUT_RETRY {
            return;
        }
        last_attempt = Instant::now();
        match open_output(Path::new(&output.path)) {
            Ok(file) => {
                info!("HID output {} reopened", output.path);
                sink.attach(file);
            }
            Err(e) => debug!("{e}"),
        }
    });
}

/// Single consumer of a device's frames: feeds the engine and runs its timers.
fn engine_loop<S: HidSink>(
    engine: &mut TouchEngine,
    policy: &mut ActionPolicy,
    sink: &mut S,
    frames: &Receiver<TouchFrame>,
    clock: Clock,
    running: &Arc<AtomicBool>,
    mut maintain: impl FnMut(&mut S),
) {
    while running.load(Ordering::Relaxed) {
        let wait = engine
            .next_deadline()
            .map_or(IDLE_WAIT, |at| {
                Duration::from_millis(at.saturating_sub(clock.now_ms()))
            })
            .min(IDLE_WAIT);

        match frames.recv_timeout(wait) {
            Ok(frame) => engine.on_frame(&frame, sink, policy),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        engine.poll(clock.now_ms(), sink);
        maintain(sink);
    }
    engine.cancel(sink);
}

/// Blocking reader - turns device events into frames for the engine thread.
fn read_loop(
    device_id: &str,
    mut device: Device,
    config: &DeviceConfig,
    clock: Clock,
    frames: &Sender<TouchFrame>,
    running: &Arc<AtomicBool>,
) {
    let mut assembler = FrameAssembler::new();
    while running.load(Ordering::Relaxed) {
        match device.fetch_events().map(|iter| iter.collect::<Vec<_>>()) {
            Ok(events) => {
                for event in &events {
                    let Some(te) = classify_event(event) else {
                        continue;
                    };
                    for frame in assembler.push(&te, clock.now_ms()) {
                        if frames.send(frame).is_err() {
                            return;
                        }
                    }
                }
            }
            Err(e) => {
                if !running.load(Ordering::Relaxed) {
                    break;
                }
                warn!("Device {device_id} disconnected: {e}");
                assembler = FrameAssembler::new();
                if frames.send(TouchFrame::cancel(clock.now_ms())).is_err() {
                    return;
                }
                match attempt_reconnect(device_id, config, running) {
                    Some(new_device) => device = new_device,
                    None => break,
                }
            }
        }
    }
}

/// Wait for a lost device to come back.
fn attempt_reconnect(
    device_id: &str,
    config: &DeviceConfig,
    running: &Arc<AtomicBool>,
) -> Option<Device> {
    for attempt in 1..=RECONNECT_ATTEMPTS {
        if !running.load(Ordering::Relaxed) {
            return None;
        }
        info!("Device {device_id}: reconnect attempt {attempt}/{RECONNECT_ATTEMPTS}");
        thread::sleep(RECONNECT_INTERVAL);
        if let Some(device) = find_device(device_id, config) {
            return Some(device);
        }
    }
    error!("Device {device_id}: giving up after {RECONNECT_ATTEMPTS} reconnect attempts");
    None
}

/// Print every multi-touch device with the USB ID to put in the config.
pub fn list_touch_devices() -> ExitCode {
    let mut count = 0;
    for (path, device) in touch_devices() {
        count += 1;
        let id = device.input_id();
        println!(
            "{count}. {}\n   USB ID: {:04x}:{:04x}\n   Path:   {}\n   Phys:   {}\n",
            device.name().unwrap_or("unknown"),
            id.vendor(),
            id.product(),
            path.display(),
            device.physical_path().unwrap_or("N/A"),
        );
    }

    if count == 0 {
        println!(
            "No multi-touch devices found. Is the touchscreen connected, \
             and are you allowed to read /dev/input (try root)?"
        );
        return ExitCode::FAILURE;
    }

    println!(
        "Enable a device in hidpad.toml with:\n\n\
         \x20 [device.<name>]\n\
         \x20 device_usb_id = \"<USB ID>\"\n\
         \x20 enabled = true"
    );
    ExitCode::SUCCESS
}
