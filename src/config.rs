//! Configuration data structures and TOML parsing.
//!
//! The config file uses TOML format. Example:
//!
//! ```toml
//! [global]
//! log_level = "info"
//!
//! [global.settings]
//! mouse_sensitivity = 1.0
//! scroll_sensitivity = 1.0
//! invert_scroll = false
//! fling_enabled = true
//! density = 10.0
//!
//! [global.output]
//! path = "/run/hidpad/hid.fifo"
//! smooth_scroll_vertical = true
//!
//! [global.gestures.three_finger_left]
//! action = "back"
//! enabled = true
//!
//! [device.panel]
//! device_usb_id = "1234:5678"
//! enabled = true
//!
//! [device.panel.settings]
//! mouse_sensitivity = 1.5
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::Deserialize;
use thiserror::Error;

/// Top-level error type used throughout the crate.
#[derive(Debug, Error)]
pub enum HidpadError {
    #[error("Failed to read config file {path}: {source}")]
    ConfigReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    #[error("Config validation error for device '{device}': missing setting(s): {missing}")]
    MissingSettings { device: String, missing: String },

    #[error("Config validation error for device '{device}': {setting} must be positive")]
    InvalidSetting {
        device: String,
        setting: &'static str,
    },

    #[error("Failed to open HID output {path}: {source}")]
    OutputOpenError {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Root of the TOML config file.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawConfig {
    global: RawGlobal,
    #[serde(default)]
    device: HashMap<String, RawDevice>,
}

/// The `[global]` section.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawGlobal {
    log_level: Option<String>,
    log_file: Option<String>,
    #[serde(default)]
    settings: RawSettings,
    #[serde(default)]
    output: RawOutput,
    #[serde(default)]
    gestures: HashMap<String, RawGestureConfig>,
}

/// Engine settings - all optional so device sections can partially override.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
struct RawSettings {
    mouse_sensitivity: Option<f64>,
    scroll_sensitivity: Option<f64>,
    invert_scroll: Option<bool>,
    fling_enabled: Option<bool>,
    density: Option<f64>,
}

/// The `[global.output]` section.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawOutput {
    path: Option<String>,
    smooth_scroll_vertical: Option<bool>,
    smooth_scroll_horizontal: Option<bool>,
}

/// A gesture entry (action + enabled).
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
struct RawGestureConfig {
    action: Option<String>,
    enabled: Option<bool>,
}

/// A `[device.<id>]` section.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawDevice {
    device_usb_id: Option<String>,
    enabled: Option<bool>,
    #[serde(default)]
    settings: RawSettings,
    #[serde(default)]
    gestures: HashMap<String, RawGestureConfig>,
}

/// Fully validated per-device engine settings.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub mouse_sensitivity: f64,
    pub scroll_sensitivity: f64,
    pub invert_scroll: bool,
    pub fling_enabled: bool,
    /// Physical pixels (device units) per dp.
    pub density: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            mouse_sensitivity: 1.0,
            scroll_sensitivity: 1.0,
            invert_scroll: false,
            fling_enabled: true,
            density: 1.0,
        }
    }
}

/// Distance thresholds in device pixels, derived from dp values once.
///
/// Fields ending in `_sq` are squared and compared against squared distances.
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    pub edge: f64,
    pub pointer_edge_move: f64,
    pub min_gesture_distance_sq: f64,
    pub min_multitouch_gesture_distance_sq: f64,
    pub max_tap_distance_sq: f64,
    pub max_multitouch_tap_distance_sq: f64,
    pub max_touch_end_predict_distance_sq: f64,
    pub fling: f64,
    pub fling_stop: f64,
}

impl Thresholds {
    pub const EDGE_DP: f64 = 30.0;
    pub const POINTER_EDGE_MOVE_DP: f64 = 18.0;
    pub const MIN_GESTURE_DISTANCE_DP: f64 = 10.0;
    pub const MIN_MULTITOUCH_GESTURE_DISTANCE_DP: f64 = 35.0;
    pub const MAX_TAP_DISTANCE_DP: f64 = 8.0;
    pub const MAX_MULTITOUCH_TAP_DISTANCE_DP: f64 = 30.0;
    pub const MAX_TOUCH_END_PREDICT_DISTANCE_DP: f64 = 5.0;
    pub const FLING_DP: f64 = 30.0;
    pub const FLING_STOP_DP: f64 = 2.0;

    pub fn from_density(density: f64) -> Self {
        let px = |dp: f64| dp * density;
        let sq = |dp: f64| px(dp) * px(dp);
        Self {
            edge: px(Self::EDGE_DP),
            pointer_edge_move: px(Self::POINTER_EDGE_MOVE_DP),
            min_gesture_distance_sq: sq(Self::MIN_GESTURE_DISTANCE_DP),
            min_multitouch_gesture_distance_sq: sq(Self::MIN_MULTITOUCH_GESTURE_DISTANCE_DP),
            max_tap_distance_sq: sq(Self::MAX_TAP_DISTANCE_DP),
            max_multitouch_tap_distance_sq: sq(Self::MAX_MULTITOUCH_TAP_DISTANCE_DP),
            max_touch_end_predict_distance_sq: sq(Self::MAX_TOUCH_END_PREDICT_DISTANCE_DP),
            fling: px(Self::FLING_DP),
            fling_stop: px(Self::FLING_STOP_DP),
        }
    }
}

/// Immutable configuration of one engine instance.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub settings: EngineSettings,
    pub thresholds: Thresholds,
}

impl EngineConfig {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            thresholds: Thresholds::from_density(settings.density),
            settings,
        }
    }
}

/// Where HID commands are written and how the receiver scrolls.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfig {
    pub path: String,
    pub smooth_scroll_vertical: bool,
    pub smooth_scroll_horizontal: bool,
}

impl OutputConfig {
    pub const DEFAULT_PATH: &'static str = "/run/hidpad/hid.fifo";
}

/// Gesture configuration (action + enabled).
#[derive(Debug, Clone)]
pub struct GestureConfig {
    pub action: Option<String>,
    pub enabled: bool,
}

/// Configuration for a single touch device.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub device_usb_id: String,
    pub gestures: HashMap<String, GestureConfig>,
    pub settings: EngineSettings,
}

/// Top-level parsed configuration.
#[derive(Debug)]
pub struct AppConfig {
    pub log_level: String,
    pub log_file: Option<String>,
    pub output: OutputConfig,
    pub devices: HashMap<String, DeviceConfig>,
}

/// Generate merge and into_validated for setting fields.
macro_rules! setting_fields {
    ($($field:ident),+ $(,)?) => {
        impl RawSettings {
            fn merge_with_fallback(&self, fallback: &RawSettings) -> RawSettings {
                RawSettings {
                    $($field: self.$field.or(fallback.$field),)+
                }
            }

            fn into_validated(self) -> Result<EngineSettings, Vec<&'static str>> {
                match ($(self.$field,)+) {
                    ($(Some($field),)+) => Ok(EngineSettings { $($field,)+ }),
                    _ => Err([$(
                        if self.$field.is_none() { Some(stringify!($field)) } else { None },
                    )+].into_iter().flatten().collect()),
                }
            }
        }
    };
}

setting_fields!(
    mouse_sensitivity,
    scroll_sensitivity,
    invert_scroll,
    fling_enabled,
    density,
);

/// Reject non-positive scale factors; they would divide by zero downstream.
fn check_positive(device: &str, settings: &EngineSettings) -> Result<(), HidpadError> {
    let scales = [
        ("mouse_sensitivity", settings.mouse_sensitivity),
        ("scroll_sensitivity", settings.scroll_sensitivity),
        ("density", settings.density),
    ];
    for (setting, value) in scales {
        if !(value > 0.0 && value.is_finite()) {
            return Err(HidpadError::InvalidSetting {
                device: device.to_string(),
                setting,
            });
        }
    }
    Ok(())
}

/// Merge gesture maps: global first, then device-specific overrides.
fn merge_gestures(
    global: &HashMap<String, RawGestureConfig>,
    device: &HashMap<String, RawGestureConfig>,
) -> HashMap<String, GestureConfig> {
    let mut merged = HashMap::new();

    for (name, gc) in global.iter().chain(device.iter()) {
        let entry = merged.entry(name.clone()).or_insert(GestureConfig {
            action: None,
            enabled: false,
        });
        if gc.action.is_some() {
            entry.action.clone_from(&gc.action);
        }
        if let Some(enabled) = gc.enabled {
            entry.enabled = enabled;
        }
    }

    merged
}

/// Parse a TOML config file and return the fully resolved `AppConfig`.
pub fn parse_config_file(path: &Path) -> Result<AppConfig, HidpadError> {
    let text = fs::read_to_string(path).map_err(|e| HidpadError::ConfigReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let raw: RawConfig = toml::from_str(&text).map_err(|e| HidpadError::ConfigParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut devices = HashMap::new();

    for (device_id, raw_dev) in &raw.device {
        if !raw_dev.enabled.unwrap_or(false) {
            debug!("Device '{device_id}' is not enabled – skipping.");
            continue;
        }

        let Some(usb_id) = raw_dev.device_usb_id.as_deref().filter(|s| !s.is_empty()) else {
            warn!(
                "Device '{device_id}' is enabled but has no device_usb_id – skipping. \
                 Run 'hidpad --list-devices' to find your USB ID.",
            );
            continue;
        };

        let settings = raw_dev
            .settings
            .merge_with_fallback(&raw.global.settings)
            .into_validated()
            .map_err(|missing| HidpadError::MissingSettings {
                device: device_id.to_string(),
                missing: missing.join(", "),
            })?;
        check_positive(device_id, &settings)?;

        devices.insert(
            device_id.clone(),
            DeviceConfig {
                device_usb_id: usb_id.to_string(),
                gestures: merge_gestures(&raw.global.gestures, &raw_dev.gestures),
                settings,
            },
        );
    }

    let output = OutputConfig {
        path: raw
            .global
            .output
            .path
            .unwrap_or_else(|| OutputConfig::DEFAULT_PATH.to_string()),
        smooth_scroll_vertical: raw.global.output.smooth_scroll_vertical.unwrap_or(true),
        smooth_scroll_horizontal: raw.global.output.smooth_scroll_horizontal.unwrap_or(false),
    };

    Ok(AppConfig {
        log_level: raw.global.log_level.unwrap_or_else(|| "info".to_string()),
        log_file: raw.global.log_file,
        output,
        devices,
    })
}
