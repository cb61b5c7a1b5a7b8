//! hidpad – turn a Linux touchscreen into a relative HID mouse.
//!
//! The [`engine`] consumes touch frames and emits clicks, drags, pointer
//! motion and wheel scrolling through an [`hid::HidSink`]. Everything around
//! it reads devices, parses configuration and writes HID command frames.

pub mod config;
pub mod engine;
pub mod event;
pub mod hid;
pub mod manager;
pub mod motion;
pub mod pointer;
pub mod policy;
pub mod predictor;
pub mod report;
pub mod scroll;
pub mod tap;
pub mod timer;
pub mod touch;
