//! Binary HID command frames and the sink that writes them.
//!
//! Every action is one fixed 8-byte frame:
//!
//! | byte | field                         |
//! |------|-------------------------------|
//! | 0    | command code                  |
//! | 1    | button bitmask                |
//! | 2-3  | X, `i16` little-endian        |
//! | 4-5  | Y, `i16` little-endian        |
//! | 6    | wheel Y, `i8`                 |
//! | 7    | wheel X, `i8`                 |

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::config::{HidpadError, OutputConfig};
use crate::hid::{HidSink, MouseButton, ScrollAxis};

pub const FRAME_LEN: usize = 8;

/// One mouse action on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HidCommand {
    Press(MouseButton),
    Release(MouseButton),
    Click(MouseButton),
    Move { dx: i16, dy: i16 },
    Scroll { delta_y: i8, delta_x: i8 },
}

impl HidCommand {
    pub fn code(&self) -> u8 {
        match self {
            HidCommand::Press(_) => 0x01,
            HidCommand::Release(_) => 0x02,
            HidCommand::Click(_) => 0x03,
            HidCommand::Move { .. } => 0x04,
            HidCommand::Scroll { .. } => 0x05,
        }
    }

    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let mut frame = [0u8; FRAME_LEN];
        frame[0] = self.code();
        match *self {
            HidCommand::Press(b) | HidCommand::Release(b) | HidCommand::Click(b) => {
                frame[1] = b.mask();
            }
            HidCommand::Move { dx, dy } => {
                frame[2..4].copy_from_slice(&dx.to_le_bytes());
                frame[4..6].copy_from_slice(&dy.to_le_bytes());
            }
            HidCommand::Scroll { delta_y, delta_x } => {
                frame[6] = delta_y.to_le_bytes()[0];
                frame[7] = delta_x.to_le_bytes()[0];
            }
        }
        frame
    }
}

/// [`HidSink`] writing command frames to any byte stream.
///
/// A failed write drops the writer; the sink then reports itself
/// disconnected until [`ReportSink::attach`] is called again.
pub struct ReportSink<W: Write> {
    writer: Option<W>,
    smooth_vertical: bool,
    smooth_horizontal: bool,
}

impl<W: Write> ReportSink<W> {
    pub fn new(writer: W, smooth_vertical: bool, smooth_horizontal: bool) -> Self {
        Self {
            writer: Some(writer),
            smooth_vertical,
            smooth_horizontal,
        }
    }

    /// A sink with no writer yet, e.g. because the output could not be opened.
    pub fn disconnected(smooth_vertical: bool, smooth_horizontal: bool) -> Self {
        Self {
            writer: None,
            smooth_vertical,
            smooth_horizontal,
        }
    }

    pub fn attach(&mut self, writer: W) {
        self.writer = Some(writer);
    }

    pub fn writer(&self) -> Option<&W> {
        self.writer.as_ref()
    }

    pub fn send(&mut self, command: HidCommand) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        let frame = command.encode();
        if let Err(e) = writer.write_all(&frame).and_then(|()| writer.flush()) {
            warn!("HID output lost: {e}");
            self.writer = None;
        }
    }
}

impl<W: Write> HidSink for ReportSink<W> {
    fn press(&mut self, button: MouseButton) {
        self.send(HidCommand::Press(button));
    }

    fn release(&mut self, button: MouseButton) {
        self.send(HidCommand::Release(button));
    }

    fn click(&mut self, button: MouseButton) {
        self.send(HidCommand::Click(button));
    }

    fn move_relative(&mut self, dx: i16, dy: i16) {
        self.send(HidCommand::Move { dx, dy });
    }

    fn scroll(&mut self, delta_y: i8, delta_x: i8) {
        self.send(HidCommand::Scroll { delta_y, delta_x });
    }

    fn is_connected(&self) -> bool {
        self.writer.is_some()
    }

    fn is_smooth_scroll_enabled(&self, axis: ScrollAxis) -> bool {
        match axis {
            ScrollAxis::Vertical => self.smooth_vertical,
            ScrollAxis::Horizontal => self.smooth_horizontal,
        }
    }
}

/// Open the configured output for appending command frames.
pub fn open_output(path: &Path) -> Result<std::fs::File, HidpadError> {
    OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|e| HidpadError::OutputOpenError {
            path: PathBuf::from(path),
            source: e,
        })
}

/// Build a [`ReportSink`] on the configured output path.
pub fn open_report_sink(output: &OutputConfig) -> Result<ReportSink<std::fs::File>, HidpadError> {
    let file = open_output(Path::new(&output.path))?;
    info!("Writing HID commands to {}", output.path);
    Ok(ReportSink::new(
        file,
        output.smooth_scroll_vertical,
        output.smooth_scroll_horizontal,
    ))
}
