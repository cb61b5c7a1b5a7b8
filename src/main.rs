//! hidpad – turn a Linux touchscreen into a relative HID mouse.
//!
//! CLI entry point.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use std::sync::atomic::Ordering;
use std::time::SystemTime;

use clap::Parser;
use log::{LevelFilter, Log, Metadata, Record};

use hidpad::manager::{HidpadManager, list_touch_devices};

#[derive(Parser)]
#[command(name = "hidpad", about = "Use a touchscreen as a relative HID mouse")]
struct Cli {
    /// Configuration file
    #[arg(default_value = "/etc/hidpad/hidpad.toml")]
    config: PathBuf,

    /// Log at debug level regardless of the configured level
    #[arg(short, long)]
    verbose: bool,

    /// Print multi-touch devices with their USB IDs and exit
    #[arg(short, long)]
    list_devices: bool,

    /// Log HID actions instead of writing them to the output
    #[arg(short, long)]
    dry_run: bool,
}

/// Logs to stderr and, when configured, appends to a file.
struct HidpadLogger {
    level: LevelFilter,
    file: Option<Mutex<File>>,
}

impl HidpadLogger {
    fn new(level: LevelFilter, log_file: Option<&str>) -> Self {
        let file = log_file.and_then(|path| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| eprintln!("Warning: cannot open log file '{path}': {e}"))
                .ok()
        });
        Self {
            level,
            file: file.map(Mutex::new),
        }
    }

    fn with_file(&self, f: impl FnOnce(&mut File)) {
        if let Some(Ok(mut file)) = self.file.as_ref().map(Mutex::lock) {
            f(&mut file);
        }
    }
}

impl Log for HidpadLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.target().starts_with("hidpad")
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let secs = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        let thread = std::thread::current();
        let line = format!(
            "[{secs} {} {}] {}\n",
            record.level().as_str(),
            thread.name().unwrap_or("hidpad"),
            record.args()
        );

        // stderr ends up in the journal under systemd
        eprint!("{line}");
        self.with_file(|f| {
            let _ = f.write_all(line.as_bytes());
        });
    }

    fn flush(&self) {
        self.with_file(|f| {
            let _ = f.flush();
        });
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.list_devices {
        return list_touch_devices();
    }

    // The config decides the log level, so it is read before logging starts.
    let mut manager = match HidpadManager::new(&cli.config) {
        Ok(m) => m,
        Err(e) => {
            eprintln!(
                "Error: {e}\n\n\
                 Run 'hidpad --list-devices' to find the USB ID of your touchscreen."
            );
            return ExitCode::FAILURE;
        }
    };

    let log_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        manager.config_log_level().parse().unwrap_or(LevelFilter::Info)
    };
    let logger = HidpadLogger::new(log_level, manager.config_log_file());
    if let Err(e) = log::set_boxed_logger(Box::new(logger)) {
        eprintln!("Error: cannot install logger: {e}");
        return ExitCode::FAILURE;
    }
    log::set_max_level(log_level);

    // Engine threads poll the flag and release held buttons on the way out.
    let running = manager.running_flag();
    if let Err(e) = ctrlc::set_handler(move || running.store(false, Ordering::Relaxed)) {
        log::warn!("Cannot install Ctrl-C handler: {e}");
    }

    log::info!("Configuration: {}", cli.config.display());
    manager.set_dry_run(cli.dry_run);
    manager.start();
    manager.stop();

    ExitCode::SUCCESS
}
