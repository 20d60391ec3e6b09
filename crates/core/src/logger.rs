use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{mpsc, Mutex, MutexGuard, OnceLock};

use anyhow::{Context, Result};
use chrono::Local;

static LOGGER: OnceLock<Mutex<Logger>> = OnceLock::new();

struct Logger {
    file: File,
    tui_tx: Option<mpsc::Sender<LogRecord>>,
    prefixes: HashMap<String, u8>, // prefix -> color index
}

// Color indices for TUI rendering (mapped in ui.rs)
pub const COLOR_DEFAULT: u8 = 0;
pub const COLOR_GRAY: u8 = 1;
pub const COLOR_BLUE: u8 = 2;
pub const COLOR_GREEN: u8 = 3;
pub const COLOR_MAGENTA: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

/// One log line as delivered to the TUI.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub level: Level,
    pub prefix: String,
    pub color: u8,
    pub timestamp: String,
    pub message: String,
}

fn lock(logger: &Mutex<Logger>) -> MutexGuard<'_, Logger> {
    logger.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Initialize the global logger. Truncates `<log_dir>/app.log`.
pub fn init(log_dir: &Path) -> Result<()> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("creating log dir {}", log_dir.display()))?;
    let log_path = log_dir.join("app.log");
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&log_path)
        .with_context(|| format!("opening {}", log_path.display()))?;

    LOGGER
        .set(Mutex::new(Logger { file, tui_tx: None, prefixes: HashMap::new() }))
        .ok();
    Ok(())
}

/// Wire the TUI log channel.
pub fn set_tui_sender(tx: mpsc::Sender<LogRecord>) {
    if let Some(logger) = LOGGER.get() {
        lock(logger).tui_tx = Some(tx);
    }
}

/// Register a prefix with a color used by the `*_p` functions.
pub fn register_prefix(prefix: &str, color: u8) {
    if let Some(logger) = LOGGER.get() {
        lock(logger).prefixes.insert(prefix.to_string(), color);
    }
}

fn write_log(level: Level, prefix: &str, msg: &str) {
    let Some(logger) = LOGGER.get() else { return };
    let ts = Local::now().format("%H:%M:%S").to_string();

    let file_line = if prefix.is_empty() {
        format!("[{}] [{}] {}", ts, level.as_str(), msg)
    } else {
        format!("[{}] [{}] [{}] {}", ts, level.as_str(), prefix, msg)
    };

    let mut l = lock(logger);
    writeln!(l.file, "{}", file_line).ok();
    let color = l.prefixes.get(prefix).copied().unwrap_or(COLOR_DEFAULT);
    if let Some(tx) = &l.tui_tx {
        tx.send(LogRecord {
            level,
            prefix: prefix.to_string(),
            color,
            timestamp: ts,
            message: msg.to_string(),
        })
        .ok();
    }
}

pub fn info(msg: &str) {
    write_log(Level::Info, "", msg);
}

pub fn warn(msg: &str) {
    write_log(Level::Warn, "", msg);
}

pub fn error(msg: &str) {
    write_log(Level::Error, "", msg);
}

pub fn info_p(prefix: &str, msg: &str) {
    write_log(Level::Info, prefix, msg);
}

pub fn warn_p(prefix: &str, msg: &str) {
    write_log(Level::Warn, prefix, msg);
}

pub fn error_p(prefix: &str, msg: &str) {
    write_log(Level::Error, prefix, msg);
}
