//! Process-wide logging: `tracing` events on stderr, mirrored to a rotated
//! log file in the shelfmark data directory.
//!
//! Environment:
//!
//! - `LOG_LEVEL`: silent, error, warn, info (default) or debug
//! - `SHELFMARK_LOG_FILE`: log file path, instead of `{data dir}/shelfmark.log`
//! - `DISABLE_LOG=true`: no log file
//! - `ENABLE_PRINT_LOG=false`: no stderr output
//! - `RUST_LOG`: overrides the stderr filter

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Local, Utc};
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

use crate::get_create_shelfmark_dir;

/// Rotated files kept next to the current one.
const KEEP_ROTATED: usize = 5;

/// Each level also enables the less verbose ones before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Silent = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
}

impl Level {
    /// Case insensitive.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "silent" | "off" => Some(Level::Silent),
            "error" => Some(Level::Error),
            "warn" | "warning" => Some(Level::Warn),
            "info" => Some(Level::Info),
            "debug" => Some(Level::Debug),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Silent => "SILENT",
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
        }
    }

    fn env_filter_directive(&self) -> &'static str {
        match self {
            Level::Silent => "off",
            Level::Error => "error",
            Level::Warn => "warn",
            Level::Info => "info",
            Level::Debug => "debug",
        }
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"),
        Err(_) => default,
    }
}

/// Move an existing `{stem}.log` aside as `{stem}.{mtime}.log` and delete
/// all but the newest `keep` rotated files.
fn rotate_log_files(log_file: &Path, keep: usize) -> Result<(), Box<dyn std::error::Error>> {
    if !log_file.try_exists().unwrap_or(false) {
        return Ok(());
    }

    let parent = log_file.parent().ok_or("Log file has no parent directory")?;
    let stem = log_file.file_stem().and_then(|s| s.to_str()).unwrap_or("shelfmark");
    let current_name = log_file.file_name().and_then(|s| s.to_str()).unwrap_or_default();

    let modified: DateTime<Local> = fs::metadata(log_file)?.modified()?.into();
    let rotated = parent.join(format!("{}.{}.log", stem, modified.format("%Y-%m-%dT%H-%M-%S")));
    fs::rename(log_file, &rotated)?;

    let prefix = format!("{}.", stem);
    let mut old: Vec<PathBuf> = fs::read_dir(parent)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(&prefix) && n.ends_with(".log") && n != current_name)
                .unwrap_or(false)
        })
        .collect();

    // Timestamped names sort oldest first.
    old.sort();

    let excess = old.len().saturating_sub(keep);
    for path in &old[..excess] {
        if let Err(e) = fs::remove_file(path) {
            eprintln!("Failed to remove old log file {}: {}", path.display(), e);
        }
    }

    Ok(())
}

pub struct Logger {
    log_file: Option<PathBuf>,
    print_log: bool,
    level: Mutex<Level>,
}

impl Logger {
    fn quiet_fallback() -> Self {
        Logger {
            log_file: None,
            print_log: true,
            level: Mutex::new(Level::Info),
        }
    }

    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let level = std::env::var("LOG_LEVEL")
            .ok()
            .and_then(|v| Level::from_str(&v))
            .unwrap_or(Level::Info);

        let log_file = if env_flag("DISABLE_LOG", false) {
            None
        } else {
            let path = match std::env::var("SHELFMARK_LOG_FILE") {
                Ok(p) if !p.trim().is_empty() => PathBuf::from(p),
                _ => get_create_shelfmark_dir()
                    .map_err(|e| format!("Failed to get shelfmark dir: {}", e))?
                    .join("shelfmark.log"),
            };
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            if let Err(e) = rotate_log_files(&path, KEEP_ROTATED) {
                eprintln!("Failed to rotate log files: {}", e);
            }
            Some(path)
        };

        Ok(Logger {
            log_file,
            print_log: env_flag("ENABLE_PRINT_LOG", true),
            level: Mutex::new(level),
        })
    }

    /// Install the stderr subscriber. Fails if one is already installed.
    fn init_tracing(level: Level) -> Result<(), Box<dyn std::error::Error>> {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level.env_filter_directive()));

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .finish();

        tracing::subscriber::set_global_default(subscriber)?;
        Ok(())
    }

    fn append(&self, path: &Path, at: Level, msg: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "[{}] {}: {}", Utc::now().format("%Y-%m-%d %H:%M:%S%.3fZ"), at.as_str(), msg)
    }

    pub fn log(&self, at: Level, msg: &str) {
        if at == Level::Silent || self.level() < at {
            return;
        }

        if self.print_log {
            match at {
                Level::Error => tracing::error!("{}", msg),
                Level::Warn => tracing::warn!("{}", msg),
                Level::Info => tracing::info!("{}", msg),
                Level::Debug => tracing::debug!("{}", msg),
                Level::Silent => {}
            }
        }

        if let Some(path) = &self.log_file {
            if let Err(e) = self.append(path, at, msg) {
                eprintln!("Failed to write to {}: {}", path.display(), e);
            }
        }
    }

    pub fn level(&self) -> Level {
        *self.level.lock()
    }

    pub fn set_level(&self, level: Level) {
        *self.level.lock() = level;
    }
}

static LOGGER: OnceLock<Logger> = OnceLock::new();

fn with_logger<F, R>(f: F) -> R
where
    F: FnOnce(&Logger) -> R,
{
    let logger = LOGGER.get_or_init(|| {
        let logger = Logger::from_env().unwrap_or_else(|e| {
            eprintln!("Failed to create logger: {}", e);
            Logger::quiet_fallback()
        });
        // A test harness or the embedding binary may have installed one already.
        let _ = Logger::init_tracing(logger.level());
        logger
    });

    f(logger)
}

/// Install the subscriber and open the log file, if not done yet.
pub fn init_logging() {
    with_logger(|_| ());
}

pub fn error(msg: &str) {
    with_logger(|l| l.log(Level::Error, msg));
}

pub fn warn(msg: &str) {
    with_logger(|l| l.log(Level::Warn, msg));
}

pub fn info(msg: &str) {
    with_logger(|l| l.log(Level::Info, msg));
}

pub fn debug(msg: &str) {
    with_logger(|l| l.log(Level::Debug, msg));
}

pub fn get_log_level() -> Level {
    with_logger(|l| l.level())
}

/// Returns false, leaving the level unchanged, if `level_str` isn't a level name.
pub fn set_log_level_str(level_str: &str) -> bool {
    match Level::from_str(level_str) {
        Some(level) => {
            with_logger(|l| l.set_level(level));
            true
        }
        None => false,
    }
}
