//! Tracing subscriber setup.
//!
//! The TUI owns the terminal, so it never logs to stderr: logs go to
//! `--log-file` when given and are dropped otherwise. CLI commands log to
//! stderr. `COVID_LOG` overrides the level filter (`RUST_LOG` syntax).

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::AppError;

pub const LOG_ENV: &str = "COVID_LOG";

/// Where log lines go when no `--log-file` is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    Discard,
}

/// Install the global subscriber.
///
/// Calling this twice is harmless; the second call keeps the first subscriber.
pub fn init(log_file: Option<&Path>, fallback: LogTarget, default_level: &str) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    let (writer, ansi) = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    AppError::runtime(format!("Failed to open log file '{}': {e}", path.display()))
                })?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None => match fallback {
            LogTarget::Stderr => (BoxMakeWriter::new(std::io::stderr), true),
            LogTarget::Discard => (BoxMakeWriter::new(std::io::sink), false),
        },
    };

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(false)
        .try_init();

    Ok(())
}
