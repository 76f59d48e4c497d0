//! File logging
//!
//! Every run starts a fresh log file. Terminal output goes through
//! [`crate::ui::emit`], which mirrors each message into this log.

use anyhow::{Context, Result};
use clap::ValueEnum;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
#[value(rename_all = "UPPER")]
pub enum LogLevel {
    #[default]
    Info,
    Debug,
    Warning,
}

impl LogLevel {
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Warning => "warn",
        }
    }
}

/// Install the file subscriber. The returned guard flushes the log on drop and
/// has to be held until the program exits.
pub fn init(log_file: &Path, level: LogLevel) -> Result<WorkerGuard> {
    if log_file.is_file() {
        std::fs::remove_file(log_file)
            .with_context(|| format!("removing previous log file {}", log_file.display()))?;
    }

    let dir = match log_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating log directory {}", dir.display()))?;
    let file_name = log_file
        .file_name()
        .with_context(|| format!("log file {} has no file name", log_file.display()))?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_directive()));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init()
        .context("installing log subscriber")?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_map_to_filter_directives() {
        assert_eq!(LogLevel::default().as_directive(), "info");
        assert_eq!(LogLevel::Warning.as_directive(), "warn");
        assert_eq!(
            LogLevel::from_str("DEBUG", false).unwrap(),
            LogLevel::Debug
        );
    }
}
