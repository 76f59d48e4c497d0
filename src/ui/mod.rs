use colored::*;
use serde::Serialize;
use std::io::{self, Write};
use std::sync::{LazyLock, RwLock};

use crate::device::{DetectedPartition, Partition, PhysicalDevice};
use crate::eligibility::{PartitionVerdict, SourceRoot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy)]
pub enum Level {
    Info,
    Success,
    Warn,
    Error,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Success => "success",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Renderer {
    pub format: OutputFormat,
    pub color: bool,
}

impl Default for Renderer {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            color: true,
        }
    }
}

static RENDERER: LazyLock<RwLock<Renderer>> = LazyLock::new(|| RwLock::new(Renderer::default()));

pub fn init(format: OutputFormat, color: bool) {
    if !color {
        colored::control::set_override(false);
    }
    if let Ok(mut r) = RENDERER.write() {
        r.format = format;
        r.color = color;
    }
}

fn renderer() -> Renderer {
    RENDERER.read().map(|r| r.clone()).unwrap_or_default()
}

pub const SEPARATOR_LIGHT: &str = "─";

#[derive(Serialize)]
struct Event<'a> {
    level: &'a str,
    code: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

fn colorize(level: Level, s: &str, enable: bool) -> String {
    if !enable {
        return s.to_string();
    }
    match level {
        Level::Info => s.normal().to_string(),
        Level::Success => s.green().bold().to_string(),
        Level::Warn => s.yellow().bold().to_string(),
        Level::Error => s.red().bold().to_string(),
    }
}

/// Print a user-facing message and mirror it into the log file.
pub fn emit(level: Level, code: &str, message: &str, data: Option<serde_json::Value>) {
    match level {
        Level::Error => tracing::error!(code, "{}", message),
        Level::Warn => tracing::warn!(code, "{}", message),
        Level::Info | Level::Success => tracing::info!(code, "{}", message),
    }

    let r = renderer();
    let mut out: Box<dyn Write> = match level {
        Level::Error | Level::Warn => Box::new(io::stderr()),
        _ => Box::new(io::stdout()),
    };
    match r.format {
        OutputFormat::Text => {
            let _ = writeln!(out, "{}", colorize(level, message, r.color));
        }
        OutputFormat::Json => {
            let ev = Event {
                level: level.as_str(),
                code,
                message,
                data,
            };
            if let Ok(s) = serde_json::to_string(&ev) {
                let _ = writeln!(out, "{}", s);
            }
        }
    }
}

pub fn separator() {
    let r = renderer();
    if matches!(r.format, OutputFormat::Json) {
        return;
    }
    let _ = writeln!(io::stdout(), "{}", SEPARATOR_LIGHT.repeat(80).bright_black());
}

/// Format bytes into human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.1} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

pub fn format_optional_size(bytes: Option<u64>) -> String {
    bytes.map(format_size).unwrap_or_else(|| "n/a".to_string())
}

pub fn print_physical_devices(devices: &[PhysicalDevice]) {
    for device in devices {
        emit(
            Level::Info,
            "detect.device",
            &format!(
                "  {} ({}{})",
                device.device.bold(),
                format_size(device.size),
                if device.removable { ", removable" } else { "" }
            ),
            serde_json::to_value(device).ok(),
        );
    }
}

pub fn print_detected(detected: &[DetectedPartition]) {
    emit(Level::Info, "detect.start", "Detecting partitions", None);
    for d in detected {
        emit(
            Level::Info,
            "detect.partition",
            &format!(
                "  {} - Size: {} - Free: {} - Mountpoint: {} - Partitiontype: {} - Partitiontable: {} - PARTUUID: {}",
                d.partition.device().bold(),
                format_optional_size(d.size),
                format_optional_size(d.free),
                d.mountpoint.as_deref().unwrap_or("n/a"),
                d.fs_type.as_deref().unwrap_or("n/a"),
                d.table_type.as_deref().unwrap_or("n/a"),
                d.part_uuid.as_deref().unwrap_or("n/a"),
            ),
            serde_json::to_value(d).ok(),
        );
    }
}

pub fn print_source(source: &SourceRoot) {
    let mut message = format!(
        "Source root partition {}: size: {} - Used space: {} - Type: {}",
        source.partition.device().bold(),
        format_size(source.size),
        format_size(source.used),
        source.fs_type
    );
    if source.partition.is_initial_part_uuid() {
        message.push_str(&format!(" - Booted as {}", source.partition.reference()));
    }
    emit(
        Level::Info,
        "eligibility.source",
        &message,
        serde_json::to_value(source).ok(),
    );
}

pub fn print_verdicts(verdicts: &[PartitionVerdict]) {
    for verdict in verdicts {
        let level = if verdict.verdict.is_eligible() {
            Level::Success
        } else {
            Level::Warn
        };
        emit(
            level,
            "eligibility.verdict",
            &verdict.to_string(),
            serde_json::to_value(verdict).ok(),
        );
    }
}

/// List eligible targets numbered from 1, the numbers accepted by the prompt.
pub fn print_eligible(eligible: &[Partition]) {
    emit(
        Level::Info,
        "eligibility.targets",
        "Following partitions are eligible as a new root partition",
        None,
    );
    for (i, partition) in eligible.iter().enumerate() {
        emit(
            Level::Info,
            "eligibility.target",
            &format!("  {}: {}", (i + 1).to_string().cyan(), partition.device().bold()),
            None,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_sizes() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(3683920 * 1024), "3.5 GB");
        assert_eq!(format_optional_size(None), "n/a");
        assert_eq!(format_optional_size(Some(2 * 1024 * 1024)), "2.0 MB");
    }
}
