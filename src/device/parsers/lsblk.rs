//! `lsblk -rnb -o NAME,MAJ:MIN,RM,SIZE,RO,TYPE,MOUNTPOINT`
//!
//! ```text
//! sda 8:0 1 4127195136 0 disk
//! sda1 8:1 1 4126129664 0 part
//! mmcblk0 179:0 0 3963617280 0 disk
//! mmcblk0p1 179:1 0 58720256 0 part /boot
//! mmcblk0p2 179:2 0 3900702720 0 part /
//! ```
//!
//! Raw mode prints bare kernel names and escapes blanks as `\x20`. Unmounted
//! devices have no seventh column.

use super::{Delimiter, ListingTool, Schema, number};
use crate::device::error::DeviceResult;

const SCHEMA: Schema = Schema {
    tool: "lsblk",
    delimiter: Delimiter::Whitespace,
    min_columns: 6,
    max_columns: Some(7),
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LsblkEntry {
    pub device: String,
    pub removable: bool,
    pub size_bytes: u64,
    pub kind: String,
    pub mountpoint: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Lsblk {
    entries: Vec<LsblkEntry>,
}

impl ListingTool for Lsblk {
    const PROGRAM: &'static str = "lsblk";
    const ARGS: &'static [&'static str] =
        &["-rnb", "-o", "NAME,MAJ:MIN,RM,SIZE,RO,TYPE,MOUNTPOINT"];

    fn parse(output: &str) -> DeviceResult<Self> {
        let prefixed: String = output
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| format!("{}{}\n", super::DEVICE_PREFIX, line))
            .collect();

        let mut entries = Vec::new();
        for line in prefixed.lines() {
            let columns = SCHEMA.columns(line)?;
            entries.push(LsblkEntry {
                device: columns[0].to_string(),
                removable: columns[2] == "1",
                size_bytes: number("lsblk", line, columns[3])?,
                kind: columns[5].to_string(),
                mountpoint: columns.get(6).map(|m| unescape(m)),
            });
        }
        Ok(Self { entries })
    }
}

impl Lsblk {
    pub fn entry(&self, device: &str) -> Option<&LsblkEntry> {
        self.entries.iter().find(|e| e.device == device)
    }

    pub fn size(&self, device: &str) -> Option<u64> {
        self.entry(device).map(|e| e.size_bytes)
    }

    pub fn mountpoint(&self, device: &str) -> Option<&str> {
        self.entry(device).and_then(|e| e.mountpoint.as_deref())
    }

    pub fn list_devices(&self) -> Vec<&LsblkEntry> {
        self.entries.iter().filter(|e| e.kind == "disk").collect()
    }
}

/// Undo the `\xHH` escaping lsblk applies in raw mode. Escapes are bytes, so
/// multi-byte characters span several of them.
fn unescape(value: &str) -> String {
    let mut bytes = Vec::with_capacity(value.len());
    let mut rest = value;
    while let Some(pos) = rest.find("\\x") {
        bytes.extend_from_slice(rest[..pos].as_bytes());
        let hex = rest.get(pos + 2..pos + 4);
        match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
            Some(byte) => {
                bytes.push(byte);
                rest = &rest[pos + 4..];
            }
            None => {
                bytes.extend_from_slice(b"\\x");
                rest = &rest[pos + 2..];
            }
        }
    }
    bytes.extend_from_slice(rest.as_bytes());
    String::from_utf8(bytes)
        .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}
