//! `df -T`
//!
//! ```text
//! Filesystem     Type     1K-blocks    Used Available Use% Mounted on
//! /dev/root      ext4       3683920 2508276    968796  73% /
//! devtmpfs       devtmpfs    244148       0    244148   0% /dev
//! /dev/mmcblk0p1 vfat         57288    9864     47424  18% /boot
//! ```
//!
//! Only mounted filesystems appear. Block counts are in KiB.

use super::{Delimiter, ListingTool, Schema, number};
use crate::device::error::DeviceResult;

const SCHEMA: Schema = Schema {
    tool: "df",
    delimiter: Delimiter::Whitespace,
    min_columns: 7,
    // Mountpoints containing blanks spill into further columns.
    max_columns: None,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DfEntry {
    pub device: String,
    pub size_bytes: u64,
    pub free_bytes: u64,
}

#[derive(Debug, Clone, Default)]
pub struct Df {
    entries: Vec<DfEntry>,
}

impl ListingTool for Df {
    const PROGRAM: &'static str = "df";
    const ARGS: &'static [&'static str] = &["-T"];

    fn parse(output: &str) -> DeviceResult<Self> {
        let mut entries = Vec::new();
        for line in output.lines().filter(|l| l.starts_with(super::DEVICE_PREFIX)) {
            let columns = SCHEMA.columns(line)?;
            entries.push(DfEntry {
                device: columns[0].to_string(),
                size_bytes: number("df", line, columns[2])? * 1024,
                free_bytes: number("df", line, columns[4])? * 1024,
            });
        }
        Ok(Self { entries })
    }
}

impl Df {
    pub fn entry(&self, device: &str) -> Option<&DfEntry> {
        self.entries.iter().find(|e| e.device == device)
    }

    pub fn size(&self, device: &str) -> Option<u64> {
        self.entry(device).map(|e| e.size_bytes)
    }

    pub fn free(&self, device: &str) -> Option<u64> {
        self.entry(device).map(|e| e.free_bytes)
    }
}
