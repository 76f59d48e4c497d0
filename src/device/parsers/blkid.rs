//! `blkid`
//!
//! ```text
//! /dev/mmcblk0p1: LABEL="boot" UUID="0763-6493" TYPE="vfat" PARTUUID="775d7214-01"
//! /dev/mmcblk0p2: UUID="db3c7508-ce47-4b20-b1da-a1ac4446755c" TYPE="ext4" PARTUUID="775d7214-02"
//! /dev/sdb1: UUID="582f0522-3c72-4e4c-a327-435caa23c212" TYPE="ext4" PARTLABEL="Linux filesystem" PARTUUID="9aec15d8-65bc-4c55-84e8-f2024eae2ce9"
//! /dev/mmcblk0: PTUUID="775d7214" PTTYPE="dos"
//! ```

use regex::Regex;
use std::sync::LazyLock;

use super::{DEVICE_PREFIX, ListingTool};
use crate::device::error::{DeviceError, DeviceResult};

static ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([A-Z_]+)="([^"]*)""#).expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlkidEntry {
    pub device: String,
    attributes: Vec<(String, String)>,
}

impl BlkidEntry {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Blkid {
    entries: Vec<BlkidEntry>,
}

impl ListingTool for Blkid {
    const PROGRAM: &'static str = "blkid";
    const ARGS: &'static [&'static str] = &[];

    fn parse(output: &str) -> DeviceResult<Self> {
        let mut entries = Vec::new();
        for line in output.lines().filter(|l| l.starts_with(DEVICE_PREFIX)) {
            let (device, rest) = line
                .split_once(": ")
                .or_else(|| line.strip_suffix(':').map(|d| (d, "")))
                .ok_or_else(|| DeviceError::schema("blkid", line, "missing ':' after device"))?;

            let attributes = ATTRIBUTE
                .captures_iter(rest)
                .map(|c| (c[1].to_string(), c[2].to_string()))
                .collect();

            entries.push(BlkidEntry {
                device: device.to_string(),
                attributes,
            });
        }
        Ok(Self { entries })
    }
}

impl Blkid {
    pub fn entry(&self, device: &str) -> Option<&BlkidEntry> {
        self.entries.iter().find(|e| e.device == device)
    }

    pub fn filesystem_type(&self, device: &str) -> Option<&str> {
        self.entry(device).and_then(|e| e.attribute("TYPE"))
    }

    pub fn persistent_id(&self, device: &str) -> Option<&str> {
        self.entry(device).and_then(|e| e.attribute("PARTUUID"))
    }

    pub fn device_for_id(&self, part_uuid: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| {
                e.attribute("PARTUUID")
                    .is_some_and(|id| id.eq_ignore_ascii_case(part_uuid))
            })
            .map(|e| e.device.as_str())
    }
}
