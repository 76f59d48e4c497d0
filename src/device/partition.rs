//! Partition identity
//!
//! A [`Partition`] carries only what identifies it: the resolved device path and
//! how the partition was originally referenced. Attributes that need an external
//! tool (filesystem type, PARTUUID, sizes) are looked up through
//! [`DeviceFacts`](super::facts::DeviceFacts), which caches them per run.

use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};

pub const PARTUUID_PREFIX: &str = "PARTUUID=";

/// How a partition was named where it was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Origin {
    /// Referenced by its device node, e.g. `/dev/sda1`.
    Device,
    /// Referenced by `PARTUUID=<id>`.
    PartUuid(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct Partition {
    device: String,
    origin: Origin,
}

impl Partition {
    pub fn from_device(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            origin: Origin::Device,
        }
    }

    /// A partition that was referenced by PARTUUID and has been resolved to `device`.
    pub fn from_part_uuid(part_uuid: impl Into<String>, device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            origin: Origin::PartUuid(part_uuid.into()),
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn is_initial_part_uuid(&self) -> bool {
        matches!(self.origin, Origin::PartUuid(_))
    }

    /// The PARTUUID this partition was referenced by, if any.
    pub fn initial_part_uuid(&self) -> Option<&str> {
        match &self.origin {
            Origin::PartUuid(id) => Some(id),
            Origin::Device => None,
        }
    }

    /// The text that referenced this partition, as found in cmdline.txt or fstab.
    pub fn reference(&self) -> String {
        match &self.origin {
            Origin::Device => self.device.clone(),
            Origin::PartUuid(id) => format!("{}{}", PARTUUID_PREFIX, id),
        }
    }

    pub fn is_on_boot_media(&self, boot_partition_prefix: &str) -> bool {
        self.device.starts_with(boot_partition_prefix)
    }
}

impl PartialEq for Partition {
    fn eq(&self, other: &Self) -> bool {
        self.device == other.device
    }
}

impl Eq for Partition {}

impl PartialEq<str> for Partition {
    fn eq(&self, other: &str) -> bool {
        self.device == other
    }
}

impl PartialEq<&str> for Partition {
    fn eq(&self, other: &&str) -> bool {
        self.device == *other
    }
}

impl Hash for Partition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.device.hash(state);
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            Origin::Device => write!(f, "{}", self.device),
            Origin::PartUuid(id) => write!(f, "{} ({}{})", self.device, PARTUUID_PREFIX, id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equality_ignores_origin() {
        let by_device = Partition::from_device("/dev/mmcblk0p2");
        let by_uuid = Partition::from_part_uuid("775d7214-02", "/dev/mmcblk0p2");
        assert_eq!(by_device, by_uuid);
        assert_ne!(by_device, Partition::from_device("/dev/sda1"));
    }

    #[test]
    fn compares_with_device_strings() {
        let partition = Partition::from_device("/dev/sdb1");
        assert!(partition == "/dev/sdb1");
        assert!(partition != "/dev/sdb2");
        assert!(partition.eq("/dev/sdb1"));
    }

    #[test]
    fn hash_follows_equality() {
        let mut set = HashSet::new();
        set.insert(Partition::from_device("/dev/mmcblk0p2"));
        set.insert(Partition::from_part_uuid("775d7214-02", "/dev/mmcblk0p2"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn reference_reproduces_original_text() {
        assert_eq!(Partition::from_device("/dev/sda2").reference(), "/dev/sda2");
        assert_eq!(
            Partition::from_part_uuid("13f4a298-02", "/dev/mmcblk0p2").reference(),
            "PARTUUID=13f4a298-02"
        );
    }

    #[test]
    fn detects_boot_media() {
        assert!(Partition::from_device("/dev/mmcblk0p2").is_on_boot_media("/dev/mmcblk0p"));
        assert!(!Partition::from_device("/dev/sda1").is_on_boot_media("/dev/mmcblk0p"));
    }
}
