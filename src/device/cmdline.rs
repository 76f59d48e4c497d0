//! Boot command file (`cmdline.txt`)
//!
//! ```text
//! dwc_otg.lpm_enable=0 console=tty1 root=/dev/mmcblk0p2 rootfstype=ext4 elevator=deadline rootwait
//! dwc_otg.lpm_enable=0 console=tty1 root=PARTUUID=13f4a298-02 rootfstype=ext4 fsck.repair=yes rootwait
//! ```

use regex::Regex;
use serde::Serialize;
use std::path::Path;
use std::sync::LazyLock;

use super::error::{DeviceError, DeviceResult};
use super::partition::Partition;

static ROOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|\s)root=(PARTUUID=)?(\S+)\s(?:.*\s)?rootfstype=([0-9a-z]+)")
        .expect("valid regex")
});

/// The `root=` and `rootfstype=` values exactly as written in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootSpec {
    pub value: String,
    pub by_part_uuid: bool,
    pub fs_type: String,
}

/// The partition the boot loader currently mounts as root.
#[derive(Debug, Clone, Serialize)]
pub struct BootRootReference {
    pub partition: Partition,
    /// Declared `rootfstype=`
    pub fs_type: String,
}

pub fn parse_cmdline(text: &str) -> Option<RootSpec> {
    let captures = ROOT.captures(text)?;
    Some(RootSpec {
        value: captures[2].to_string(),
        by_part_uuid: captures.get(1).is_some(),
        fs_type: captures[3].to_string(),
    })
}

pub fn read_cmdline(path: &Path) -> DeviceResult<RootSpec> {
    if !path.exists() {
        return Err(DeviceError::CmdlineMissing(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path)?;
    parse_cmdline(&text).ok_or_else(|| DeviceError::CmdlineUnparseable(path.to_path_buf()))
}
