use regex::Regex;
use std::sync::LazyLock;

use super::error::{DeviceError, DeviceResult};

/// `/dev/mmcblk0p2`, `/dev/nvme0n1p3`: the partition number follows a literal `p`.
static SEPARATED_PARTITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(/dev/[a-zA-Z]+[0-9]+(?:n[0-9]+)?)p([0-9]+)$").expect("valid regex")
});

/// `/dev/sdb1`: lettered device name followed by the partition number.
static LETTERED_PARTITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(/dev/[a-zA-Z]+)([0-9]+)$").expect("valid regex"));

/// Split a partition device path into its physical device and partition number.
pub fn split_partition(device: &str) -> DeviceResult<(String, String)> {
    let captures = SEPARATED_PARTITION
        .captures(device)
        .or_else(|| LETTERED_PARTITION.captures(device))
        .ok_or_else(|| DeviceError::SplitPartition(device.to_string()))?;

    Ok((captures[1].to_string(), captures[2].to_string()))
}
