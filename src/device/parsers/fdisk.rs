//! `fdisk -l`
//!
//! ```text
//! Disk /dev/mmcblk0: 3963 MB, 3963617280 bytes
//! Units = sectors of 1 * 512 = 512 bytes
//!
//!         Device Boot      Start         End      Blocks   Id  System
//! /dev/mmcblk0p1            8192      122879       57344    c  W95 FAT32 (LBA)
//! /dev/mmcblk0p2          122880     7741439     3809280   83  Linux
//! ```
//!
//! The authoritative partition list. A `*` boot flag column may sit between the
//! device and the start sector; GPT disks omit the Id column. Disks without a
//! partition table (zram swap, loop devices) only get a `Disk` header.

use super::{Delimiter, ListingTool, Schema, number};
use crate::device::error::{DeviceError, DeviceResult};
use crate::device::path::split_partition;

const SCHEMA: Schema = Schema {
    tool: "fdisk",
    delimiter: Delimiter::Whitespace,
    min_columns: 4,
    max_columns: None,
};

#[derive(Debug, Clone, Default)]
pub struct Fdisk {
    partitions: Vec<String>,
}

impl ListingTool for Fdisk {
    const PROGRAM: &'static str = "fdisk";
    const ARGS: &'static [&'static str] = &["-l"];

    fn parse(output: &str) -> DeviceResult<Self> {
        let mut partitions: Vec<String> = Vec::new();
        for columns in SCHEMA.rows(output)? {
            let line = columns.join(" ");
            let start = if columns[1] == "*" { 2 } else { 1 };
            if columns.len() < start + 2 {
                return Err(DeviceError::schema("fdisk", &line, "missing start/end sectors"));
            }
            number("fdisk", &line, columns[start])?;
            number("fdisk", &line, columns[start + 1])?;

            let device = columns[0].to_string();
            if !partitions.contains(&device) {
                partitions.push(device);
            }
        }
        Ok(Self { partitions })
    }
}

impl Fdisk {
    /// Partition device paths in the order fdisk lists them.
    pub fn list_partitions(&self) -> &[String] {
        &self.partitions
    }

    /// Distinct physical devices carrying the listed partitions, leaving out
    /// everything below `excluded_prefix` (the boot media).
    pub fn devices(&self, excluded_prefix: &str) -> DeviceResult<Vec<String>> {
        let mut devices: Vec<String> = Vec::new();
        for partition in self
            .partitions
            .iter()
            .filter(|p| !p.starts_with(excluded_prefix))
        {
            let (device, _) = split_partition(partition)?;
            if !devices.contains(&device) {
                devices.push(device);
            }
        }
        Ok(devices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTPUT: &str = "\
Disk /dev/mmcblk0: 3963 MB, 3963617280 bytes
4 heads, 16 sectors/track, 120960 cylinders, total 7741440 sectors
Units = sectors of 1 * 512 = 512 bytes
Disk identifier: 0x000981cb

        Device Boot      Start         End      Blocks   Id  System
/dev/mmcblk0p1            8192      122879       57344    c  W95 FAT32 (LBA)
/dev/mmcblk0p2          122880     7741439     3809280   83  Linux

Disk /dev/sda: 4127 MB, 4127195136 bytes
Disk identifier: 0x00000000

   Device Boot      Start         End      Blocks   Id  System
/dev/sda1   *           1     8060927     4030463+  ee  GPT
";

    #[test]
    fn lists_partitions_in_output_order() {
        let fdisk = Fdisk::parse(OUTPUT).unwrap();
        assert_eq!(
            fdisk.list_partitions(),
            &["/dev/mmcblk0p1", "/dev/mmcblk0p2", "/dev/sda1"]
        );
    }

    #[test]
    fn parses_gpt_layout_without_id_column() {
        let output = "\
Device       Start      End  Sectors  Size Type
/dev/sdb1     2048  8060894  8058847  3.8G Linux filesystem
";
        let fdisk = Fdisk::parse(output).unwrap();
        assert_eq!(fdisk.list_partitions(), &["/dev/sdb1"]);
    }

    #[test]
    fn drops_duplicate_rows() {
        let output = "/dev/sdb1 2048 4096 2048 1M Linux\n/dev/sdb1 2048 4096 2048 1M Linux\n";
        assert_eq!(Fdisk::parse(output).unwrap().list_partitions().len(), 1);
    }

    #[test]
    fn devices_ignore_disks_without_partition_table() {
        let output = format!(
            "{}
Disk /dev/sdb: 4127 MB, 4127195136 bytes
   Device Boot      Start         End      Blocks   Id  System
/dev/sdb1            2048     8060927     4029440   83  Linux
/dev/sdb2         8060928     8060991          32   83  Linux

Disk /dev/zram0: 448 MiB, 469762048 bytes, 114688 sectors
Units: sectors of 1 * 4096 = 4096 bytes

Disk /dev/loop0: 60 MiB, 62914560 bytes, 122880 sectors
",
            OUTPUT
        );
        let fdisk = Fdisk::parse(&output).unwrap();
        assert_eq!(fdisk.devices("/dev/mmcblk0").unwrap(), vec!["/dev/sda", "/dev/sdb"]);
    }

    #[test]
    fn device_listing_fails_on_unsplittable_names() {
        let fdisk = Fdisk::parse("/dev/sdc 2048 4096 2048 1M Linux\n").unwrap();
        assert!(matches!(
            fdisk.devices("/dev/mmcblk0"),
            Err(DeviceError::SplitPartition(_))
        ));
    }

    #[test]
    fn rejects_rows_with_garbled_sectors() {
        assert!(Fdisk::parse("/dev/sdb1 start end 2048 1M Linux\n").is_err());
        assert!(Fdisk::parse("/dev/sdb1 * 2048 4096\n").is_ok());
        assert!(Fdisk::parse("/dev/sdb1 * 2048 x\n").is_err());
    }
}
