//! `sgdisk -i <number> <disk>`
//!
//! ```text
//! Partition GUID code: 0FC63DAF-8483-4772-8E79-3D69D8477DE4 (Linux filesystem)
//! Partition unique GUID: AC9DC34D-BAF0-44D6-A682-610CB651E0CA
//! First sector: 2048 (at 1024.0 KiB)
//! ```
//!
//! Unlike the other tools this one describes a single partition, so it runs
//! once per queried partition.

use crate::command::CommandRunner;
use crate::device::error::DeviceResult;
use crate::device::path::split_partition;

const UNIQUE_GUID: &str = "Partition unique GUID:";

#[derive(Debug, Clone, Default)]
pub struct Sgdisk {
    guid: Option<String>,
}

impl Sgdisk {
    pub const PROGRAM: &'static str = "sgdisk";

    pub fn collect(runner: &dyn CommandRunner, partition: &str) -> DeviceResult<Self> {
        let (disk, number) = split_partition(partition)?;
        let output = runner.run_checked(Self::PROGRAM, &["-i", number.as_str(), disk.as_str()])?;
        Ok(Self::parse(&output))
    }

    pub fn parse(output: &str) -> Self {
        let guid = output
            .lines()
            .find_map(|line| line.trim().strip_prefix(UNIQUE_GUID))
            .and_then(|rest| rest.split_whitespace().next())
            .map(|guid| guid.to_string());
        Self { guid }
    }

    pub fn guid(&self) -> Option<&str> {
        self.guid.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::fake::FakeRunner;

    const OUTPUT: &str = "\
GPT fdisk (gdisk) version 0.8.5

Partition table scan:
  MBR: protective
  GPT: present

Found valid GPT with protective MBR; using GPT.

Command (? for help): Using 1
Partition GUID code: 0FC63DAF-8483-4772-8E79-3D69D8477DE4 (Linux filesystem)
Partition unique GUID: AC9DC34D-BAF0-44D6-A682-610CB651E0CA
First sector: 2048 (at 1024.0 KiB)
Last sector: 8060894 (at 3.8 GiB)
Partition name: 'Linux filesystem'
";

    #[test]
    fn extracts_unique_guid() {
        assert_eq!(
            Sgdisk::parse(OUTPUT).guid(),
            Some("AC9DC34D-BAF0-44D6-A682-610CB651E0CA")
        );
    }

    #[test]
    fn missing_guid_yields_none() {
        assert_eq!(Sgdisk::parse("Partition #1 does not exist.\n").guid(), None);
    }

    #[test]
    fn queries_the_physical_disk() {
        let runner = FakeRunner::new().with("sgdisk -i 1 /dev/sdb", OUTPUT);
        let sgdisk = Sgdisk::collect(&runner, "/dev/sdb1").unwrap();
        assert!(sgdisk.guid().is_some());
        assert_eq!(runner.calls("sgdisk -i 1 /dev/sdb"), 1);
    }

    #[test]
    fn malformed_partition_path_fails() {
        let runner = FakeRunner::new();
        assert!(Sgdisk::collect(&runner, "/dev/sdb").is_err());
    }
}
