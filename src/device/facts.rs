//! Device facts facade
//!
//! [`DeviceFacts`] is the only way the rest of the crate learns anything about
//! block devices. [`SystemDeviceFacts`] answers every question from the listing
//! tools, running each of them at most once per run.

use serde::Serialize;
use std::cell::{OnceCell, RefCell};
use std::collections::HashMap;

use super::cmdline::{BootRootReference, read_cmdline};
use super::error::{DeviceError, DeviceResult};
use super::parsers::{Blkid, Df, Fdisk, GPT, ListingTool, Lsblk, Parted, Sgdisk};
use super::partition::Partition;
use super::path::split_partition;
use crate::command::CommandRunner;
use crate::config::Config;

/// One row of the detected-partition report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectedPartition {
    pub partition: Partition,
    pub size: Option<u64>,
    pub free: Option<u64>,
    pub mountpoint: Option<String>,
    pub fs_type: Option<String>,
    pub table_type: Option<String>,
    pub part_uuid: Option<String>,
}

/// A whole disk as listed by lsblk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhysicalDevice {
    pub device: String,
    pub size: u64,
    pub removable: bool,
}

pub trait DeviceFacts {
    /// Prefix shared by all partitions on the boot media.
    fn boot_partition_prefix(&self) -> &str;

    /// Partition inventory in listing order.
    fn partitions(&self) -> DeviceResult<Vec<Partition>>;

    /// Filesystem size in bytes; only known for mounted filesystems.
    fn size(&self, partition: &Partition) -> DeviceResult<Option<u64>>;

    /// Available bytes; only known for mounted filesystems.
    fn free(&self, partition: &Partition) -> DeviceResult<Option<u64>>;

    fn filesystem_type(&self, partition: &Partition) -> DeviceResult<Option<String>>;

    fn mountpoint(&self, partition: &Partition) -> DeviceResult<Option<String>>;

    /// Table type of the disk carrying `partition`.
    fn partition_table_type(&self, partition: &Partition) -> DeviceResult<Option<String>>;

    fn persistent_id(&self, partition: &Partition) -> DeviceResult<Option<String>>;

    /// Resolve a PARTUUID to the partition carrying it.
    fn resolve(&self, part_uuid: &str) -> DeviceResult<Partition>;

    /// Partitioned physical devices, the boot media excluded.
    fn non_boot_devices(&self) -> DeviceResult<Vec<String>>;

    fn physical_devices(&self) -> DeviceResult<Vec<PhysicalDevice>>;

    fn boot_root(&self) -> DeviceResult<BootRootReference>;

    /// Unique GPT partition GUID.
    fn guid(&self, partition: &Partition) -> DeviceResult<Option<String>>;

    fn is_gpt(&self, partition: &Partition) -> DeviceResult<bool> {
        Ok(self.partition_table_type(partition)?.as_deref() == Some(GPT))
    }

    /// Size shown in reports, which may come from a source that also knows
    /// unmounted partitions.
    fn reported_size(&self, partition: &Partition) -> DeviceResult<Option<u64>> {
        self.size(partition)
    }

    fn all_detected(&self) -> DeviceResult<Vec<DetectedPartition>> {
        self.partitions()?
            .into_iter()
            .map(|partition| {
                Ok(DetectedPartition {
                    size: self.reported_size(&partition)?,
                    free: self.free(&partition)?,
                    mountpoint: self.mountpoint(&partition)?,
                    fs_type: self.filesystem_type(&partition)?,
                    table_type: self.partition_table_type(&partition)?,
                    part_uuid: self.persistent_id(&partition)?,
                    partition,
                })
            })
            .collect()
    }
}

/// Return the cached tool output, running the tool on first use.
fn cached<'a, T: ListingTool>(
    cell: &'a OnceCell<T>,
    runner: &dyn CommandRunner,
) -> DeviceResult<&'a T> {
    if let Some(value) = cell.get() {
        return Ok(value);
    }
    let value = T::collect(runner)?;
    Ok(cell.get_or_init(|| value))
}

pub struct SystemDeviceFacts {
    runner: Box<dyn CommandRunner>,
    config: Config,
    df: OnceCell<Df>,
    lsblk: OnceCell<Lsblk>,
    fdisk: OnceCell<Fdisk>,
    parted: OnceCell<Parted>,
    blkid: OnceCell<Blkid>,
    boot_root: OnceCell<BootRootReference>,
    guids: RefCell<HashMap<String, Option<String>>>,
}

impl SystemDeviceFacts {
    pub fn new(runner: Box<dyn CommandRunner>, config: Config) -> Self {
        Self {
            runner,
            config,
            df: OnceCell::new(),
            lsblk: OnceCell::new(),
            fdisk: OnceCell::new(),
            parted: OnceCell::new(),
            blkid: OnceCell::new(),
            boot_root: OnceCell::new(),
            guids: RefCell::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn df(&self) -> DeviceResult<&Df> {
        cached(&self.df, self.runner.as_ref())
    }

    fn lsblk(&self) -> DeviceResult<&Lsblk> {
        cached(&self.lsblk, self.runner.as_ref())
    }

    fn fdisk(&self) -> DeviceResult<&Fdisk> {
        cached(&self.fdisk, self.runner.as_ref())
    }

    fn parted(&self) -> DeviceResult<&Parted> {
        cached(&self.parted, self.runner.as_ref())
    }

    fn blkid(&self) -> DeviceResult<&Blkid> {
        cached(&self.blkid, self.runner.as_ref())
    }

    /// df row name for a partition. Older images list the root filesystem
    /// under an alias instead of its partition.
    fn df_name<'a>(&'a self, df: &Df, partition: &'a Partition) -> &'a str {
        let device = partition.device();
        if df.entry(device).is_none() && device == self.config.source_root_device {
            &self.config.rootfs_alias
        } else {
            device
        }
    }

    fn physical_device(&self, partition: &Partition) -> DeviceResult<String> {
        let (disk, _) = split_partition(partition.device())?;
        if disk.starts_with(&self.config.boot_device) {
            Ok(self.config.boot_device.clone())
        } else {
            Ok(disk)
        }
    }
}

impl DeviceFacts for SystemDeviceFacts {
    fn boot_partition_prefix(&self) -> &str {
        &self.config.boot_partition_prefix
    }

    fn partitions(&self) -> DeviceResult<Vec<Partition>> {
        Ok(self
            .fdisk()?
            .list_partitions()
            .iter()
            .map(Partition::from_device)
            .collect())
    }

    fn size(&self, partition: &Partition) -> DeviceResult<Option<u64>> {
        let df = self.df()?;
        Ok(df.size(self.df_name(df, partition)))
    }

    fn free(&self, partition: &Partition) -> DeviceResult<Option<u64>> {
        let df = self.df()?;
        Ok(df.free(self.df_name(df, partition)))
    }

    fn filesystem_type(&self, partition: &Partition) -> DeviceResult<Option<String>> {
        Ok(self
            .blkid()?
            .filesystem_type(partition.device())
            .map(str::to_string))
    }

    fn mountpoint(&self, partition: &Partition) -> DeviceResult<Option<String>> {
        Ok(self
            .lsblk()?
            .mountpoint(partition.device())
            .map(str::to_string))
    }

    fn partition_table_type(&self, partition: &Partition) -> DeviceResult<Option<String>> {
        let disk = self.physical_device(partition)?;
        Ok(self
            .parted()?
            .partition_table_type(&disk)
            .map(str::to_string))
    }

    fn is_gpt(&self, partition: &Partition) -> DeviceResult<bool> {
        let disk = self.physical_device(partition)?;
        Ok(self.parted()?.is_gpt(&disk))
    }

    fn persistent_id(&self, partition: &Partition) -> DeviceResult<Option<String>> {
        if let Some(id) = partition.initial_part_uuid() {
            return Ok(Some(id.to_string()));
        }
        Ok(self
            .blkid()?
            .persistent_id(partition.device())
            .map(str::to_string))
    }

    fn resolve(&self, part_uuid: &str) -> DeviceResult<Partition> {
        let device = self
            .blkid()?
            .device_for_id(part_uuid)
            .ok_or_else(|| DeviceError::UnknownPartUuid(part_uuid.to_string()))?;
        Ok(Partition::from_part_uuid(part_uuid, device))
    }

    fn non_boot_devices(&self) -> DeviceResult<Vec<String>> {
        self.fdisk()?.devices(&self.config.boot_device)
    }

    fn physical_devices(&self) -> DeviceResult<Vec<PhysicalDevice>> {
        Ok(self
            .lsblk()?
            .list_devices()
            .into_iter()
            .map(|entry| PhysicalDevice {
                device: entry.device.clone(),
                size: entry.size_bytes,
                removable: entry.removable,
            })
            .collect())
    }

    fn boot_root(&self) -> DeviceResult<BootRootReference> {
        if let Some(reference) = self.boot_root.get() {
            return Ok(reference.clone());
        }

        let spec = read_cmdline(&self.config.cmdline_file)?;
        let partition = if spec.by_part_uuid {
            self.resolve(&spec.value)?
        } else {
            Partition::from_device(spec.value)
        };
        tracing::debug!(%partition, fs_type = %spec.fs_type, "boot root reference");

        let reference = BootRootReference {
            partition,
            fs_type: spec.fs_type,
        };
        Ok(self.boot_root.get_or_init(|| reference).clone())
    }

    fn guid(&self, partition: &Partition) -> DeviceResult<Option<String>> {
        if let Some(guid) = self.guids.borrow().get(partition.device()) {
            return Ok(guid.clone());
        }
        let guid = Sgdisk::collect(self.runner.as_ref(), partition.device())?
            .guid()
            .map(str::to_string);
        self.guids
            .borrow_mut()
            .insert(partition.device().to_string(), guid.clone());
        Ok(guid)
    }

    fn reported_size(&self, partition: &Partition) -> DeviceResult<Option<u64>> {
        match self.size(partition)? {
            Some(size) => Ok(Some(size)),
            None => Ok(self.lsblk()?.size(partition.device())),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::fake::FakeRunner;
    use std::io::Write;
    use std::rc::Rc;
    use tempfile::NamedTempFile;

    const DF: &str = "\
Filesystem     Type     1K-blocks    Used Available Use% Mounted on
rootfs         rootfs     3683920 2508276    968796  73% /
/dev/root      ext4       3683920 2508276    968796  73% /
/dev/mmcblk0p1 vfat         57288    9864     47424  18% /boot
/dev/sda1      ext4      30832548   45080  29198220   1% /mnt/usb
";

    const LSBLK: &str = "\
sda 8:0 1 31914983424 0 disk
sda1 8:1 1 31913934848 0 part /mnt/usb
sdb 8:16 1 4127195136 0 disk
sdb1 8:17 1 4126129664 0 part
mmcblk0 179:0 0 3963617280 0 disk
mmcblk0p1 179:1 0 58720256 0 part /boot
mmcblk0p2 179:2 0 3900702720 0 part /
";

    const FDISK: &str = "\
Disk /dev/mmcblk0: 3963 MB, 3963617280 bytes
        Device Boot      Start         End      Blocks   Id  System
/dev/mmcblk0p1            8192      122879       57344    c  W95 FAT32 (LBA)
/dev/mmcblk0p2          122880     7741439     3809280   83  Linux

Disk /dev/sda: 31.9 GB, 31914983424 bytes
   Device Boot      Start         End      Blocks   Id  System
/dev/sda1   *        2048    62333951    31165952   83  Linux

Disk /dev/sdb: 4127 MB, 4127195136 bytes
   Device Boot      Start         End      Blocks   Id  System
/dev/sdb1               1     8060927     4030463+  ee  GPT
";

    const PARTED: &str = "\
BYT;
/dev/sda:31.9GB:scsi:512:512:msdos:SanDisk Cruzer;
1:1049kB:31.9GB:31.9GB:ext4::boot;

BYT;
/dev/sdb:4127MB:scsi:512:512:gpt:USB2.0 FlashDisk;
1:1049kB:4127MB:4126MB:ext4:Linux filesystem:;

BYT;
/dev/mmcblk0:3964MB:sd/mmc:512:512:msdos:SD SR04G;
1:4194kB:62.9MB:58.7MB:fat16::lba;
2:62.9MB:3964MB:3901MB:ext4::;
";

    const BLKID: &str = r#"/dev/mmcblk0p1: LABEL="boot" UUID="0763-6493" TYPE="vfat" PARTUUID="775d7214-01"
/dev/mmcblk0p2: UUID="db3c7508-ce47-4b20-b1da-a1ac4446755c" TYPE="ext4" PARTUUID="775d7214-02"
/dev/sda1: UUID="64047412-cc47-422c-b458-35e9fa69f1f9" TYPE="ext4" PARTUUID="0683fbcd-01"
/dev/sdb1: UUID="582f0522-3c72-4e4c-a327-435caa23c212" TYPE="ext4" PARTLABEL="Linux filesystem" PARTUUID="9aec15d8-65bc-4c55-84e8-f2024eae2ce9"
/dev/mmcblk0: PTUUID="775d7214" PTTYPE="dos"
/dev/zram0: LABEL="zram0" UUID="0c2f1f7e-5cbf-4f43-9d2b-8a8f3e5f3c21" TYPE="swap"
"#;

    const SGDISK: &str = "\
Partition GUID code: 0FC63DAF-8483-4772-8E79-3D69D8477DE4 (Linux filesystem)
Partition unique GUID: 9AEC15D8-65BC-4C55-84E8-F2024EAE2CE9
First sector: 2048 (at 1024.0 KiB)
";

    fn runner() -> FakeRunner {
        FakeRunner::new()
            .with("df -T", DF)
            .with("lsblk -rnb -o NAME,MAJ:MIN,RM,SIZE,RO,TYPE,MOUNTPOINT", LSBLK)
            .with("fdisk -l", FDISK)
            .with("parted -l -m", PARTED)
            .with("blkid", BLKID)
            .with("sgdisk -i 1 /dev/sdb", SGDISK)
    }

    /// The runner is boxed into the facade, so call counts are checked through
    /// a shared reference.
    struct Shared(Rc<FakeRunner>);

    impl CommandRunner for Shared {
        fn run(&self, program: &str, args: &[&str]) -> DeviceResult<crate::command::CommandOutput> {
            self.0.run(program, args)
        }
    }

    type Harness = (SystemDeviceFacts, Rc<FakeRunner>, NamedTempFile);

    fn facts_with_cmdline(cmdline: &str) -> Harness {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", cmdline).unwrap();
        let config = Config {
            cmdline_file: file.path().to_path_buf(),
            ..Config::default()
        };
        let runner = Rc::new(runner());
        let facts = SystemDeviceFacts::new(Box::new(Shared(runner.clone())), config);
        (facts, runner, file)
    }

    fn facts() -> Harness {
        facts_with_cmdline("console=tty1 root=/dev/mmcblk0p2 rootfstype=ext4 rootwait")
    }

    #[test]
    fn inventory_comes_from_fdisk_in_order() {
        let (facts, _, _file) = facts();
        let devices: Vec<String> = facts
            .partitions()
            .unwrap()
            .iter()
            .map(|p| p.device().to_string())
            .collect();
        assert_eq!(
            devices,
            vec!["/dev/mmcblk0p1", "/dev/mmcblk0p2", "/dev/sda1", "/dev/sdb1"]
        );
    }

    #[test]
    fn each_tool_runs_once() {
        let (facts, runner, _file) = facts();
        let sda1 = Partition::from_device("/dev/sda1");
        for _ in 0..3 {
            facts.partitions().unwrap();
            facts.size(&sda1).unwrap();
            facts.free(&sda1).unwrap();
            facts.mountpoint(&sda1).unwrap();
            facts.filesystem_type(&sda1).unwrap();
            facts.is_gpt(&sda1).unwrap();
        }
        assert_eq!(runner.calls("fdisk -l"), 1);
        assert_eq!(runner.calls("df -T"), 1);
        assert_eq!(runner.calls("blkid"), 1);
        assert_eq!(runner.calls("parted -l -m"), 1);
        assert_eq!(
            runner.calls("lsblk -rnb -o NAME,MAJ:MIN,RM,SIZE,RO,TYPE,MOUNTPOINT"),
            1
        );
    }

    #[test]
    fn source_root_falls_back_to_rootfs_alias() {
        let (facts, _, _file) = facts();
        let root = Partition::from_device("/dev/mmcblk0p2");
        assert_eq!(facts.size(&root).unwrap(), Some(3683920 * 1024));
        assert_eq!(facts.free(&root).unwrap(), Some(968796 * 1024));
        assert_eq!(facts.size(&Partition::from_device("/dev/sdb1")).unwrap(), None);
    }

    #[test]
    fn table_type_is_read_from_the_physical_device() {
        let (facts, _, _file) = facts();
        assert!(facts.is_gpt(&Partition::from_device("/dev/sdb1")).unwrap());
        assert!(!facts.is_gpt(&Partition::from_device("/dev/sda1")).unwrap());
        assert_eq!(
            facts
                .partition_table_type(&Partition::from_device("/dev/mmcblk0p2"))
                .unwrap()
                .as_deref(),
            Some("msdos")
        );
    }

    #[test]
    fn non_boot_devices_exclude_the_sd_card() {
        let (facts, _, _file) = facts();
        assert_eq!(facts.non_boot_devices().unwrap(), vec!["/dev/sda", "/dev/sdb"]);
    }

    #[test]
    fn boot_root_by_device() {
        let (facts, _, _file) = facts();
        let root = facts.boot_root().unwrap();
        assert_eq!(root.partition, "/dev/mmcblk0p2");
        assert!(!root.partition.is_initial_part_uuid());
        assert_eq!(root.fs_type, "ext4");
    }

    #[test]
    fn boot_root_by_partuuid_is_resolved() {
        let (facts, _, _file) =
            facts_with_cmdline("console=tty1 root=PARTUUID=775d7214-02 rootfstype=ext4 rootwait");
        let root = facts.boot_root().unwrap();
        assert_eq!(root.partition, "/dev/mmcblk0p2");
        assert_eq!(root.partition.reference(), "PARTUUID=775d7214-02");
    }

    #[test]
    fn unknown_partuuid_fails() {
        let (facts, _, _file) =
            facts_with_cmdline("root=PARTUUID=deadbeef-02 rootfstype=ext4 rootwait");
        assert!(matches!(
            facts.boot_root(),
            Err(DeviceError::UnknownPartUuid(id)) if id == "deadbeef-02"
        ));
    }

    #[test]
    fn guid_is_cached_per_partition() {
        let (facts, runner, _file) = facts();
        let sdb1 = Partition::from_device("/dev/sdb1");
        assert_eq!(
            facts.guid(&sdb1).unwrap().as_deref(),
            Some("9AEC15D8-65BC-4C55-84E8-F2024EAE2CE9")
        );
        facts.guid(&sdb1).unwrap();
        assert_eq!(runner.calls("sgdisk -i 1 /dev/sdb"), 1);
    }

    #[test]
    fn report_falls_back_to_lsblk_size() {
        let (facts, _, _file) = facts();
        let detected = facts.all_detected().unwrap();
        assert_eq!(detected.len(), 4);

        let sdb1 = detected.iter().find(|d| d.partition == "/dev/sdb1").unwrap();
        assert_eq!(sdb1.size, Some(4126129664));
        assert_eq!(sdb1.free, None);
        assert_eq!(sdb1.mountpoint, None);
        assert_eq!(sdb1.table_type.as_deref(), Some("gpt"));

        let sda1 = detected.iter().find(|d| d.partition == "/dev/sda1").unwrap();
        assert_eq!(sda1.mountpoint.as_deref(), Some("/mnt/usb"));
        assert_eq!(sda1.fs_type.as_deref(), Some("ext4"));
        assert_eq!(sda1.part_uuid.as_deref(), Some("0683fbcd-01"));
    }

    #[test]
    fn lists_physical_devices() {
        let (facts, _, _file) = facts();
        let disks = facts.physical_devices().unwrap();
        assert_eq!(disks.len(), 3);
        assert!(disks.iter().any(|d| d.device == "/dev/mmcblk0" && !d.removable));
    }
}
