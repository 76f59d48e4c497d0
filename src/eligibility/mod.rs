//! Eligibility of partitions as the new root partition
//!
//! [`evaluate`] applies the rules below, in this order, to every partition off
//! the boot media. The first rule that fails decides the partition's verdict.
//!
//! 1. filesystem type equals the type declared for the boot root
//! 2. the filesystem is mounted
//! 3. it is at least as large as the source root, or with `--force` has
//!    enough free space for the used part of the source root
//! 4. with several external disks attached it lives on a GPT disk
//! 5. it is not the source root itself
//! 6. it is empty according to the [`EmptinessPolicy`]

mod emptiness;
mod verdict;

pub use emptiness::{Emptiness, EmptinessPolicy, FsInspector, MountInspector};
pub use verdict::{PartitionVerdict, Verdict};

#[cfg(test)]
pub use emptiness::fake;

use serde::Serialize;
use std::path::Path;
use thiserror::Error;

use crate::device::{DeviceError, DeviceFacts, Partition};

#[derive(Error, Debug)]
pub enum EligibilityError {
    #[error("Current root partition {0} is not located on SD card any more")]
    RootAlreadyMoved(Partition),

    #[error("Unable to determine size and free space of source root partition {0}")]
    SourceUnmeasurable(Partition),

    #[error(transparent)]
    Device(#[from] DeviceError),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    /// Accept partitions smaller than the source when the data fits.
    pub force: bool,
}

/// The partition currently booted as root, with its measurements.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRoot {
    pub partition: Partition,
    /// `rootfstype=` from the boot command file
    pub declared_type: String,
    pub fs_type: String,
    pub size: u64,
    pub free: u64,
    pub used: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EligibilityReport {
    pub source: SourceRoot,
    /// Partitions that passed the filesystem type check, in inventory order.
    pub candidates: Vec<Partition>,
    pub verdicts: Vec<PartitionVerdict>,
    /// Eligible targets, in inventory order.
    pub eligible: Vec<Partition>,
}

impl EligibilityReport {
    #[cfg(test)]
    pub fn verdict(&self, device: &str) -> Option<&Verdict> {
        self.verdicts
            .iter()
            .find(|v| v.partition == device)
            .map(|v| &v.verdict)
    }
}

pub fn evaluate(
    facts: &dyn DeviceFacts,
    inspector: &dyn MountInspector,
    options: Options,
    policy: &EmptinessPolicy,
) -> Result<EligibilityReport, EligibilityError> {
    let boot_root = facts.boot_root()?;
    let prefix = facts.boot_partition_prefix();
    tracing::debug!(
        root = %boot_root.partition,
        fs_type = %boot_root.fs_type,
        "boot root reference"
    );

    if !boot_root.partition.is_on_boot_media(prefix) {
        return Err(EligibilityError::RootAlreadyMoved(boot_root.partition));
    }

    let mut verdicts = Vec::new();
    let mut candidates = Vec::new();
    for partition in facts.partitions()? {
        if partition.is_on_boot_media(prefix) {
            continue;
        }
        let fs_type = facts.filesystem_type(&partition)?;
        if fs_type.as_deref() == Some(boot_root.fs_type.as_str()) {
            candidates.push(partition);
        } else {
            verdicts.push(record(partition, Verdict::TypeMismatch { fs_type }));
        }
    }
    tracing::info!(
        candidates = %candidates.iter().map(Partition::device).collect::<Vec<_>>().join(" "),
        "target root partition candidates"
    );

    let source = measure_source(facts, boot_root.partition, boot_root.fs_type)?;
    tracing::info!(
        partition = %source.partition,
        size = source.size,
        used = source.used,
        fs_type = %source.fs_type,
        "source root partition"
    );

    let multiple_devices = facts.non_boot_devices()?.len() > 1;

    let mut eligible = Vec::new();
    for partition in &candidates {
        let verdict = judge(
            facts,
            inspector,
            options,
            policy,
            &source,
            multiple_devices,
            partition,
        )?;
        if verdict.is_eligible() {
            eligible.push(partition.clone());
        }
        verdicts.push(record(partition.clone(), verdict));
    }

    Ok(EligibilityReport {
        source,
        candidates,
        verdicts,
        eligible,
    })
}

fn record(partition: Partition, verdict: Verdict) -> PartitionVerdict {
    let verdict = PartitionVerdict { partition, verdict };
    if verdict.verdict.is_eligible() {
        tracing::info!("{}", verdict);
    } else {
        tracing::warn!("{}", verdict);
    }
    verdict
}

fn measure_source(
    facts: &dyn DeviceFacts,
    partition: Partition,
    declared_type: String,
) -> Result<SourceRoot, EligibilityError> {
    let (Some(size), Some(free)) = (facts.size(&partition)?, facts.free(&partition)?) else {
        return Err(EligibilityError::SourceUnmeasurable(partition));
    };
    let fs_type = facts
        .filesystem_type(&partition)?
        .unwrap_or_else(|| declared_type.clone());

    Ok(SourceRoot {
        partition,
        declared_type,
        fs_type,
        size,
        free,
        used: size.saturating_sub(free),
    })
}

fn judge(
    facts: &dyn DeviceFacts,
    inspector: &dyn MountInspector,
    options: Options,
    policy: &EmptinessPolicy,
    source: &SourceRoot,
    multiple_devices: bool,
    partition: &Partition,
) -> Result<Verdict, EligibilityError> {
    let size = facts.size(partition)?;
    let free = facts.free(partition)?;
    let fs_type = facts.filesystem_type(partition)?;
    tracing::debug!(%partition, ?size, ?free, ?fs_type, "testing partition");

    let Some(mountpoint) = facts.mountpoint(partition)? else {
        return Ok(Verdict::NotMounted);
    };

    // Unknown sizes never qualify.
    if size.is_none_or(|size| size < source.size) {
        let free_sufficient = free.is_some_and(|free| free >= source.used);
        tracing::debug!(%partition, ?free, source_used = source.used, "smaller than source");
        return Ok(match (options.force, free_sufficient) {
            (false, false) => Verdict::TooSmall { size },
            (false, true) => Verdict::TooSmallButFreeSufficient { size, free },
            (true, false) => Verdict::FreeSpaceTooSmall { free },
            (true, true) => Verdict::SmallerButUsable {
                free,
                source_size: source.size,
            },
        });
    }

    if fs_type.as_deref() != Some(source.fs_type.as_str()) {
        return Ok(Verdict::TypeMismatch { fs_type });
    }

    if multiple_devices && !facts.is_gpt(partition)? {
        return Ok(Verdict::NotGpt {
            table_type: facts.partition_table_type(partition)?,
        });
    }

    if *partition == source.partition {
        return Ok(Verdict::Unknown);
    }

    let emptiness = match policy.inspect(inspector, Path::new(&mountpoint)) {
        Ok(emptiness) => emptiness,
        Err(e) => {
            tracing::warn!(%partition, %mountpoint, error = %e, "unable to inspect mountpoint");
            return Ok(Verdict::Uninspectable {
                reason: e.to_string(),
            });
        }
    };
    tracing::debug!(%partition, ?emptiness, "mountpoint contents");

    if emptiness.is_empty() {
        Ok(Verdict::Eligible)
    } else {
        Ok(Verdict::NotEmpty {
            entries: emptiness.entries,
        })
    }
}
