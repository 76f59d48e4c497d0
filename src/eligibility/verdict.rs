//! Per-partition outcome of the eligibility rules

use serde::Serialize;
use std::fmt;

use crate::device::Partition;
use crate::ui::format_optional_size;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Eligible,
    /// Accepted with `--force`: smaller than the source but enough free space.
    SmallerButUsable {
        free: Option<u64>,
        source_size: u64,
    },
    NotMounted,
    TooSmall {
        size: Option<u64>,
    },
    /// Enough free space for the data, but only accepted with `--force`.
    TooSmallButFreeSufficient {
        size: Option<u64>,
        free: Option<u64>,
    },
    FreeSpaceTooSmall {
        free: Option<u64>,
    },
    TypeMismatch {
        fs_type: Option<String>,
    },
    NotGpt {
        table_type: Option<String>,
    },
    NotEmpty {
        entries: usize,
    },
    /// The mountpoint could not be listed.
    Uninspectable {
        reason: String,
    },
    /// The candidate is the source root itself.
    Unknown,
}

impl Verdict {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Verdict::Eligible | Verdict::SmallerButUsable { .. })
    }
}

/// A verdict together with the partition it was reached for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartitionVerdict {
    pub partition: Partition,
    #[serde(flatten)]
    pub verdict: Verdict,
}

impl fmt::Display for PartitionVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let device = self.partition.device();
        match &self.verdict {
            Verdict::Eligible => write!(f, "{} is eligible", device),
            Verdict::SmallerButUsable { free, source_size } => write!(
                f,
                "Partition {} has only {} free space and is smaller than root partition of size {}",
                device,
                format_optional_size(*free),
                format_optional_size(Some(*source_size))
            ),
            Verdict::NotMounted => write!(f, "Skipping {} - Partition is not mounted", device),
            Verdict::TooSmall { size } => write!(
                f,
                "Skipping {} - Partition is too small with size {}",
                device,
                format_optional_size(*size)
            ),
            Verdict::TooSmallButFreeSufficient { size, free } => write!(
                f,
                "Skipping {}. Partition is too small with partition size {}. But there is enough free space of {}. Use option --force to enable this partition",
                device,
                format_optional_size(*size),
                format_optional_size(*free)
            ),
            Verdict::FreeSpaceTooSmall { free } => write!(
                f,
                "Skipping {} - Partition is too small with {} free space",
                device,
                format_optional_size(*free)
            ),
            Verdict::TypeMismatch { fs_type } => write!(
                f,
                "Skipping {} - Partition has incorrect type {}",
                device,
                fs_type.as_deref().unwrap_or("n/a")
            ),
            Verdict::NotGpt { table_type } => write!(
                f,
                "Skipping {} - Partition has partitiontable type {} but has to be gpt",
                device,
                table_type.as_deref().unwrap_or("n/a")
            ),
            Verdict::NotEmpty { .. } => write!(
                f,
                "Skipping {} - Partition is not empty or there are more directories than the home marker",
                device
            ),
            Verdict::Uninspectable { reason } => write!(
                f,
                "Skipping {} - Unable to check whether the partition is empty: {}",
                device, reason
            ),
            Verdict::Unknown => write!(f, "Skipping {} for unknown reasons", device),
        }
    }
}
