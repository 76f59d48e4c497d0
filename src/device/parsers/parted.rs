//! `parted -l -m`
//!
//! ```text
//! BYT;
//! /dev/sda:4127MB:scsi:512:512:msdos:USB2.0 FlashDisk;
//! 1:1049kB:4127MB:4126MB:ext4::;
//!
//! BYT;
//! /dev/mmcblk0:3964MB:sd/mmc:512:512:msdos:SD SR04G;
//! 1:4194kB:62.9MB:58.7MB:fat16::lba;
//! ```
//!
//! Only the per-disk lines are used; the sixth field is the partition table type.

use super::{Delimiter, ListingTool, Schema};
use crate::command::{CommandRunner, command_line};
use crate::device::error::{DeviceError, DeviceResult};

const SCHEMA: Schema = Schema {
    tool: "parted",
    delimiter: Delimiter::Char(':'),
    min_columns: 6,
    max_columns: None,
};

pub const GPT: &str = "gpt";

#[derive(Debug, Clone, Default)]
pub struct Parted {
    tables: Vec<(String, String)>,
}

impl ListingTool for Parted {
    const PROGRAM: &'static str = "parted";
    const ARGS: &'static [&'static str] = &["-l", "-m"];

    fn parse(output: &str) -> DeviceResult<Self> {
        let tables = SCHEMA
            .rows(output)?
            .into_iter()
            .map(|columns| (columns[0].to_string(), columns[5].trim_end_matches(';').to_string()))
            .collect();
        Ok(Self { tables })
    }

    /// parted exits with 1 as soon as one disk carries no label, while still
    /// listing every other disk, so the raw exit status is inspected here.
    fn collect(runner: &dyn CommandRunner) -> DeviceResult<Self> {
        let output = runner.run(Self::PROGRAM, Self::ARGS)?;
        if !output.success() {
            if output.stdout.trim().is_empty() {
                return Err(DeviceError::CommandFailed {
                    command: command_line(Self::PROGRAM, Self::ARGS),
                    code: output.code.unwrap_or(-1),
                    stderr: output.stderr.trim_end().to_string(),
                });
            }
            tracing::warn!(
                code = ?output.code,
                stderr = %output.stderr.trim_end(),
                "parted reported errors, using partial output"
            );
        }
        Self::parse(&output.stdout)
    }
}

impl Parted {
    /// Partition table type of a physical device, e.g. `gpt` or `msdos`.
    pub fn partition_table_type(&self, device: &str) -> Option<&str> {
        self.tables
            .iter()
            .find(|(d, _)| d == device)
            .map(|(_, t)| t.as_str())
    }

    pub fn is_gpt(&self, device: &str) -> bool {
        self.partition_table_type(device) == Some(GPT)
    }
}
