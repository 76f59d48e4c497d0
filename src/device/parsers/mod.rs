//! Parsers for the output of the block device listing tools
//!
//! Each submodule owns one tool: the exact command line, the column layout it
//! relies on and the typed queries over the parsed rows. The column layouts are
//! documented next to each parser; a change in a tool's column order breaks
//! the corresponding parser.

mod blkid;
mod df;
mod fdisk;
mod lsblk;
mod parted;
mod sgdisk;

pub use blkid::Blkid;
pub use df::Df;
pub use fdisk::Fdisk;
pub use lsblk::Lsblk;
pub use parted::{GPT, Parted};
pub use sgdisk::Sgdisk;

use crate::command::CommandRunner;
use crate::device::error::{DeviceError, DeviceResult};

/// Every data line of a tabular listing starts with this prefix.
pub const DEVICE_PREFIX: &str = "/dev/";

/// A tool whose whole output is fetched with one fixed command.
pub trait ListingTool: Sized {
    const PROGRAM: &'static str;
    const ARGS: &'static [&'static str];

    fn parse(output: &str) -> DeviceResult<Self>;

    fn collect(runner: &dyn CommandRunner) -> DeviceResult<Self> {
        let output = runner.run_checked(Self::PROGRAM, Self::ARGS)?;
        Self::parse(&output)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Delimiter {
    Whitespace,
    Char(char),
}

/// Column layout of a tabular tool output.
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub tool: &'static str,
    pub delimiter: Delimiter,
    pub min_columns: usize,
    pub max_columns: Option<usize>,
}

impl Schema {
    /// Split every data line into columns, skipping headers and other lines that
    /// do not start with [`DEVICE_PREFIX`].
    pub fn rows<'a>(&self, output: &'a str) -> DeviceResult<Vec<Vec<&'a str>>> {
        output
            .lines()
            .filter(|line| line.starts_with(DEVICE_PREFIX))
            .map(|line| self.columns(line))
            .collect()
    }

    pub fn columns<'a>(&self, line: &'a str) -> DeviceResult<Vec<&'a str>> {
        let columns: Vec<&str> = match self.delimiter {
            Delimiter::Whitespace => line.split_whitespace().collect(),
            Delimiter::Char(c) => line.split(c).collect(),
        };

        if columns.len() < self.min_columns {
            return Err(DeviceError::schema(
                self.tool,
                line,
                format!(
                    "expected at least {} columns, found {}",
                    self.min_columns,
                    columns.len()
                ),
            ));
        }
        if let Some(max) = self.max_columns
            && columns.len() > max
        {
            return Err(DeviceError::schema(
                self.tool,
                line,
                format!("expected at most {} columns, found {}", max, columns.len()),
            ));
        }
        Ok(columns)
    }
}

/// Parse a numeric column, reporting the offending line on failure.
pub(crate) fn number(tool: &'static str, line: &str, column: &str) -> DeviceResult<u64> {
    column
        .parse()
        .map_err(|_| DeviceError::schema(tool, line, format!("'{}' is not a number", column)))
}
