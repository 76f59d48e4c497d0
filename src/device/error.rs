use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Failed to execute '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command '{command}' failed with rc {code}\nError message:\n{stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("Unexpected {tool} output line '{line}': {reason}")]
    Schema {
        tool: &'static str,
        line: String,
        reason: String,
    },

    #[error("Unable to split partition {0} into device and partition number")]
    SplitPartition(String),

    #[error("{} does not exist", .0.display())]
    CmdlineMissing(PathBuf),

    #[error("Unable to detect rootPartition and/or rootfstype in {}", .0.display())]
    CmdlineUnparseable(PathBuf),

    #[error("No partition found with PARTUUID {0}")]
    UnknownPartUuid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeviceError {
    pub fn schema(tool: &'static str, line: &str, reason: impl Into<String>) -> Self {
        DeviceError::Schema {
            tool,
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}

pub type DeviceResult<T> = Result<T, DeviceError>;
