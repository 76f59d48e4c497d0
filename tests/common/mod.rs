use anyhow::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Scratch directory for log and config files of a single test.
pub struct TestEnvironment {
    temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn log_file(&self) -> PathBuf {
        self.path().join("sd2usb.log")
    }

    pub fn write_config(&self, content: &str) -> Result<PathBuf> {
        let path = self.path().join("sd2usb.toml");
        std::fs::write(&path, content)?;
        Ok(path)
    }
}
