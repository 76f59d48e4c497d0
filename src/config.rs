//! Runtime configuration
//!
//! All values default to the Raspberry Pi layout; an optional TOML file can
//! override any of them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::eligibility::EmptinessPolicy;

pub const DEFAULT_CONFIG_FILE: &str = "/etc/sd2usb.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Physical device of the boot media (the SD card)
    pub boot_device: String,
    /// Prefix shared by every partition on the boot media
    pub boot_partition_prefix: String,
    /// Root partition on the boot media, reported by df as `rootfs_alias` on older images
    pub source_root_device: String,
    pub rootfs_alias: String,
    /// Boot command file holding `root=` and `rootfstype=`
    pub cmdline_file: PathBuf,
    pub log_file: PathBuf,
    pub emptiness: EmptinessPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            boot_device: "/dev/mmcblk0".to_string(),
            boot_partition_prefix: "/dev/mmcblk0p".to_string(),
            source_root_device: "/dev/mmcblk0p2".to_string(),
            rootfs_alias: "/dev/root".to_string(),
            cmdline_file: PathBuf::from("/boot/cmdline.txt"),
            log_file: PathBuf::from(concat!("./", env!("CARGO_PKG_NAME"), ".log")),
            emptiness: EmptinessPolicy::default(),
        }
    }
}

impl Config {
    /// Load the configuration from `path`, or from [`DEFAULT_CONFIG_FILE`] when
    /// it exists, falling back to the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Configuration file not found: {}", path.display());
                }
                Self::load_from_path(path)
            }
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load_from_path(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        if !config.boot_partition_prefix.starts_with(&config.boot_device) {
            anyhow::bail!(
                "boot_partition_prefix {} does not belong to boot_device {}",
                config.boot_partition_prefix,
                config.boot_device
            );
        }
        Ok(config)
    }
}
