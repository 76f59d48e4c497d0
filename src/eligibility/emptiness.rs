//! Emptiness check for candidate mountpoints

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

/// Directory access needed to judge whether a mounted filesystem is empty.
pub trait MountInspector {
    /// Names of the entries directly below `dir`.
    fn entries(&self, dir: &Path) -> io::Result<Vec<String>>;

    fn exists(&self, path: &Path) -> bool;
}

/// Reads the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsInspector;

impl MountInspector for FsInspector {
    fn entries(&self, dir: &Path) -> io::Result<Vec<String>> {
        std::fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect()
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// When a mounted filesystem counts as empty enough to receive the root
/// filesystem: nothing on it, only a lost+found directory, or a home directory
/// marker left by an earlier copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmptinessPolicy {
    /// Relative to the mountpoint.
    pub home_marker: PathBuf,
    /// Case-insensitive substring identifying a lost-and-found entry.
    pub lost_found_pattern: String,
    /// Count dot entries as well.
    pub include_hidden: bool,
}

impl Default for EmptinessPolicy {
    fn default() -> Self {
        Self {
            home_marker: PathBuf::from("home/pi"),
            lost_found_pattern: "lost".to_string(),
            include_hidden: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Emptiness {
    pub entries: usize,
    pub lost_found: usize,
    pub home_marker: bool,
}

impl Emptiness {
    pub fn is_empty(&self) -> bool {
        (self.entries == 1 && self.lost_found == 1)
            || (self.entries == 0 && self.lost_found == 0)
            || self.home_marker
    }
}

impl EmptinessPolicy {
    pub fn inspect(
        &self,
        inspector: &dyn MountInspector,
        mountpoint: &Path,
    ) -> io::Result<Emptiness> {
        let pattern = self.lost_found_pattern.to_lowercase();
        let entries: Vec<String> = inspector
            .entries(mountpoint)?
            .into_iter()
            .filter(|name| self.include_hidden || !name.starts_with('.'))
            .collect();
        let lost_found = entries
            .iter()
            .filter(|name| name.to_lowercase().contains(&pattern))
            .count();

        Ok(Emptiness {
            entries: entries.len(),
            lost_found,
            home_marker: inspector.exists(&mountpoint.join(&self.home_marker)),
        })
    }
}

#[cfg(test)]
pub mod fake {
    use super::*;
    use std::collections::{HashMap, HashSet};

    /// Directory listings held in memory.
    #[derive(Debug, Default)]
    pub struct FakeInspector {
        dirs: HashMap<PathBuf, Vec<String>>,
        existing: HashSet<PathBuf>,
    }

    impl FakeInspector {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn dir(mut self, dir: &str, entries: &[&str]) -> Self {
            self.dirs.insert(
                PathBuf::from(dir),
                entries.iter().map(|e| e.to_string()).collect(),
            );
            self
        }

        pub fn path(mut self, path: &str) -> Self {
            self.existing.insert(PathBuf::from(path));
            self
        }
    }

    impl MountInspector for FakeInspector {
        fn entries(&self, dir: &Path) -> io::Result<Vec<String>> {
            self.dirs
                .get(dir)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, dir.display().to_string()))
        }

        fn exists(&self, path: &Path) -> bool {
            self.existing.contains(path)
        }
    }
}
