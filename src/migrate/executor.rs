use anyhow::{Context, Result};
use std::path::Path;

use crate::ui::{Level, emit};

/// Performs the mutating steps of a migration, or only prints them when
/// running dry.
pub struct Executor {
    pub dry_run: bool,
}

impl Executor {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    fn print_dry_run(&self, action: &str) {
        emit(Level::Info, "migrate.dry_run", &format!("[DRY RUN] {}", action), None);
    }

    /// Copy the filesystem mounted at `source` into `target`, staying on one
    /// filesystem and keeping permissions.
    pub fn copy_tree(&self, source: &Path, target: &Path) -> Result<()> {
        let source_arg = source.to_string_lossy().into_owned();
        let pack = duct::cmd!(
            "tar",
            "cf",
            "-",
            "--one-file-system",
            "--checkpoint=1000",
            &source_arg
        );
        let unpack = duct::cmd!("tar", "xfp", "-").dir(target);

        if self.dry_run {
            self.print_dry_run(&format!(
                "tar cf - --one-file-system --checkpoint=1000 {} | (cd {}; tar xfp -)",
                source.display(),
                target.display()
            ));
            return Ok(());
        }

        tracing::info!(
            source = %source.display(),
            target = %target.display(),
            "copying root filesystem"
        );
        pack.pipe(unpack)
            .run()
            .with_context(|| format!("copying {} to {}", source.display(), target.display()))?;
        Ok(())
    }

    pub fn write_file(&self, path: &Path, contents: &str) -> Result<()> {
        if self.dry_run {
            self.print_dry_run(&format!("write {}:\n{}", path.display(), contents.trim_end()));
            return Ok(());
        }
        tracing::debug!(path = %path.display(), %contents, "writing file");
        std::fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
    }

    /// Copy `file` to `backup` with its permissions and make the copy read-only.
    pub fn backup_read_only(&self, file: &Path, backup: &Path) -> Result<()> {
        if self.dry_run {
            self.print_dry_run(&format!(
                "cp -a {} {}; chmod -w {}",
                file.display(),
                backup.display(),
                backup.display()
            ));
            return Ok(());
        }

        if backup.exists() {
            std::fs::remove_file(backup)
                .with_context(|| format!("removing stale backup {}", backup.display()))?;
        }
        std::fs::copy(file, backup)
            .with_context(|| format!("copying {} to {}", file.display(), backup.display()))?;

        let mut permissions = std::fs::metadata(backup)?.permissions();
        permissions.set_readonly(true);
        std::fs::set_permissions(backup, permissions)
            .with_context(|| format!("making {} read-only", backup.display()))?;
        Ok(())
    }
}
