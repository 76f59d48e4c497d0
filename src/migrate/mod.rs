//! Moving the root filesystem to the chosen target partition

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

pub mod edit;
pub mod executor;
pub mod select;

pub use executor::Executor;
pub use select::{Prompt, TerminalPrompt};

use crate::config::Config;
use crate::device::{DeviceFacts, Partition};
use crate::eligibility::EligibilityReport;
use crate::ui::{Level, emit, print_eligible};
use edit::{rewrite_cmdline, rewrite_fstab};
use select::{choose_target, confirmed};

pub const BACKUP_SUFFIX: &str = ".sd";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Moved { target: Partition, target_id: String },
    Cancelled,
}

/// How the boot command file and fstab will name the new root: by PARTUUID on
/// GPT disks, by device path otherwise.
pub fn target_id(facts: &dyn DeviceFacts, target: &Partition) -> Result<String> {
    if facts.is_gpt(target)? {
        let guid = facts
            .guid(target)?
            .with_context(|| format!("No partition GUID found for GPT partition {}", target))?;
        Ok(format!("PARTUUID={}", guid))
    } else {
        Ok(target.device().to_string())
    }
}

pub fn backup_path(cmdline_file: &Path) -> PathBuf {
    let mut backup = cmdline_file.as_os_str().to_owned();
    backup.push(BACKUP_SUFFIX);
    PathBuf::from(backup)
}

/// Let the user pick one of the eligible targets and move the root
/// filesystem there.
pub fn run(
    facts: &dyn DeviceFacts,
    report: &EligibilityReport,
    config: &Config,
    executor: &Executor,
    prompt: &dyn Prompt,
) -> Result<Outcome> {
    if report.eligible.is_empty() {
        bail!("No eligible target root partitions found");
    }
    print_eligible(&report.eligible);
    if executor.dry_run {
        emit(
            Level::Info,
            "migrate.dry_run",
            "Note: Commands will not be executed but listed",
            None,
        );
    }

    let source = &report.source.partition;
    let target = choose_target(prompt, &report.eligible)?.clone();

    let source_dir = facts
        .mountpoint(source)?
        .with_context(|| format!("Source root partition {} is not mounted", source))?;
    let target_dir = facts
        .mountpoint(&target)?
        .with_context(|| format!("Target partition {} is not mounted", target))?;
    tracing::debug!(%source_dir, %target_dir, "mountpoints");

    emit(
        Level::Info,
        "migrate.plan",
        &format!(
            "Partition {} will be copied to partition {} and become new root partition",
            source.device(),
            target.device()
        ),
        None,
    );
    if !confirmed(&prompt.input("Are you sure (y/N) ?")?) {
        return Ok(Outcome::Cancelled);
    }

    emit(Level::Info, "migrate.copy", "Copying rootpartition ... Please be patient", None);
    executor.copy_tree(Path::new(&source_dir), Path::new(&target_dir))?;

    let target_id = target_id(facts, &target)?;
    tracing::debug!(%target_id, "target id");

    update_fstab(executor, source, &target, &target_id, Path::new(&target_dir))?;
    update_cmdline(executor, &config.cmdline_file, source, &target, &target_id)?;

    emit(
        Level::Success,
        "migrate.done",
        &format!(
            "Finished moving root partition from {} to partition {}",
            source.device(),
            target.device()
        ),
        None,
    );
    Ok(Outcome::Moved { target, target_id })
}

fn update_fstab(
    executor: &Executor,
    source: &Partition,
    target: &Partition,
    target_id: &str,
    target_dir: &Path,
) -> Result<()> {
    let fstab_path = target_dir.join("etc/fstab");
    emit(
        Level::Info,
        "migrate.fstab",
        &format!("Updating /etc/fstab on {}", target.device()),
        None,
    );

    // Nothing has been copied in a dry run yet, so the file may not exist.
    if executor.dry_run && !fstab_path.exists() {
        emit(
            Level::Info,
            "migrate.dry_run",
            &format!(
                "[DRY RUN] replace {} with {} in {}",
                source.reference(),
                target_id,
                fstab_path.display()
            ),
            None,
        );
        return Ok(());
    }

    let fstab = std::fs::read_to_string(&fstab_path)
        .with_context(|| format!("reading {}", fstab_path.display()))?;
    let edit = rewrite_fstab(&fstab, &source.reference(), target.device(), target_id);
    if edit.commented > 0 {
        emit(
            Level::Warn,
            "migrate.fstab.target_in_use",
            &format!(
                "Target partition {} already used in fstab. Commenting out this line",
                target.device()
            ),
            None,
        );
    }
    if edit.replaced == 0 {
        emit(
            Level::Warn,
            "migrate.fstab.no_root_entry",
            &format!("No fstab entry for {} found in {}", source.reference(), fstab_path.display()),
            None,
        );
    }
    executor.write_file(&fstab_path, &edit.text)
}

fn update_cmdline(
    executor: &Executor,
    cmdline_file: &Path,
    source: &Partition,
    target: &Partition,
    target_id: &str,
) -> Result<()> {
    let backup = backup_path(cmdline_file);
    emit(
        Level::Info,
        "migrate.cmdline.backup",
        &format!(
            "Saving {} on {} as {}",
            cmdline_file.display(),
            source.device(),
            backup.display()
        ),
        None,
    );
    executor.backup_read_only(cmdline_file, &backup)?;

    emit(
        Level::Info,
        "migrate.cmdline",
        &format!("Updating {} on {}", cmdline_file.display(), target.device()),
        None,
    );
    let cmdline = std::fs::read_to_string(cmdline_file)
        .with_context(|| format!("reading {}", cmdline_file.display()))?;
    executor.write_file(cmdline_file, &rewrite_cmdline(&cmdline, target_id))
}
