//! Text edits applied to the copied fstab and the boot command file

use regex::{Captures, Regex};
use std::sync::LazyLock;

static ROOT_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|\s)root=\S+").expect("valid regex"));

pub const FSTAB_MARKER: &str = concat!("# commented out by ", env!("CARGO_PKG_NAME"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FstabEdit {
    pub text: String,
    /// Entries that already mounted the target and were disabled.
    pub commented: usize,
    /// Entries moved from the source reference to the target.
    pub replaced: usize,
}

/// Point the root entry of a copied fstab at the new root partition.
///
/// Entries already naming the target (by device path or by `target_id`) are
/// commented out first, then entries naming `source_reference` get
/// `target_id` as their device field.
pub fn rewrite_fstab(
    fstab: &str,
    source_reference: &str,
    target_device: &str,
    target_id: &str,
) -> FstabEdit {
    let mut commented = 0;
    let mut replaced = 0;

    let mut lines: Vec<String> = fstab
        .lines()
        .map(|line| {
            let Some(device) = line.split_whitespace().next() else {
                return line.to_string();
            };
            if device.starts_with('#') {
                return line.to_string();
            }
            if device == target_device || device == target_id {
                commented += 1;
                return format!("{}: {}", FSTAB_MARKER, line);
            }
            if device == source_reference {
                replaced += 1;
                return line.replacen(source_reference, target_id, 1);
            }
            line.to_string()
        })
        .collect();

    if fstab.ends_with('\n') {
        lines.push(String::new());
    }

    FstabEdit {
        text: lines.join("\n"),
        commented,
        replaced,
    }
}

/// Replace every `root=` value in the boot command line with `target_id`.
pub fn rewrite_cmdline(cmdline: &str, target_id: &str) -> String {
    ROOT_TOKEN
        .replace_all(cmdline, |caps: &Captures| format!("{}root={}", &caps[1], target_id))
        .into_owned()
}
