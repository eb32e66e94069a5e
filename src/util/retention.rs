//! Retention of dated backup directories.
//!
//! Only directories named by a valid `YYYY-MM-DD` date count as backups.
//! Anything else below an instance's backup root is neither counted nor removed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::connections::InstanceName;

/// Format of the dated backup directory names.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// chrono alone accepts unpadded fields like `2024-1-5`
static DATE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date regex is valid"));

/// Returns if `name` is a zero-padded `YYYY-MM-DD` name of an existing calendar date.
pub fn is_backup_dir_name(name: &str) -> bool {
    DATE_NAME.is_match(name) && NaiveDate::parse_from_str(name, DATE_FORMAT).is_ok()
}

/// Outcome of pruning the backups of one instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Backups still present, oldest first.
    pub kept: Vec<String>,
    /// Backups removed, oldest first.
    pub removed: Vec<String>,
    /// Backups that should have been removed but couldn't.
    pub failed: Vec<String>,
}

/// Removes one backup directory with all its contents.
pub type Remover = fn(&Path) -> io::Result<()>;

fn remove_backup_dir(path: &Path) -> io::Result<()> {
    fs::remove_dir_all(path)
}

/// Keeps the newest `keep` dated backups of every instance.
#[derive(Debug, Clone)]
pub struct Retention {
    backup_root: PathBuf,
    keep: usize,
    dry_run: bool,
    remove: Remover,
}

impl Retention {
    pub fn new(backup_root: &Path, keep: usize) -> Self {
        Self {
            backup_root: backup_root.to_path_buf(),
            keep,
            dry_run: false,
            remove: remove_backup_dir,
        }
    }

    /// Replaces how old backups are removed. Defaults to [`fs::remove_dir_all`].
    pub fn with_remover(mut self, remove: Remover) -> Self {
        self.remove = remove;
        self
    }

    pub fn backup_root(&self) -> &Path {
        &self.backup_root
    }

    /// On a dry run backups to remove are only logged.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn keep(&self) -> usize {
        self.keep
    }

    fn instance_root(&self, instance: &InstanceName) -> PathBuf {
        self.backup_root.join(instance)
    }

    /// Names of the dated backups of `instance`, oldest first.
    ///
    /// Returns no backups if the instance has no backup directory yet.
    pub fn backup_dirs(&self, instance: &InstanceName) -> io::Result<Vec<String>> {
        let instance_root = self.instance_root(instance);
        if !instance_root.exists() {
            return Ok(Vec::new());
        }

        let mut backups = Vec::new();
        for entry in fs::read_dir(&instance_root)? {
            let entry = entry?;
            // symlinks are never followed into, let alone removed
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if is_backup_dir_name(&name) {
                backups.push(name);
            } else {
                log::trace!(target: "retention", "Ignoring non-backup directory {name} of instance '{instance}'");
            }
        }

        // zero-padded ISO dates sort chronologically
        backups.sort();
        Ok(backups)
    }

    /// Removes the oldest backups of `instance` exceeding the retention count.
    ///
    /// A backup that can't be removed is logged and skipped.
    pub fn prune(&self, instance: &InstanceName) -> PruneReport {
        log::info!(
            target: "retention",
            "Cleaning up backups of instance '{instance}', keeping the newest {}",
            self.keep
        );

        let mut backups = match self.backup_dirs(instance) {
            Ok(backups) => backups,
            Err(e) => {
                log::error!(
                    target: "retention",
                    "Listing backups of instance '{instance}' in {} failed: {e}",
                    self.instance_root(instance).display()
                );
                return PruneReport::default();
            }
        };

        let excess = backups.len().saturating_sub(self.keep);
        let mut report = PruneReport::default();
        for oldest in backups.drain(..excess) {
            let path = self.instance_root(instance).join(&oldest);
            if self.dry_run {
                log::warn!(target: "retention", "Dry-run: would remove old backup of instance '{instance}': {oldest}");
                report.removed.push(oldest);
                continue;
            }

            log::info!(target: "retention", "Removing old backup of instance '{instance}': {oldest}");
            match (self.remove)(&path) {
                Ok(()) => report.removed.push(oldest),
                Err(e) => {
                    log::error!(
                        target: "retention",
                        "Failed to remove old backup {oldest} of instance '{instance}': {e}"
                    );
                    report.failed.push(oldest);
                }
            }
        }
        report.kept = backups;

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(name: &str) -> InstanceName {
        name.parse().unwrap()
    }

    /// Creates the dated backups 2024-01-01 up to 2024-01-`days`.
    fn seed_january(root: &Path, instance: &str, days: u32) {
        for day in 1..=days {
            let dir = root.join(instance).join(format!("2024-01-{day:02}"));
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("admin.bson"), b"dump").unwrap();
        }
    }

    fn remaining(root: &Path, instance: &str) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(root.join(instance))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn recognizes_backup_names() {
        assert!(is_backup_dir_name("2024-01-31"));
        assert!(is_backup_dir_name("2024-02-29"));

        for name in [
            "2024-13-40",
            "2023-02-29",
            "2024-1-5",
            "2024-01-01-old",
            " 2024-01-01",
            "24-01-01",
            "latest",
            "",
        ] {
            assert!(!is_backup_dir_name(name), "{name:?} should not be a backup");
        }
    }

    #[test]
    fn missing_instance_root_is_a_noop() {
        let root = tempfile::tempdir().unwrap();
        let retention = Retention::new(root.path(), 3);

        assert_eq!(retention.prune(&instance("new")), PruneReport::default());
        assert!(!root.path().join("new").exists());
    }

    #[test]
    fn removes_exactly_the_oldest() {
        let root = tempfile::tempdir().unwrap();
        seed_january(root.path(), "primary", 10);
        let retention = Retention::new(root.path(), 4);

        let report = retention.prune(&instance("primary"));

        let expected_removed: Vec<_> = (1..=6).map(|d| format!("2024-01-{d:02}")).collect();
        let expected_kept: Vec<_> = (7..=10).map(|d| format!("2024-01-{d:02}")).collect();
        assert_eq!(report.removed, expected_removed);
        assert_eq!(report.kept, expected_kept);
        assert!(report.failed.is_empty());
        assert_eq!(remaining(root.path(), "primary"), expected_kept);
    }

    #[test]
    fn keeps_everything_within_the_window() {
        let root = tempfile::tempdir().unwrap();
        seed_january(root.path(), "primary", 3);
        let retention = Retention::new(root.path(), 3);

        let report = retention.prune(&instance("primary"));

        assert!(report.removed.is_empty());
        assert_eq!(report.kept.len(), 3);
    }

    #[test]
    fn second_prune_is_a_noop() {
        let root = tempfile::tempdir().unwrap();
        seed_january(root.path(), "primary", 8);
        let retention = Retention::new(root.path(), 5);

        assert_eq!(retention.prune(&instance("primary")).removed.len(), 3);
        let second = retention.prune(&instance("primary"));
        assert!(second.removed.is_empty());
        assert_eq!(second.kept.len(), 5);
    }

    #[test]
    fn non_backup_entries_are_neither_counted_nor_removed() {
        let root = tempfile::tempdir().unwrap();
        seed_january(root.path(), "primary", 3);
        let instance_root = root.path().join("primary");
        fs::create_dir(instance_root.join("2024-13-40")).unwrap();
        fs::create_dir(instance_root.join("0000-00-00")).unwrap();
        fs::create_dir(instance_root.join("manual")).unwrap();
        fs::write(instance_root.join("2023-12-31"), b"a file, not a backup").unwrap();
        let retention = Retention::new(root.path(), 2);

        let report = retention.prune(&instance("primary"));

        assert_eq!(report.removed, ["2024-01-01"]);
        assert_eq!(
            remaining(root.path(), "primary"),
            ["0000-00-00", "2023-12-31", "2024-01-02", "2024-01-03", "2024-13-40", "manual"]
        );
    }

    #[test]
    fn failed_removal_continues_with_the_next_backup() {
        fn refuse_oldest(path: &Path) -> io::Result<()> {
            if path.ends_with("2024-01-01") {
                Err(io::ErrorKind::PermissionDenied.into())
            } else {
                fs::remove_dir_all(path)
            }
        }

        let root = tempfile::tempdir().unwrap();
        seed_january(root.path(), "primary", 6);
        let retention = Retention::new(root.path(), 2).with_remover(refuse_oldest);

        let report = retention.prune(&instance("primary"));

        assert_eq!(report.failed, ["2024-01-01"]);
        assert_eq!(report.removed, ["2024-01-02", "2024-01-03", "2024-01-04"]);
        assert_eq!(report.kept, ["2024-01-05", "2024-01-06"]);
        assert_eq!(
            remaining(root.path(), "primary"),
            ["2024-01-01", "2024-01-05", "2024-01-06"]
        );
    }

    #[test]
    fn dry_run_removes_nothing() {
        let root = tempfile::tempdir().unwrap();
        seed_january(root.path(), "primary", 5);
        let retention = Retention::new(root.path(), 2).dry_run(true);

        let report = retention.prune(&instance("primary"));

        assert_eq!(report.removed, ["2024-01-01", "2024-01-02", "2024-01-03"]);
        assert_eq!(remaining(root.path(), "primary").len(), 5);
    }

    #[test]
    fn instances_are_pruned_independently() {
        let root = tempfile::tempdir().unwrap();
        seed_january(root.path(), "a", 5);
        seed_january(root.path(), "b", 5);
        let retention = Retention::new(root.path(), 1);

        retention.prune(&instance("a"));

        assert_eq!(remaining(root.path(), "a"), ["2024-01-05"]);
        assert_eq!(remaining(root.path(), "b").len(), 5);
    }
}
