use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};

use super::DumpTool;
use crate::connections::{Connection, InstanceName};
use crate::util::retention::DATE_FORMAT;

/// Outcome of dumping one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRun {
    pub instance: InstanceName,
    pub date: NaiveDate,
    /// Dated backup directory the dump was written to.
    pub path: PathBuf,
    pub succeeded: bool,
    /// Error output of the dump tool or the reason it couldn't be run.
    pub diagnostic: Option<String>,
}

impl BackupRun {
    fn succeeded(instance: InstanceName, date: NaiveDate, path: PathBuf) -> Self {
        Self {
            instance,
            date,
            path,
            succeeded: true,
            diagnostic: None,
        }
    }

    fn failed(instance: InstanceName, date: NaiveDate, path: PathBuf, diagnostic: String) -> Self {
        Self {
            instance,
            date,
            path,
            succeeded: false,
            diagnostic: Some(diagnostic),
        }
    }
}

/// Runs a [DumpTool] for an instance into its dated backup directory.
#[derive(Debug)]
pub struct DumpInvoker<T> {
    backup_root: PathBuf,
    tool: T,
    dry_run: bool,
}

impl<T: DumpTool> DumpInvoker<T> {
    pub fn new(backup_root: &Path, tool: T) -> Self {
        if backup_root.is_relative() {
            log::warn!(target: "backup::dump", "backup_root is relative: {}", backup_root.display());
        }

        Self {
            backup_root: backup_root.to_path_buf(),
            tool,
            dry_run: false,
        }
    }

    /// On a dry run no directories are created and the tool isn't run.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn backup_root(&self) -> &Path {
        &self.backup_root
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn tool(&self) -> &T {
        &self.tool
    }

    /// Path of the backup of `instance` taken on `date`.
    pub fn backup_path(&self, instance: &InstanceName, date: NaiveDate) -> PathBuf {
        self.backup_root
            .join(instance)
            .join(date.format(DATE_FORMAT).to_string())
    }

    /// Dumps the instance into today's backup directory.
    pub fn run(&self, connection: &Connection) -> BackupRun {
        self.run_on(connection, Local::now().date_naive())
    }

    /// Dumps the instance into the backup directory of `date`.
    ///
    /// A backup directory already existing for `date` is reused.
    pub fn run_on(&self, connection: &Connection, date: NaiveDate) -> BackupRun {
        let instance = connection.name.clone();
        let path = self.backup_path(&instance, date);
        log::info!(
            target: "backup::dump",
            "Starting backup of instance '{instance}' to {}",
            path.display()
        );

        if self.dry_run {
            log::warn!(
                target: "backup::dump",
                "Dry-run: skipping {} for instance '{instance}'",
                self.tool.name()
            );
            return BackupRun::succeeded(instance, date, path);
        }

        if let Err(e) = fs::create_dir_all(&path) {
            let diagnostic = format!("Unable to create {}: {e}", path.display());
            log::error!(target: "backup::dump", "Backup of instance '{instance}' failed: {diagnostic}");
            return BackupRun::failed(instance, date, path, diagnostic);
        }

        match self.tool.dump(&connection.uri, &path) {
            Ok(output) if output.success => {
                let stderr = output.stderr.trim();
                if !stderr.is_empty() {
                    log::debug!(target: "backup::dump", "{}: {stderr}", self.tool.name());
                }
                log::info!(
                    target: "backup::dump",
                    "Backup of instance '{instance}' completed successfully: {}",
                    path.display()
                );
                BackupRun::succeeded(instance, date, path)
            }
            Ok(output) => {
                let stderr = output.stderr.trim();
                let diagnostic = if stderr.is_empty() {
                    match output.code {
                        Some(code) => format!("{} exited with code {code}", self.tool.name()),
                        None => format!("{} was terminated by a signal", self.tool.name()),
                    }
                } else {
                    stderr.to_string()
                };
                log::error!(target: "backup::dump", "Backup of instance '{instance}' failed: {diagnostic}");
                BackupRun::failed(instance, date, path, diagnostic)
            }
            Err(e) => {
                let diagnostic = format!("Unable to run {}: {e}", self.tool.name());
                log::error!(target: "backup::dump", "Backup of instance '{instance}' failed: {diagnostic}");
                BackupRun::failed(instance, date, path, diagnostic)
            }
        }
    }
}
