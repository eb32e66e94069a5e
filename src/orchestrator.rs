//! Backup run over all configured instances.
//!
//! Instances are processed one after another. Each one is dumped and, only if
//! the dump succeeded, its old backups are pruned. A failing instance never stops
//! the remaining ones from being backed up.

use std::fs;
use std::io;
use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use derive_more::{Display, Error, From};

use crate::backup::{BackupRun, DumpInvoker, DumpTool};
use crate::connections::{self, ConnectionSource, ConnectionsError};
use crate::util::retention::Retention;

/// Exit status if no connections, invalid arguments or an unreadable configuration file.
pub const EXIT_CONFIG: u8 = 1;
/// Exit status if the backup of at least one instance failed.
pub const EXIT_INSTANCE_FAILED: u8 = 2;
/// Exit status if the backup root or logging can't be set up.
pub const EXIT_SETUP: u8 = 3;

/// Errors aborting a run before any instance is processed.
#[derive(Debug, Display, Error, From)]
pub enum OrchestratorError {
    /// The backup root can't be created.
    #[display("Unable to create backup root {}: {source}", path.display())]
    BackupRoot { path: PathBuf, source: io::Error },

    /// No instance to backup.
    #[display("{_0}")]
    #[from]
    Connections(ConnectionsError),
}

impl OrchestratorError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::BackupRoot { .. } => EXIT_SETUP,
            Self::Connections(_) => EXIT_CONFIG,
        }
    }
}

/// Outcome of all instances of a run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub runs: Vec<BackupRun>,
}

impl RunSummary {
    pub fn failed(&self) -> impl Iterator<Item = &BackupRun> {
        self.runs.iter().filter(|run| !run.succeeded)
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed().next().is_none()
    }

    /// Process exit status summarizing the run.
    pub fn exit_code(&self) -> u8 {
        if self.all_succeeded() {
            0
        } else {
            EXIT_INSTANCE_FAILED
        }
    }
}

pub struct Orchestrator<S, T> {
    source: S,
    invoker: DumpInvoker<T>,
    retention: Retention,
}

impl<S: ConnectionSource, T: DumpTool> Orchestrator<S, T> {
    /// Both `invoker` and `retention` have to work on the same backup root.
    pub fn new(source: S, invoker: DumpInvoker<T>, retention: Retention) -> Self {
        debug_assert_eq!(
            invoker.backup_root(),
            retention.backup_root(),
            "dumps and retention should share the backup root"
        );

        Self {
            source,
            invoker,
            retention,
        }
    }

    /// Backs up every instance into today's backup directory.
    pub fn run(&self) -> Result<RunSummary, OrchestratorError> {
        self.run_with(|| Local::now().date_naive())
    }

    /// Backs up every instance into the backup directory of `date`.
    pub fn run_on(&self, date: NaiveDate) -> Result<RunSummary, OrchestratorError> {
        self.run_with(|| date)
    }

    fn run_with(&self, today: impl Fn() -> NaiveDate) -> Result<RunSummary, OrchestratorError> {
        let backup_root = self.invoker.backup_root();
        if !self.invoker.is_dry_run() {
            fs::create_dir_all(backup_root).map_err(|source| OrchestratorError::BackupRoot {
                path: backup_root.to_path_buf(),
                source,
            })?;
        }

        let connections = connections::resolve(&self.source)?;
        log::info!(
            target: "orchestrator",
            "Found {} MongoDB instances to backup, keeping {} backups each",
            connections.len(),
            self.retention.keep()
        );

        let mut summary = RunSummary::default();
        for connection in &connections {
            let run = self.invoker.run_on(connection, today());
            if run.succeeded {
                self.retention.prune(&connection.name);
            } else {
                log::warn!(
                    target: "orchestrator",
                    "Keeping all backups of instance '{}' since its backup failed",
                    connection.name
                );
            }
            summary.runs.push(run);
        }

        let failed: Vec<_> = summary.failed().map(|run| run.instance.as_str()).collect();
        if failed.is_empty() {
            log::info!(target: "orchestrator", "Backed up all {} instances", summary.runs.len());
        } else {
            log::error!(
                target: "orchestrator",
                "Backup failed for {} of {} instances: {}",
                failed.len(),
                summary.runs.len(),
                failed.join(", ")
            );
        }

        Ok(summary)
    }

    /// Logs the existing backups of every configured instance.
    pub fn list(&self) -> Result<(), OrchestratorError> {
        let connections = connections::resolve(&self.source)?;
        for connection in &connections {
            let instance = &connection.name;
            match self.retention.backup_dirs(instance) {
                Ok(backups) => match (backups.first(), backups.last()) {
                    (Some(oldest), Some(newest)) => log::info!(
                        target: "orchestrator",
                        "Instance '{instance}': {} backups from {oldest} to {newest}",
                        backups.len()
                    ),
                    _ => log::info!(target: "orchestrator", "Instance '{instance}': no backups"),
                },
                Err(e) => log::error!(
                    target: "orchestrator",
                    "Listing backups of instance '{instance}' failed: {e}"
                ),
            }
        }

        Ok(())
    }
}
