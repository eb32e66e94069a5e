//! Dumping MongoDB instances into dated backup directories.
//!
//! The [`DumpInvoker`] prepares `<backup_root>/<instance>/<YYYY-MM-DD>` and hands it
//! to a [`DumpTool`]. The only production [`DumpTool`] is [`Mongodump`].

pub mod config;
pub mod dump;
pub mod mongodump;

pub use config::{BackupConfig, ConfigFileError};
pub use dump::{BackupRun, DumpInvoker};
pub use mongodump::{Mongodump, MongodumpConfig};

use std::io;
use std::path::Path;
use std::process::Output;

/// Result of a finished dump tool process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// The process exited with status zero.
    pub success: bool,
    /// Exit code, [None] if the process was terminated by a signal.
    pub code: Option<i32>,
    /// Captured error stream.
    pub stderr: String,
}

impl From<Output> for ToolOutput {
    fn from(output: Output) -> Self {
        Self {
            success: output.status.success(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// External tool extracting the data of one instance.
pub trait DumpTool {
    /// Name of the tool used in log messages.
    fn name(&self) -> &str;

    /// Dumps the instance reachable by `uri` into `destination`.
    ///
    /// Blocks until the tool exits. An [`Err`] means the tool couldn't be run at all.
    fn dump(&self, uri: &str, destination: &Path) -> io::Result<ToolOutput>;
}
