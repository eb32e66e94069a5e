use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::{DumpTool, ToolOutput};

const DEFAULT_PROGRAM: &str = "mongodump";

/// Options of the [Mongodump] tool.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MongodumpConfig {
    /// Path or name of the `mongodump` executable.
    pub program: PathBuf,

    /// Compress the dumped collections (`--gzip`).
    pub gzip: bool,

    /// Additional arguments appended to every invocation.
    pub extra_args: Vec<String>,
}

impl Default for MongodumpConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROGRAM),
            gzip: false,
            extra_args: Vec::new(),
        }
    }
}

/// Dumps a complete instance using [`mongodump`](https://www.mongodb.com/docs/database-tools/mongodump/).
#[derive(Debug, Clone, Default)]
pub struct Mongodump {
    config: MongodumpConfig,
}

impl Mongodump {
    pub fn with_config(config: MongodumpConfig) -> Self {
        Self { config }
    }

    fn command(&self, uri: &str, destination: &Path) -> Command {
        let mut command = Command::new(&self.config.program);
        command
            .arg("--uri")
            .arg(uri)
            .arg("--out")
            .arg(destination);

        if self.config.gzip {
            command.arg("--gzip");
        }
        command.args(&self.config.extra_args);

        command
    }
}

impl DumpTool for Mongodump {
    fn name(&self) -> &str {
        DEFAULT_PROGRAM
    }

    fn dump(&self, uri: &str, destination: &Path) -> io::Result<ToolOutput> {
        let mut command = self.command(uri, destination);

        // never log the uri, it usually contains credentials
        log::trace!(
            target: "backup::mongodump",
            "Running: {} --uri <redacted> --out {}{} {}",
            self.config.program.display(),
            destination.display(),
            if self.config.gzip { " --gzip" } else { "" },
            self.config.extra_args.join(" "),
        );

        let output = command.stdin(Stdio::null()).output()?;
        log::trace!(target: "backup::mongodump", "mongodump exited with {}", output.status);

        Ok(output.into())
    }
}
