//! Log output to standard output and a persistent log file.
//!
//! [`init`] installs an [`env_logger`] writing every line to both sinks.
//! The log file keeps receiving lines if standard output goes away.
//! The returned [`LogHandle`] flushes them when dropped.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use derive_more::{Display, Error, From};
use env_logger::{Env, Target};
use log::{LevelFilter, SetLoggerError};

/// Default location of the persistent log file.
pub const DEFAULT_LOG_FILE: &str = "/var/log/mongodb-backup.log";

/// Errors on setting up logging.
#[derive(Debug, Display, Error, From)]
pub enum LoggingError {
    /// Another logger is already installed.
    #[display("Installing the logger failed: {_0}")]
    AlreadyInitialized(SetLoggerError),
}

/// Writes everything to the console and, if available, to a log file.
///
/// A line counts as written if at least one sink accepted it.
struct Tee<W> {
    console: W,
    file: Option<File>,
}

impl<W: Write> Tee<W> {
    fn new(console: W, file: Option<File>) -> Self {
        Self { console, file }
    }
}

impl<W: Write> Write for Tee<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let console = self.console.write_all(buf);

        let mut logged = false;
        if let Some(file) = &mut self.file {
            match file.write_all(buf) {
                Ok(()) => logged = true,
                Err(e) => {
                    eprintln!("Writing to the log file failed, disabling it: {e}");
                    self.file = None;
                }
            }
        }

        match console {
            Err(e) if !logged => Err(e),
            _ => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let console = self.console.flush();
        match &mut self.file {
            Some(file) => file.flush().or(console),
            None => console,
        }
    }
}

fn open_log_file(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Keeps logging alive. Flushes all sinks on drop.
#[derive(Debug)]
#[must_use = "dropping the handle ends the logging lifecycle"]
pub struct LogHandle {
    _private: (),
}

impl Drop for LogHandle {
    fn drop(&mut self) {
        log::logger().flush();
    }
}

/// Installs the global logger.
///
/// Log lines contain a timestamp, the severity, the component (log target) and the message.
/// The level defaults to `info`, can be set by `RUST_LOG` and is overridden by `level`.
/// If `log_file` can't be opened, logging continues on standard output only.
pub fn init(level: Option<LevelFilter>, log_file: Option<&Path>) -> Result<LogHandle, LoggingError> {
    let (file, file_error) = match log_file.map(open_log_file) {
        Some(Ok(file)) => (Some(file), None),
        Some(Err(e)) => (None, Some(e)),
        None => (None, None),
    };

    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    if let Some(level) = level {
        builder.filter_level(level);
    }
    builder
        .target(Target::Pipe(Box::new(Tee::new(io::stdout(), file))))
        .format_timestamp_secs()
        .try_init()?;

    if let (Some(path), Some(e)) = (log_file, file_error) {
        log::warn!("Opening the log file {} failed, logging to stdout only: {e}", path.display());
    }

    Ok(LogHandle { _private: () })
}
