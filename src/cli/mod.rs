use std::path::PathBuf;

use clap::{value_parser, Parser, Subcommand};
use log::LevelFilter;

use crate::logging::DEFAULT_LOG_FILE;
use crate::orchestrator::EXIT_CONFIG;

/// Default folder for the backups of all instances.
pub const DEFAULT_BACKUP_ROOT: &str = "/backups";

/// Backup MongoDB instances using mongodump.
///
/// Connections are read from MONGODB_CONNECTIONS (JSON object of name to connection string),
/// from MONGODB_URI_<NAME> or from MONGODB_URI, in that order.
#[derive(Parser, Debug)]
#[command(version, about, long_about)]
pub struct Cli {
    /// Verbosity of the command output.
    #[arg(long)]
    pub verbose: Option<LevelFilter>,

    #[arg(long, short = 'r', env = "BACKUP_DIR", default_value = DEFAULT_BACKUP_ROOT)]
    /// Folder containing one backup folder per instance.
    pub backup_root: PathBuf,

    /// Number of dated backups to keep per instance.
    #[arg(
        long,
        env = "DAYS_TO_KEEP",
        default_value = "14",
        value_parser = value_parser!(u32).range(1..)
    )]
    pub days_to_keep: u32,

    /// File receiving a copy of the command output.
    #[arg(long, env = "BACKUP_LOG_FILE", default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// Log to standard output only.
    #[arg(long)]
    pub no_log_file: bool,

    /// TOML configuration of the dump tool. Created with defaults if it doesn't exist.
    #[arg(long, short = 'c', env = "MONGODB_BACKUP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Simulative backup run.
    #[arg(long)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub action: Option<Action>,
}

impl Cli {
    /// The log file unless disabled.
    pub fn log_file(&self) -> Option<&std::path::Path> {
        (!self.no_log_file).then_some(self.log_file.as_path())
    }
}

/// Process exit status for a command line that couldn't be parsed.
///
/// Help and version output are successful exits. Invalid arguments or
/// environment values are configuration errors, so they don't collide with
/// the status reporting failed instance backups.
pub fn parse_error_exit_code(error: &clap::Error) -> u8 {
    if error.use_stderr() {
        EXIT_CONFIG
    } else {
        0
    }
}

#[derive(Subcommand, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Backup all instances and prune their old backups. (Default)
    #[default]
    Backup,
    /// List the configured instances and their backups.
    List,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn explicit_arguments() {
        let cli = Cli::try_parse_from([
            "mongo_backup",
            "--backup-root",
            "/srv/backups",
            "--days-to-keep",
            "7",
            "--no-log-file",
            "--verbose",
            "debug",
            "list",
        ])
        .unwrap();

        assert_eq!(cli.backup_root, PathBuf::from("/srv/backups"));
        assert_eq!(cli.days_to_keep, 7);
        assert_eq!(cli.log_file(), None);
        assert_eq!(cli.verbose, Some(LevelFilter::Debug));
        assert_eq!(cli.action, Some(Action::List));
    }

    #[test]
    fn keeping_no_backups_is_rejected() {
        assert!(Cli::try_parse_from(["mongo_backup", "--days-to-keep", "0"]).is_err());
    }

    #[test]
    fn invalid_arguments_are_configuration_errors() {
        let err = Cli::try_parse_from(["mongo_backup", "--days-to-keep", "abc"]).unwrap_err();
        assert_eq!(parse_error_exit_code(&err), EXIT_CONFIG);

        let err = Cli::try_parse_from(["mongo_backup", "--no-such-flag"]).unwrap_err();
        assert_eq!(parse_error_exit_code(&err), EXIT_CONFIG);
        assert_ne!(EXIT_CONFIG, crate::orchestrator::EXIT_INSTANCE_FAILED);
    }

    #[test]
    fn help_and_version_exit_successfully() {
        for flag in ["--help", "--version"] {
            let err = Cli::try_parse_from(["mongo_backup", flag]).unwrap_err();
            assert_eq!(parse_error_exit_code(&err), 0, "{flag}");
        }
    }

    #[test]
    fn backup_is_the_default_action() {
        let cli = Cli::try_parse_from(["mongo_backup", "-r", "/srv/backups"]).unwrap();
        assert_eq!(cli.action.unwrap_or_default(), Action::Backup);
        assert!(!cli.dry_run);
    }
}
