use std::process::ExitCode;

use clap::Parser;
use mongo_backup_lib::backup::{BackupConfig, DumpInvoker, Mongodump};
use mongo_backup_lib::cli::{self, Action, Cli};
use mongo_backup_lib::connections::EnvSource;
use mongo_backup_lib::logging;
use mongo_backup_lib::orchestrator::{Orchestrator, EXIT_CONFIG, EXIT_SETUP};
use mongo_backup_lib::util::retention::Retention;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // the logger isn't set up yet, clap prints to stdout/stderr itself
            let _ = e.print();
            return ExitCode::from(cli::parse_error_exit_code(&e));
        }
    };

    // init logger
    let _logging = match logging::init(cli.verbose, cli.log_file()) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(EXIT_SETUP);
        }
    };

    let config = match &cli.config {
        Some(path) => match BackupConfig::load_or_init(path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("Reading the config file failed: {e}");
                return ExitCode::from(EXIT_CONFIG);
            }
        },
        None => BackupConfig::default(),
    };

    let dry_run = cli.dry_run;
    if dry_run {
        log::warn!("Running in dry-run mode");
    }

    let invoker =
        DumpInvoker::new(&cli.backup_root, Mongodump::with_config(config.dump)).dry_run(dry_run);
    let retention = Retention::new(&cli.backup_root, cli.days_to_keep as usize).dry_run(dry_run);
    let orchestrator = Orchestrator::new(EnvSource, invoker, retention);

    let result = match cli.action.unwrap_or_default() {
        Action::Backup => orchestrator.run().map(|summary| summary.exit_code()),
        Action::List => orchestrator.list().map(|()| 0),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            log::error!(target: "orchestrator", "{e}");
            ExitCode::from(e.exit_code())
        }
    }
}
