//! # Lorry Mirror Updater CLI
//!
//! This is the binary entry point for the `lorry-mirror-updater` command-line
//! tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Installing the `env_logger` backend behind the library's `log` calls.
//! - Reporting the error that ended a run, unless it was already logged, and
//!   turning it into exit status 1.
//!
//! The core application logic is defined in the `lib.rs` library crate, ensuring
//! that the binary is a thin wrapper around the reusable library functionality.

mod cli;

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use log::error;
use lorry_mirror_updater::error::Error;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    init_logging(cli.log_level());

    match cli.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if !already_logged(&e) {
                error!("{}", e);
            }
            ExitCode::FAILURE
        }
    }
}

/// Failures of the mirroring and publishing stages are logged where they happen.
fn already_logged(e: &anyhow::Error) -> bool {
    e.downcast_ref::<Error>().is_some_and(Error::is_logged)
}

/// Log records as `LEVEL: message` on stderr; `RUST_LOG` refines `level`.
fn init_logging(level: &str) {
    env_logger::Builder::new()
        .parse_filters(level)
        .parse_default_env()
        .format(|buf, record| writeln!(buf, "{}: {}", record.level(), record.args()))
        .init();
}
