//! # Error Handling
//!
//! This module defines the error type shared by the `lorry-mirror-updater`
//! library. It uses `thiserror` to describe every failure that can end a run,
//! grouped the same way the run reports them:
//!
//! - **Environment** errors: a required tool is missing, or the target
//!   directory is not a clean git checkout.
//! - **Configuration** errors: the mirror configuration cannot be read or is
//!   not the expected JSON shape.
//! - **Operational** errors: an external command could not be started or
//!   exited with a non-zero status.
//! - **Publishing** errors: the automation branch could not be pushed or the
//!   merge request could not be opened.
//!
//! Most of the pipeline logs a failure where it happens and hands a plain
//! `bool` or `Option` upwards. `Error` is what crosses the library boundary
//! into the binary, which turns it into a non-zero exit status.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for lorry-mirror-updater operations
#[derive(Error, Debug)]
pub enum Error {
    /// The mirror configuration file could not be read.
    #[error("{}: {}: {source}", config_read_failure(source), path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The mirror configuration file is not valid JSON of the expected shape.
    #[error("Invalid JSON in mirror configuration file {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// An external program could not be started at all.
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// An external command ran and exited unsuccessfully.
    #[error("Command failed ({}): {command}{}", code.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string()), if stderr.is_empty() { String::new() } else { format!(" - {}", stderr) })]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The host is not fit to run the updater.
    #[error("Environment validation failed: {message}")]
    Environment { message: String },

    /// `git rev-parse --show-toplevel` gave no answer.
    #[error("Failed to determine the top-level git directory")]
    Toplevel,

    /// Two command-line options were combined in a way that cannot work.
    #[error("{message}")]
    InvalidOptions { message: String },

    /// A repository, branch or the commit step failed.
    #[error("Mirroring failed")]
    Mirroring,

    /// The automation branch could not be pushed.
    #[error("Failed to push branch {branch}")]
    Push { branch: String },

    /// The merge request step failed.
    #[error("Failed to open merge request for {branch}")]
    Review { branch: String },
}

impl Error {
    /// Whether the failure was already logged where it happened.
    ///
    /// Commands log their own failures, and the mirroring and publishing
    /// stages log the branch, repository or platform error that stopped them.
    pub fn is_logged(&self) -> bool {
        matches!(
            self,
            Error::Spawn { .. }
                | Error::CommandFailed { .. }
                | Error::Mirroring
                | Error::Push { .. }
                | Error::Review { .. }
        )
    }
}

fn config_read_failure(source: &std::io::Error) -> &'static str {
    match source.kind() {
        std::io::ErrorKind::NotFound => "Mirror configuration file not found",
        _ => "Failed to read mirror configuration file",
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
