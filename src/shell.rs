//! # Shell Executor
//!
//! Every external program the updater drives (`git`, `bst`, `bst-to-lorry`)
//! goes through [`ShellCommand`]. The builder records the program, its
//! arguments, the working directory and how a failure should be reported;
//! [`ShellCommand::run`] executes it synchronously.
//!
//! Reporting rules:
//!
//! - one `info` line with the full command line before execution;
//! - on a non-zero exit, one line with the trimmed stderr, logged as a warning
//!   when the caller marked the command [`non_fatal`](ShellCommand::non_fatal)
//!   and as an error otherwise.
//!
//! A failure is always returned to the caller. The executor never exits the
//! process.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::{error, info, warn};

use crate::error::{Error, Result};

/// Output of a successful command.
///
/// Both streams are empty unless the command was built with
/// [`ShellCommand::capture_output`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// A command line waiting to be run.
#[derive(Debug, Clone)]
pub struct ShellCommand {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    capture: bool,
    context: Option<String>,
    non_fatal: bool,
}

impl ShellCommand {
    /// Start building a command for `program`, looked up on `PATH`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            capture: false,
            context: None,
            non_fatal: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run the command from `dir` instead of the current directory.
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Capture stdout and stderr. Without this both streams are discarded.
    pub fn capture_output(mut self) -> Self {
        self.capture = true;
        self
    }

    /// Message logged in front of stderr when the command fails.
    pub fn context(mut self, message: impl Into<String>) -> Self {
        self.context = Some(message.into());
        self
    }

    /// Report a failure as a warning rather than an error.
    ///
    /// Used for probes whose negative answer is an expected outcome.
    pub fn non_fatal(mut self) -> Self {
        self.non_fatal = true;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// The full command line, space separated.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Execute the command and wait for it to finish.
    pub fn run(&self) -> Result<CommandOutput> {
        info!("Running command: {}", self.command_line());

        let mut command = Command::new(&self.program);
        command.args(&self.args).stdin(Stdio::null());
        if let Some(dir) = &self.cwd {
            command.current_dir(dir);
        }
        if self.capture {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        }

        let output = match command.output() {
            Ok(output) => output,
            Err(source) => {
                error!("Failed to run {}: {}", self.program, source);
                return Err(Error::Spawn {
                    program: self.program.clone(),
                    source,
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            let detail = stderr.trim();
            match (&self.context, self.non_fatal) {
                (Some(message), true) => warn!("{}: {}", message, detail),
                (Some(message), false) => error!("{}: {}", message, detail),
                (None, true) => warn!("Command failed: {}\nError: {}", self, detail),
                (None, false) => error!("Command failed: {}\nError: {}", self, detail),
            }
            return Err(Error::CommandFailed {
                command: self.command_line(),
                code: output.status.code(),
                stderr: detail.to_string(),
            });
        }

        Ok(CommandOutput { stdout, stderr })
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}
