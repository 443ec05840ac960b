//! Invocation of `bst-to-lorry`, the external mirror-file generator.
//!
//! The generator is told which elements to inspect, where to write git
//! mirror definitions and raw-file mirror definitions, and which source
//! aliases to leave out. Its exit status is the only thing acted on.

use std::path::Path;

use crate::shell::ShellCommand;

/// Output format requested from `bst-to-lorry`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LorryFormat {
    /// Lorry2 files, the generator's default. Adds no flag.
    #[default]
    Lorry2,
    /// Classic lorry files, selected with `--refspecs`.
    Legacy,
}

/// Everything `bst-to-lorry` needs for one branch of one repository.
#[derive(Debug, Clone, Copy)]
pub struct GeneratorRequest<'a> {
    pub elements: &'a [String],
    pub git_dir: &'a Path,
    pub raw_files_dir: &'a Path,
    pub exclude_aliases: &'a [String],
    pub cwd: &'a Path,
    pub format: LorryFormat,
}

/// Trait for mirror generation - allows mocking in tests
pub trait GeneratorOperations {
    /// Run the generator; `false` if it exited unsuccessfully.
    fn generate(&self, request: &GeneratorRequest<'_>) -> bool;
}

/// Runs the real `bst-to-lorry` binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultGeneratorOperations;

/// Build the `bst-to-lorry` command line for `request`.
pub fn generator_command(request: &GeneratorRequest<'_>) -> ShellCommand {
    let mut cmd = ShellCommand::new("bst-to-lorry")
        .args(request.elements.iter().cloned())
        .arg("--git-directory")
        .arg(request.git_dir.to_string_lossy())
        .arg("--raw-files-directory")
        .arg(request.raw_files_dir.to_string_lossy());

    if request.format == LorryFormat::Legacy {
        cmd = cmd.arg("--refspecs");
    }

    for alias in request.exclude_aliases {
        cmd = cmd.arg("--exclude-alias").arg(alias.as_str());
    }

    cmd.current_dir(request.cwd)
}

impl GeneratorOperations for DefaultGeneratorOperations {
    fn generate(&self, request: &GeneratorRequest<'_>) -> bool {
        generator_command(request)
            .capture_output()
            .context("bst-to-lorry failed")
            .run()
            .is_ok()
    }
}
