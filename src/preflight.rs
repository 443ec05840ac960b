//! Environment validation run before anything else touches the disk.
//!
//! The updater needs `git`, `bst` and `bst-to-lorry` on `PATH`, and must be
//! started from a clean checkout of the target repository.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::git::GitOperations;

/// External programs every run shells out to.
pub const REQUIRED_TOOLS: [&str; 3] = ["git", "bst", "bst-to-lorry"];

/// Locate an executable called `binary` in the directories of `path_var`.
pub fn find_in(binary: &str, path_var: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(path_var)
        .map(|segment| segment.join(binary))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

fn fail(message: impl Into<String>) -> Error {
    Error::Environment {
        message: message.into(),
    }
}

/// Check tools against the search path `path_var` and the checkout at `cwd`.
///
/// Stops at the first failing check.
pub fn validate_environment_with(
    git: &dyn GitOperations,
    cwd: &Path,
    path_var: Option<&OsStr>,
) -> Result<()> {
    for tool in REQUIRED_TOOLS {
        if path_var.and_then(|p| find_in(tool, p)).is_none() {
            return Err(fail(format!("Unable to find {} in PATH", tool)));
        }
    }

    if !git.is_repo(cwd) {
        return Err(fail("Current directory is not a git repository"));
    }

    if git.is_dirty(cwd, None) {
        return Err(fail("Current repository checkout is dirty"));
    }

    Ok(())
}
