//! # Version-Control Adapter
//!
//! Thin wrappers around the system `git` command. Every invocation has the
//! form `git -c credential.interactive=false -C <path> <args>`, so a missing
//! credential never blocks the run on a prompt, and every operation names
//! the checkout it works on explicitly.
//!
//! The operations are exposed through the [`GitOperations`] trait so the
//! orchestration layers can be exercised against a scripted stand-in. The
//! production implementation is [`DefaultGitOperations`].
//!
//! Failures are logged once by the shell executor and reported to callers as
//! `false` or `None`. Nothing in this module returns an error or panics for a
//! failed git command.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use log::{error, info};
use regex::Regex;

use crate::clone::WorkingClone;
use crate::shell::ShellCommand;

/// Configuration passed to every git invocation.
pub const CREDENTIAL_CONFIG: &str = "credential.interactive=false";

/// Commit message and merge request title used for automated updates.
pub const DEFAULT_COMMIT_MESSAGE: &str = "(Automated) Update mirrors";

pub const DEFAULT_REMOTE: &str = "origin";

/// Pattern matched by every automation branch name.
pub const AUTOMATION_BRANCH_PATTERN: &str = r"^update-mirrors/([^/]+)/(\d+)$";

static AUTOMATION_BRANCH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(AUTOMATION_BRANCH_PATTERN).expect("automation branch pattern is a valid regex")
});

/// Name of the automation branch forked from `base` at time `at`.
///
/// The timestamp is UTC, formatted `YYYYMMDDHHMMSS`.
pub fn automation_branch_name(base: &str, at: DateTime<Utc>) -> String {
    format!("update-mirrors/{}/{}", base, at.format("%Y%m%d%H%M%S"))
}

/// Whether `name` looks like a branch created by [`automation_branch_name`].
pub fn is_automation_branch(name: &str) -> bool {
    AUTOMATION_BRANCH_RE.is_match(name)
}

/// The base git invocation for a checkout at `path`.
fn git(path: &Path) -> ShellCommand {
    ShellCommand::new("git")
        .args(["-c", CREDENTIAL_CONFIG, "-C"])
        .arg(path.to_string_lossy())
}

/// Trait for git operations - allows mocking in tests
pub trait GitOperations {
    /// Whether `path` is inside a git working tree.
    fn is_repo(&self, path: &Path) -> bool;

    /// Whether the checkout at `path` has pending changes, optionally limited
    /// to `subdir`. A status that cannot be queried counts as dirty.
    fn is_dirty(&self, path: &Path, subdir: Option<&Path>) -> bool;

    /// Absolute path of the working tree root containing `path`.
    fn toplevel(&self, path: &Path) -> Option<PathBuf>;

    /// Clone `url` into a fresh temporary directory.
    ///
    /// On failure the temporary directory is already gone and `None` is
    /// returned.
    fn clone_repo(&self, url: &str) -> Option<WorkingClone>;

    fn checkout(&self, branch: &str, path: &Path) -> bool;

    /// Create and switch to a new automation branch forked from `base`.
    fn create_branch(&self, path: &Path, base: &str) -> Option<String>;

    fn add(&self, path: &Path, paths: &[&Path]) -> bool;

    fn commit(&self, path: &Path, message: &str) -> bool;

    /// Check out `branch`, then force-push it to `remote` with upstream
    /// tracking.
    fn push(&self, path: &Path, branch: &str, remote: &str) -> bool;

    /// Unstage everything, leaving the working tree untouched.
    fn reset_index(&self, path: &Path) -> bool;

    /// Force-delete a local branch.
    fn delete_branch(&self, path: &Path, branch: &str) -> bool;
}

/// The default implementation of `GitOperations`, which uses the system's
/// `git` command to perform real Git operations.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultGitOperations;

impl GitOperations for DefaultGitOperations {
    fn is_repo(&self, path: &Path) -> bool {
        git(path)
            .arg("rev-parse")
            .capture_output()
            .context("Not a git repository")
            .run()
            .is_ok()
    }

    fn is_dirty(&self, path: &Path, subdir: Option<&Path>) -> bool {
        let mut cmd = git(path).args(["status", "--porcelain"]);
        if let Some(subdir) = subdir {
            cmd = cmd.arg("--").arg(subdir.to_string_lossy());
        }
        match cmd
            .capture_output()
            .context("Failed to check git status")
            .run()
        {
            Ok(output) => !output.stdout.trim().is_empty(),
            Err(_) => true,
        }
    }

    fn toplevel(&self, path: &Path) -> Option<PathBuf> {
        let output = git(path)
            .args(["rev-parse", "--show-toplevel"])
            .capture_output()
            .context("Failed to determine git toplevel")
            .run()
            .ok()?;
        let toplevel = output.stdout.trim();
        if toplevel.is_empty() {
            return None;
        }
        info!("Found git toplevel: {}", toplevel);
        Some(PathBuf::from(toplevel))
    }

    fn clone_repo(&self, url: &str) -> Option<WorkingClone> {
        let clone = match WorkingClone::allocate(url) {
            Ok(clone) => clone,
            Err(e) => {
                error!("Failed to create a temporary directory for {}: {}", url, e);
                return None;
            }
        };

        git(Path::new("."))
            .arg("clone")
            .arg(url)
            .arg(clone.path().to_string_lossy())
            .capture_output()
            .context(format!("Failed to clone repository: {}", url))
            .run()
            .ok()?;

        info!("Cloned {} to {}", url, clone.path().display());
        Some(clone)
    }

    fn checkout(&self, branch: &str, path: &Path) -> bool {
        let ok = git(path)
            .args(["checkout", branch])
            .capture_output()
            .context(format!("Failed to checkout branch: {}", branch))
            .run()
            .is_ok();
        if ok {
            info!("Checked out {} in repo {}", branch, path.display());
        }
        ok
    }

    fn create_branch(&self, path: &Path, base: &str) -> Option<String> {
        let branch = automation_branch_name(base, Utc::now());
        git(path)
            .args(["checkout", "-b", branch.as_str(), base])
            .capture_output()
            .context(format!(
                "Failed to create branch {} from {}",
                branch, base
            ))
            .run()
            .ok()?;
        info!("Created branch {} from {}", branch, base);
        Some(branch)
    }

    fn add(&self, path: &Path, paths: &[&Path]) -> bool {
        git(path)
            .arg("add")
            .arg("--")
            .args(paths.iter().map(|p| p.to_string_lossy()))
            .capture_output()
            .context("Failed to add files to git")
            .run()
            .is_ok()
    }

    fn commit(&self, path: &Path, message: &str) -> bool {
        git(path)
            .args(["commit", "-m", message])
            .capture_output()
            .context("Failed to commit changes")
            .run()
            .is_ok()
    }

    fn push(&self, path: &Path, branch: &str, remote: &str) -> bool {
        if !self.checkout(branch, path) {
            return false;
        }
        let ok = git(path)
            .args(["push", "--set-upstream", "-f", remote, branch])
            .capture_output()
            .context(format!("Failed to push branch {} to {}", branch, remote))
            .run()
            .is_ok();
        if ok {
            info!("Pushed {} to {}", branch, remote);
        }
        ok
    }

    fn reset_index(&self, path: &Path) -> bool {
        git(path)
            .args(["reset", "-q"])
            .capture_output()
            .context("Failed to reset the index")
            .run()
            .is_ok()
    }

    fn delete_branch(&self, path: &Path, branch: &str) -> bool {
        git(path)
            .args(["branch", "-D", branch])
            .capture_output()
            .context(format!("Failed to delete branch {}", branch))
            .run()
            .is_ok()
    }
}
