//! Commit gate: turns pending mirror changes into one commit on a fresh
//! automation branch.
//!
//! Either the branch exists with the staged mirror directories committed on
//! it, or nothing is left behind: a failed stage or commit resets the index,
//! returns to the base branch and deletes the half-made branch.

use std::path::Path;

use log::{error, warn};

use crate::git::{GitOperations, DEFAULT_COMMIT_MESSAGE};

/// Commit the pending changes under `git_dir` and `raw_files_dir`.
///
/// Returns the name of the new automation branch, or `None` if nothing could
/// be committed.
pub fn commit_changes(
    git: &dyn GitOperations,
    toplevel: &Path,
    git_dir: &Path,
    raw_files_dir: &Path,
    base_branch: &str,
) -> Option<String> {
    let pending: Vec<&Path> = [git_dir, raw_files_dir]
        .into_iter()
        .filter(|dir| git.is_dirty(toplevel, Some(*dir)))
        .collect();
    if pending.is_empty() {
        error!(
            "No changes to commit in {} or {}",
            git_dir.display(),
            raw_files_dir.display()
        );
        return None;
    }

    let branch = git.create_branch(toplevel, base_branch)?;

    if git.add(toplevel, &pending) && git.commit(toplevel, DEFAULT_COMMIT_MESSAGE) {
        return Some(branch);
    }

    roll_back(git, toplevel, base_branch, &branch);
    None
}

fn roll_back(git: &dyn GitOperations, toplevel: &Path, base_branch: &str, branch: &str) {
    let restored = git.reset_index(toplevel)
        && git.checkout(base_branch, toplevel)
        && git.delete_branch(toplevel, branch);
    if restored {
        warn!("Discarded branch {} after a failed commit", branch);
    } else {
        error!(
            "Failed to roll back branch {}; the target repository needs manual cleanup",
            branch
        );
    }
}
