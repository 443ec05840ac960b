//! Publishing a committed automation branch: push it, then optionally open a
//! merge request and prune stale automation branches on the platform.

use std::path::Path;

use log::{error, info, warn};

use crate::error::{Error, Result};
use crate::git::{GitOperations, DEFAULT_COMMIT_MESSAGE, DEFAULT_REMOTE};
use crate::review::{cleanup_branches, ReviewError, ReviewPlatform, ReviewRequest};

/// Open a merge request from `branch` into `base`, then clean up.
///
/// Cleanup is best effort: its failures are logged as warnings.
pub fn open_review(
    platform: &dyn ReviewPlatform,
    branch: &str,
    base: &str,
) -> std::result::Result<ReviewRequest, ReviewError> {
    let review = platform.create_review(branch, base, DEFAULT_COMMIT_MESSAGE)?;
    info!("Merge request created: {}", review.web_url);

    if let Err(e) = cleanup_branches(platform) {
        warn!("Failed to clean up automation branches: {}", e);
    }
    Ok(review)
}

/// Push `branch` and, if asked, open a merge request for it.
///
/// `connect` is only called when a merge request is wanted, so a run that
/// only pushes never needs CI credentials.
pub fn push_and_maybe_open_review<F>(
    git: &dyn GitOperations,
    toplevel: &Path,
    branch: &str,
    base: &str,
    should_push: bool,
    should_open_review: bool,
    connect: F,
) -> Result<()>
where
    F: FnOnce() -> std::result::Result<Box<dyn ReviewPlatform>, ReviewError>,
{
    if !should_push {
        return Ok(());
    }

    if !git.push(toplevel, branch, DEFAULT_REMOTE) {
        return Err(Error::Push {
            branch: branch.to_string(),
        });
    }

    if !should_open_review {
        return Ok(());
    }

    let platform = connect().map_err(|e| {
        error!("{}", e);
        Error::Review {
            branch: branch.to_string(),
        }
    })?;

    open_review(platform.as_ref(), branch, base).map_err(|e| {
        error!("Failed to create merge request: {}", e);
        Error::Review {
            branch: branch.to_string(),
        }
    })?;
    Ok(())
}
