//! # Review Requests
//!
//! Opening a merge request for a pushed automation branch and pruning stale
//! automation branches from the hosting platform.
//!
//! The platform is reached through the [`ReviewPlatform`] trait so the
//! publish step can be tested without a server. The GitLab REST client lives
//! in [`gitlab`] and is only compiled with the `gitlab` cargo feature; when it
//! is missing, [`connect`] reports [`ReviewError::Unavailable`].
//!
//! Connection settings come from the CI environment:
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `GITLAB_API_KEY` | API token (falls back to `FREEDESKTOP_API_TOKEN`) |
//! | `CI_PROJECT_ID` | Project that receives the merge request |
//! | `CI_SERVER_URL` | Base URL of the GitLab instance |

#[cfg(feature = "gitlab")]
pub mod gitlab;

use std::collections::HashSet;

use log::{info, warn};
use thiserror::Error;

use crate::git::{is_automation_branch, AUTOMATION_BRANCH_PATTERN};

pub const TOKEN_VARIABLE: &str = "GITLAB_API_KEY";
pub const FALLBACK_TOKEN_VARIABLE: &str = "FREEDESKTOP_API_TOKEN";
pub const PROJECT_ID_VARIABLE: &str = "CI_PROJECT_ID";
pub const SERVER_URL_VARIABLE: &str = "CI_SERVER_URL";

/// Errors from review platform operations.
#[derive(Error, Debug)]
pub enum ReviewError {
    /// Neither token variable is set.
    #[error("GITLAB_API_KEY is not defined")]
    MissingToken,

    /// The project id or server URL is missing.
    #[error("CI_PROJECT_ID or CI_SERVER_URL is not defined. Likely running outside of GitLab pipeline")]
    MissingCiContext,

    /// `CI_SERVER_URL` cannot be used as an API base.
    #[error("invalid server URL {url}: {message}")]
    InvalidServerUrl { url: String, message: String },

    /// Network or connection error.
    #[error("network error: {0}")]
    Network(String),

    /// The API answered with an error status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// This build carries no review platform client.
    #[error("merge request support is not available in this build")]
    Unavailable,
}

/// A merge request as reported by the platform after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRequest {
    pub iid: u64,
    pub web_url: String,
    pub source_branch: String,
    pub target_branch: String,
}

/// Operations the publish step needs from a code hosting platform.
pub trait ReviewPlatform {
    /// Open a merge request from `source` into `target`.
    fn create_review(
        &self,
        source: &str,
        target: &str,
        title: &str,
    ) -> Result<ReviewRequest, ReviewError>;

    /// Names of the remote branches matching `regex`.
    fn list_branches(&self, regex: &str) -> Result<Vec<String>, ReviewError>;

    /// Source branches of every open merge request.
    fn open_review_branches(&self) -> Result<Vec<String>, ReviewError>;

    /// Ask the platform to delete every branch already merged into the default branch.
    fn delete_merged_branches(&self) -> Result<(), ReviewError>;

    fn delete_branch(&self, name: &str) -> Result<(), ReviewError>;
}

/// Where and as whom to talk to the platform.
#[derive(Clone, PartialEq, Eq)]
pub struct ReviewSettings {
    pub server_url: String,
    pub project_id: String,
    pub token: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for ReviewSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewSettings")
            .field("server_url", &self.server_url)
            .field("project_id", &self.project_id)
            .field("has_token", &!self.token.is_empty())
            .finish()
    }
}

impl ReviewSettings {
    /// Read the settings from the process environment.
    pub fn from_env() -> Result<Self, ReviewError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the settings through `lookup`, treating empty values as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ReviewError> {
        let get = |name: &str| lookup(name).filter(|value| !value.is_empty());

        let token = get(TOKEN_VARIABLE)
            .or_else(|| get(FALLBACK_TOKEN_VARIABLE))
            .ok_or(ReviewError::MissingToken)?;

        match (get(PROJECT_ID_VARIABLE), get(SERVER_URL_VARIABLE)) {
            (Some(project_id), Some(server_url)) => Ok(Self {
                server_url,
                project_id,
                token,
            }),
            _ => Err(ReviewError::MissingCiContext),
        }
    }
}

/// Whether this build carries a review platform client.
pub fn is_available() -> bool {
    cfg!(feature = "gitlab")
}

/// Build the platform client for `settings`.
#[cfg(feature = "gitlab")]
pub fn connect(settings: &ReviewSettings) -> Result<Box<dyn ReviewPlatform>, ReviewError> {
    Ok(Box::new(gitlab::GitLabClient::new(settings)?))
}

/// Build the platform client for `settings`.
#[cfg(not(feature = "gitlab"))]
pub fn connect(_settings: &ReviewSettings) -> Result<Box<dyn ReviewPlatform>, ReviewError> {
    Err(ReviewError::Unavailable)
}

/// Delete automation branches that no open merge request still needs.
///
/// Branches are listed by the automation pattern; the source branches of open
/// merge requests are kept, merged branches are left to the platform, and
/// every remaining branch is deleted. A failed single deletion is logged and
/// skipped. Returns the branches actually deleted.
pub fn cleanup_branches(platform: &dyn ReviewPlatform) -> Result<Vec<String>, ReviewError> {
    let branches = platform.list_branches(AUTOMATION_BRANCH_PATTERN)?;
    let in_review: HashSet<String> = platform
        .open_review_branches()?
        .into_iter()
        .filter(|branch| is_automation_branch(branch))
        .collect();

    platform.delete_merged_branches()?;

    let mut seen = HashSet::new();
    let mut deleted = Vec::new();
    for branch in branches {
        if !is_automation_branch(&branch)
            || in_review.contains(&branch)
            || !seen.insert(branch.clone())
        {
            continue;
        }
        info!("Deleting branch: {}", branch);
        match platform.delete_branch(&branch) {
            Ok(()) => deleted.push(branch),
            Err(e) => warn!("Failed to delete branch {}: {}", branch, e),
        }
    }
    Ok(deleted)
}
