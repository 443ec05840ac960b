//! Scoped working clones of source repositories.
//!
//! A [`WorkingClone`] owns a fresh temporary directory and the checkout path
//! inside it (`<tmp>/<repo-name>`). Callers release it explicitly with
//! [`WorkingClone::release`] once a repository has been processed; dropping
//! the handle on any other exit path removes the directory as well.

use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};
use tempfile::TempDir;

/// Derive the checkout directory name from a repository URL.
///
/// Takes the final `/` separated segment and removes the `.git` suffix, so
/// `https://gitlab.com/freedesktop-sdk/freedesktop-sdk.git` becomes
/// `freedesktop-sdk`.
pub fn repo_name_from_url(url: &str) -> String {
    let last = url.trim_end_matches('/').rsplit('/').next().unwrap_or(url);
    let name = last.strip_suffix(".git").unwrap_or(last);
    if matches!(name, "" | "." | "..") {
        "repo".to_string()
    } else {
        name.to_string()
    }
}

/// An ephemeral checkout of one source repository.
#[derive(Debug)]
pub struct WorkingClone {
    url: String,
    path: PathBuf,
    dir: Option<TempDir>,
}

impl WorkingClone {
    /// Reserve a temporary directory for cloning `url`.
    ///
    /// Nothing is cloned yet; [`path`](Self::path) does not exist until the
    /// version-control adapter clones into it.
    pub fn allocate(url: &str) -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("lorry-mirror-updater-")
            .tempdir()?;
        let path = dir.path().join(repo_name_from_url(url));
        Ok(Self {
            url: url.to_string(),
            path,
            dir: Some(dir),
        })
    }

    /// Path of the checkout.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Remove the clone from disk.
    pub fn release(mut self) -> io::Result<()> {
        match self.dir.take() {
            Some(dir) => {
                let root = dir.path().to_path_buf();
                dir.close()?;
                info!("Removed working clone {}", root.display());
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Drop for WorkingClone {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let root = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warn!("Failed to remove working clone {}: {}", root.display(), e);
            }
        }
    }
}
