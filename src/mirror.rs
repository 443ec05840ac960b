//! # Mirroring Orchestrator
//!
//! Drives the nested repository -> branch -> element pipeline:
//!
//! 1. **Repository**: clone the source repository into a scoped working
//!    clone and check out the base branch.
//! 2. **Branch**: check out each configured branch, verify that every
//!    required element exists, then run `bst-to-lorry` over all of them.
//! 3. **Run**: after every repository succeeded, commit the mirror
//!    directories if they changed.
//!
//! The first failure at any level aborts the whole run. No branch is
//! generated for a subset of its elements, no later branch or repository is
//! attempted after a failure, and nothing is committed unless everything
//! before it succeeded.

use std::path::Path;

use log::{error, info, warn};

use crate::commit::commit_changes;
use crate::config::{MirrorConfig, RepoConfig, RunContext};
use crate::element::ElementOperations;
use crate::generator::{GeneratorOperations, GeneratorRequest};
use crate::git::GitOperations;

/// Result of a complete mirroring run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorOutcome {
    /// A repository, branch or the commit step failed.
    Failed,
    /// Everything succeeded and the mirror directories are unchanged.
    NothingToCommit,
    /// Everything succeeded and the changes were committed on this branch.
    Committed(String),
}

impl MirrorOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, MirrorOutcome::Failed)
    }

    /// The automation branch holding the new commit, if one was made.
    pub fn branch(&self) -> Option<&str> {
        match self {
            MirrorOutcome::Committed(branch) => Some(branch),
            _ => None,
        }
    }
}

/// Runs the mirroring pipeline against a set of operation backends.
pub struct Mirrorer<'a> {
    git: &'a dyn GitOperations,
    elements: &'a dyn ElementOperations,
    generator: &'a dyn GeneratorOperations,
    ctx: &'a RunContext,
}

impl<'a> Mirrorer<'a> {
    pub fn new(
        git: &'a dyn GitOperations,
        elements: &'a dyn ElementOperations,
        generator: &'a dyn GeneratorOperations,
        ctx: &'a RunContext,
    ) -> Self {
        Self {
            git,
            elements,
            generator,
            ctx,
        }
    }

    /// Generate mirror files for one branch of a cloned repository.
    pub fn process_branch(
        &self,
        repo_url: &str,
        branch: &str,
        elements: &[String],
        checkout: &Path,
    ) -> bool {
        info!(
            "Processing branch: {} of repo {} with elements: {:?}",
            branch, repo_url, elements
        );

        if !self.git.checkout(branch, checkout) {
            return false;
        }

        let missing: Vec<&str> = elements
            .iter()
            .map(String::as_str)
            .filter(|element| !self.elements.element_exists(element, checkout))
            .collect();

        if !missing.is_empty() {
            error!(
                "Required elements not found in branch {} of repo {}: {:?}",
                branch, repo_url, missing
            );
            return false;
        }

        info!(
            "All required elements found in branch {}: {:?}",
            branch, elements
        );

        let request = GeneratorRequest {
            elements,
            git_dir: &self.ctx.git_dir,
            raw_files_dir: &self.ctx.raw_files_dir,
            exclude_aliases: &self.ctx.exclude_aliases,
            cwd: checkout,
            format: self.ctx.format,
        };
        if !self.generator.generate(&request) {
            error!(
                "bst-to-lorry failed for branch {} in repo {}",
                branch, repo_url
            );
            return false;
        }

        true
    }

    /// Clone one repository and process each of its branches in order.
    ///
    /// The working clone is removed before returning, whatever the outcome.
    pub fn process_repo(&self, repo_url: &str, repo_config: &RepoConfig) -> bool {
        let Some(clone) = self.git.clone_repo(repo_url) else {
            return false;
        };

        let ok = self.process_branches(repo_url, repo_config, clone.path());

        if let Err(e) = clone.release() {
            warn!("Failed to remove working clone of {}: {}", repo_url, e);
        }
        ok
    }

    fn process_branches(&self, repo_url: &str, repo_config: &RepoConfig, checkout: &Path) -> bool {
        if !self.git.checkout(&self.ctx.base_branch, checkout) {
            return false;
        }

        repo_config
            .iter()
            .all(|(branch, elements)| self.process_branch(repo_url, branch, elements, checkout))
    }

    /// Process every repository in order, then commit any resulting changes.
    pub fn process_mirroring(&self, config: &MirrorConfig) -> MirrorOutcome {
        for (repo_url, repo_config) in config.iter() {
            if !self.process_repo(repo_url, repo_config) {
                return MirrorOutcome::Failed;
            }
        }

        let ctx = self.ctx;
        if self.git.is_dirty(&ctx.toplevel, Some(&ctx.raw_files_dir))
            || self.git.is_dirty(&ctx.toplevel, Some(&ctx.git_dir))
        {
            return match commit_changes(
                self.git,
                &ctx.toplevel,
                &ctx.git_dir,
                &ctx.raw_files_dir,
                &ctx.base_branch,
            ) {
                Some(branch) => MirrorOutcome::Committed(branch),
                None => MirrorOutcome::Failed,
            };
        }

        warn!("Nothing to commit");
        MirrorOutcome::NothingToCommit
    }
}
