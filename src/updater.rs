//! # Run Driver
//!
//! Ties the stages of one updater run together:
//!
//! 1. Reject option combinations that cannot work, including a merge request
//!    from a build without a review client.
//! 2. Validate the environment (tools on `PATH`, clean checkout).
//! 3. Load the mirror configuration.
//! 4. Resolve the target repository's toplevel and output directories.
//! 5. Run the mirroring pipeline.
//! 6. Push the new automation branch and open a merge request when asked.
//!
//! Every stage that fails returns an [`Error`]; the binary reports it and exits
//! with a non-zero status. A run that finds nothing to commit succeeds.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::{
    load_mirror_config, RunContext, DEFAULT_BASE_BRANCH, DEFAULT_EXCLUDE_ALIASES,
    DEFAULT_MIRROR_CONFIG,
};
use crate::element::{DefaultElementOperations, ElementOperations};
use crate::error::{Error, Result};
use crate::generator::{DefaultGeneratorOperations, GeneratorOperations, LorryFormat};
use crate::git::{DefaultGitOperations, GitOperations};
use crate::mirror::{MirrorOutcome, Mirrorer};
use crate::preflight::validate_environment_with;
use crate::publish::push_and_maybe_open_review;
use crate::review::{self, ReviewError, ReviewPlatform, ReviewSettings};

/// What the user asked one run to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Mirror configuration file, relative to the working directory.
    pub mirror_config: PathBuf,
    pub base_branch: String,
    pub exclude_aliases: Vec<String>,
    pub format: LorryFormat,
    pub push: bool,
    pub create_review: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            mirror_config: PathBuf::from(DEFAULT_MIRROR_CONFIG),
            base_branch: DEFAULT_BASE_BRANCH.to_string(),
            exclude_aliases: DEFAULT_EXCLUDE_ALIASES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            format: LorryFormat::default(),
            push: false,
            create_review: false,
        }
    }
}

/// Runs the updater against a set of operation backends.
pub struct Updater<'a> {
    git: &'a dyn GitOperations,
    elements: &'a dyn ElementOperations,
    generator: &'a dyn GeneratorOperations,
    search_path: Option<OsString>,
    review_available: bool,
}

impl<'a> Updater<'a> {
    /// An updater that looks tools up on the process `PATH`.
    pub fn new(
        git: &'a dyn GitOperations,
        elements: &'a dyn ElementOperations,
        generator: &'a dyn GeneratorOperations,
    ) -> Self {
        Self {
            git,
            elements,
            generator,
            search_path: std::env::var_os("PATH"),
            review_available: review::is_available(),
        }
    }

    /// Look tools up in `search_path` instead of the process `PATH`.
    pub fn with_search_path(mut self, search_path: Option<OsString>) -> Self {
        self.search_path = search_path;
        self
    }

    /// Override whether a review platform client can be built.
    pub fn with_review_available(mut self, available: bool) -> Self {
        self.review_available = available;
        self
    }

    /// Run once from the checkout at `cwd`.
    ///
    /// `connect` builds the review platform client and is only called when a
    /// merge request is opened.
    pub fn run<F>(&self, options: &UpdateOptions, cwd: &Path, connect: F) -> Result<MirrorOutcome>
    where
        F: FnOnce() -> std::result::Result<Box<dyn ReviewPlatform>, ReviewError>,
    {
        if options.create_review && !options.push {
            return Err(Error::InvalidOptions {
                message: "--create-mr requires --push".to_string(),
            });
        }

        if options.create_review && !self.review_available {
            return Err(Error::InvalidOptions {
                message: format!("--create-mr is unavailable: {}", ReviewError::Unavailable),
            });
        }

        validate_environment_with(self.git, cwd, self.search_path.as_deref())?;

        let config = load_mirror_config(&cwd.join(&options.mirror_config))?;

        let toplevel = self.git.toplevel(cwd).ok_or(Error::Toplevel)?;

        let ctx = RunContext::new(toplevel, options.base_branch.as_str())
            .with_exclude_aliases(options.exclude_aliases.clone())
            .with_format(options.format)
            .with_publishing(options.push, options.create_review);

        let outcome =
            Mirrorer::new(self.git, self.elements, self.generator, &ctx).process_mirroring(&config);

        match &outcome {
            MirrorOutcome::Failed => return Err(Error::Mirroring),
            MirrorOutcome::NothingToCommit => {}
            MirrorOutcome::Committed(branch) => push_and_maybe_open_review(
                self.git,
                &ctx.toplevel,
                branch,
                &ctx.base_branch,
                ctx.push,
                ctx.create_review,
                connect,
            )?,
        }

        Ok(outcome)
    }
}

/// Run once from `cwd` with the real `git`, `bst` and `bst-to-lorry`, reading
/// review settings from the environment.
pub fn run(options: &UpdateOptions, cwd: &Path) -> Result<MirrorOutcome> {
    Updater::new(
        &DefaultGitOperations,
        &DefaultElementOperations,
        &DefaultGeneratorOperations,
    )
    .run(options, cwd, || {
        ReviewSettings::from_env().and_then(|settings| review::connect(&settings))
    })
}
