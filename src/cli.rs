//! CLI argument parsing and dispatch to the updater

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::warn;

use lorry_mirror_updater::config::{
    DEFAULT_BASE_BRANCH, DEFAULT_EXCLUDE_ALIASES, DEFAULT_GIT_DIRECTORY, DEFAULT_MIRROR_CONFIG,
    DEFAULT_RAW_FILES_DIRECTORY,
};
use lorry_mirror_updater::generator::LorryFormat;
use lorry_mirror_updater::updater::{self, UpdateOptions};

/// Lorry mirror updater
///
/// A wrapper for bst-to-lorry to automate updating lorry files and sending
/// GitLab merge requests to the mirroring-config repository. This is expected
/// to be run from a clean checkout of the mirroring-config repository.
#[derive(Parser, Debug)]
#[command(name = "lorry-mirror-updater")]
#[command(version, about)]
pub struct Cli {
    /// Mirror config file
    #[arg(long, value_name = "FILE", default_value = DEFAULT_MIRROR_CONFIG)]
    mirror_config: PathBuf,

    /// Base branch of mirroring-config repository
    #[arg(long, value_name = "BRANCH", default_value = DEFAULT_BASE_BRANCH)]
    base_branch: String,

    /// Path to the Git directory for bst-to-lorry (always <toplevel>/gits)
    #[arg(long, value_name = "DIR", default_value = DEFAULT_GIT_DIRECTORY)]
    git_directory: PathBuf,

    /// Path to the raw files directory for bst-to-lorry (always <toplevel>/files)
    #[arg(long, value_name = "DIR", default_value = DEFAULT_RAW_FILES_DIRECTORY)]
    raw_files_directory: PathBuf,

    /// List of aliases to exclude in bst-to-lorry
    #[arg(long, value_name = "ALIAS", num_args = 0.., default_values = DEFAULT_EXCLUDE_ALIASES)]
    exclude_alias: Vec<String>,

    /// Push the branch to remote repository
    #[arg(long)]
    push: bool,

    /// Open a merge request for the pushed branch (requires --push)
    #[arg(long)]
    create_mr: bool,

    /// Use the legacy lorry format in bst-to-lorry (passes --refspecs)
    #[arg(long)]
    legacy_format: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "info",
        value_parser = ["error", "warn", "info", "debug", "trace"]
    )]
    log_level: String,
}

impl Cli {
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    fn options(&self) -> UpdateOptions {
        UpdateOptions {
            mirror_config: self.mirror_config.clone(),
            base_branch: self.base_branch.clone(),
            exclude_aliases: self.exclude_alias.clone(),
            format: if self.legacy_format {
                LorryFormat::Legacy
            } else {
                LorryFormat::Lorry2
            },
            push: self.push,
            create_review: self.create_mr,
        }
    }

    /// Execute one updater run from the current directory
    pub fn execute(self) -> Result<()> {
        if self.git_directory != Path::new(DEFAULT_GIT_DIRECTORY) {
            warn!(
                "--git-directory is ignored; git mirror files go to <toplevel>/{}",
                DEFAULT_GIT_DIRECTORY
            );
        }
        if self.raw_files_directory != Path::new(DEFAULT_RAW_FILES_DIRECTORY) {
            warn!(
                "--raw-files-directory is ignored; raw-file mirror files go to <toplevel>/{}",
                DEFAULT_RAW_FILES_DIRECTORY
            );
        }

        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        updater::run(&self.options(), &cwd)?;
        Ok(())
    }
}
