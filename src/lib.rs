//! # Lorry Mirror Updater Library
//!
//! This library refreshes the lorry mirror definitions kept in a
//! mirroring-config repository. It is designed to be used by the
//! `lorry-mirror-updater` command-line tool, which runs it from a clean
//! checkout of that repository (the *target*), usually in a CI pipeline.
//!
//! ## Quick Example
//!
//! ```
//! use lorry_mirror_updater::config;
//! use lorry_mirror_updater::git::{automation_branch_name, is_automation_branch};
//! use chrono::{TimeZone, Utc};
//!
//! let mirrors = config::parse(r#"{
//!     "https://gitlab.com/freedesktop-sdk/freedesktop-sdk.git": {
//!         "master": ["components.bst"],
//!         "release/24.08": ["components.bst"]
//!     }
//! }"#).unwrap();
//! assert_eq!(mirrors.len(), 1);
//!
//! let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
//! let branch = automation_branch_name("main", at);
//! assert_eq!(branch, "update-mirrors/main/20240102030405");
//! assert!(is_automation_branch(&branch));
//! ```
//!
//! ## Core Concepts
//!
//! - **Configuration (`config`)**: The JSON mirror configuration mapping each
//!   source repository URL to its branches and the build elements required on
//!   them, plus the settings fixed for one run.
//! - **External commands (`shell`, `git`, `element`, `generator`)**: Thin,
//!   logged wrappers around `git`, `bst` and `bst-to-lorry`, each behind a
//!   trait so the pipeline can be driven by mocks in tests.
//! - **Working clones (`clone`)**: Temporary checkouts of source repositories
//!   that are removed once a repository has been processed.
//! - **Mirroring (`mirror`, `commit`)**: The repository -> branch -> element
//!   pipeline and the gate that turns its output into a single commit on a
//!   fresh `update-mirrors/<base>/<timestamp>` branch.
//! - **Publishing (`publish`, `review`)**: Pushing that branch, opening a
//!   GitLab merge request and pruning stale automation branches.
//!
//! ## Execution Flow
//!
//! The main entry point is [`updater::run`], which executes the following
//! steps:
//!
//! 1.  **Preflight**: Check that `git`, `bst` and `bst-to-lorry` are on `PATH`
//!     and that the target checkout is clean.
//! 2.  **Configuration**: Load the mirror configuration.
//! 3.  **Mirroring**: For each repository, clone it, then for each branch check
//!     the required elements exist and run `bst-to-lorry` over them. The first
//!     failure aborts the run.
//! 4.  **Commit**: If the mirror directories changed, commit them on a new
//!     automation branch.
//! 5.  **Publish**: Optionally push the branch and open a merge request.

pub mod clone;
pub mod commit;
pub mod config;
pub mod element;
pub mod error;
pub mod generator;
pub mod git;
pub mod mirror;
pub mod preflight;
pub mod publish;
pub mod review;
pub mod shell;
pub mod updater;


#[cfg(test)]
mod naming_proptest;
