//! Shared test utilities for E2E tests.
//!
//! [`TestFixture`] lays out a scratch world for one run of the binary:
//!
//! ```text
//! <tmp>/
//!   target/        clean git checkout the updater runs in
//!   source/        source repository listed in the mirror configuration
//!   remote.git/    optional bare remote for --push
//!   bin/           stub `bst` and `bst-to-lorry`, first on PATH
//!   mirrors.json   mirror configuration (outside the target so it stays clean)
//!   generator.log  one line per stub `bst-to-lorry` invocation
//! ```
//!
//! The stub `bst` reports an element as present when `elements/<name>` exists
//! in the checked out source branch. The generating stub `bst-to-lorry` writes
//! one `<element>.lorry` file per element into `--git-directory`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new()
//!         .with_source_branch("main", &["elemA.bst"])
//!         .with_config(&[("main", &["elemA.bst"])]);
//!     fixture.command().assert().success();
//! }
//! ```

#![allow(dead_code)]

use assert_fs::prelude::*;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    pub use predicates::prelude::*;

    pub use super::{git, Generator, TestFixture};
}

/// Stub `bst`: succeed when the last argument names a file under `elements/`.
const BST_STUB: &str = r#"#!/bin/sh
for last; do :; done
test -f "elements/$last"
"#;

/// Behaviour of the stub `bst-to-lorry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generator {
    /// Write one lorry file per element into the git directory.
    Writes,
    /// Succeed without writing anything.
    NoOp,
    /// Exit 1.
    Fails,
}

impl Generator {
    fn script(self, log: &Path) -> String {
        let body = match self {
            Generator::Writes => {
                r#"git_dir=""
elements=""
while [ $# -gt 0 ]; do
  case "$1" in
    --git-directory) git_dir="$2"; shift 2 ;;
    --raw-files-directory|--exclude-alias) shift 2 ;;
    --refspecs) shift ;;
    *) elements="$elements $1"; shift ;;
  esac
done
mkdir -p "$git_dir"
for element in $elements; do
  name=$(basename "$element" .bst)
  printf '%s:\n  type: git\n  url: https://example.org/%s.git\n' "$name" "$name" > "$git_dir/$name.lorry"
done
"#
            }
            Generator::NoOp => "exit 0\n",
            Generator::Fails => "echo 'bst-to-lorry: element failed to load' >&2\nexit 1\n",
        };
        format!(
            "#!/bin/sh\necho \"$*\" >> '{}'\n{}",
            log.display(),
            body
        )
    }
}

/// Run `git` in `dir`, panicking on failure, and return its stdout.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .current_dir(dir)
        .args(args)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn init_repo(dir: &Path) {
    fs::create_dir_all(dir).expect("Failed to create repository directory");
    git(dir, &["init", "-q"]);
    git(dir, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    git(dir, &["config", "user.name", "Mirror Bot"]);
    git(dir, &["config", "user.email", "mirror-bot@example.com"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
    fs::write(dir.join("README.md"), "# test repository\n").expect("Failed to write README");
    git(dir, &["add", "README.md"]);
    git(dir, &["commit", "-q", "-m", "Initial commit"]);
}

fn install(path: &Path, script: &str) {
    fs::write(path, script).expect("Failed to write stub");
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("Failed to chmod stub");
}

/// A scratch target repository, source repository and stub toolchain.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create the target and source repositories and the generating stubs.
    pub fn new() -> Self {
        let fixture = Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        };
        init_repo(&fixture.target());
        init_repo(&fixture.source());
        fs::create_dir_all(fixture.bin()).expect("Failed to create bin directory");
        install(&fixture.bin().join("bst"), BST_STUB);
        fixture.with_generator(Generator::Writes)
    }

    /// Replace the stub `bst-to-lorry`.
    pub fn with_generator(self, generator: Generator) -> Self {
        install(
            &self.bin().join("bst-to-lorry"),
            &generator.script(&self.generator_log()),
        );
        self
    }

    /// Remove a stub tool from `bin/`.
    pub fn without_tool(self, name: &str) -> Self {
        fs::remove_file(self.bin().join(name)).expect("Failed to remove stub");
        self
    }

    /// Commit `elements/<name>` files on `branch` of the source repository.
    pub fn with_source_branch(self, branch: &str, elements: &[&str]) -> Self {
        let source = self.source();
        if branch != "main" {
            git(&source, &["checkout", "-q", "-B", branch, "main"]);
        }
        fs::create_dir_all(source.join("elements")).expect("Failed to create elements");
        for element in elements {
            fs::write(source.join("elements").join(element), "kind: manual\n")
                .expect("Failed to write element");
        }
        git(&source, &["add", "-A"]);
        git(&source, &["commit", "-q", "--allow-empty", "-m", "Add elements"]);
        git(&source, &["checkout", "-q", "main"]);
        self
    }

    /// Write a mirror configuration listing the source repository once,
    /// with `branches` in the given order.
    pub fn with_config(self, branches: &[(&str, &[&str])]) -> Self {
        let entries: Vec<String> = branches
            .iter()
            .map(|(branch, elements)| {
                format!(
                    "{}: {}",
                    serde_json::to_string(branch).unwrap(),
                    serde_json::to_string(elements).unwrap()
                )
            })
            .collect();
        let config = format!(
            "{{{}: {{{}}}}}",
            serde_json::to_string(&self.source_url()).unwrap(),
            entries.join(", ")
        );
        self.with_raw_config(&config)
    }

    /// Write `content` verbatim as the mirror configuration.
    pub fn with_raw_config(self, content: &str) -> Self {
        self.temp_dir
            .child("mirrors.json")
            .write_str(content)
            .expect("Failed to write config file");
        self
    }

    /// Add a bare `origin` remote to the target repository.
    pub fn with_remote(self) -> Self {
        let remote = self.remote().to_string_lossy().into_owned();
        git(self.path(), &["init", "-q", "--bare", remote.as_str()]);
        git(&self.target(), &["remote", "add", "origin", remote.as_str()]);
        self
    }

    /// Add a file to the target working tree without committing it.
    pub fn with_target_file(self, path: &str, content: &str) -> Self {
        fs::write(self.target().join(path), content).expect("Failed to write file");
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn target(&self) -> PathBuf {
        self.path().join("target")
    }

    pub fn source(&self) -> PathBuf {
        self.path().join("source")
    }

    pub fn source_url(&self) -> String {
        self.source().to_string_lossy().into_owned()
    }

    pub fn remote(&self) -> PathBuf {
        self.path().join("remote.git")
    }

    pub fn bin(&self) -> PathBuf {
        self.path().join("bin")
    }

    /// Get the path to the config file.
    pub fn config_path(&self) -> PathBuf {
        self.path().join("mirrors.json")
    }

    pub fn generator_log(&self) -> PathBuf {
        self.path().join("generator.log")
    }

    /// Every recorded `bst-to-lorry` argument line, in call order.
    pub fn generator_calls(&self) -> Vec<String> {
        fs::read_to_string(self.generator_log())
            .map(|log| log.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Local branches of the target matching `update-mirrors/*`.
    pub fn automation_branches(&self) -> Vec<String> {
        list_branches(
            &self.target(),
            &["branch", "--format=%(refname:short)", "--list", "update-mirrors/*"],
        )
    }

    /// Branches of the bare remote matching `update-mirrors/*`.
    pub fn remote_automation_branches(&self) -> Vec<String> {
        list_branches(
            &self.remote(),
            &["branch", "--format=%(refname:short)", "--list", "update-mirrors/*"],
        )
    }

    fn search_path(&self) -> OsString {
        let mut dirs = vec![self.bin()];
        if let Some(path) = env::var_os("PATH") {
            dirs.extend(env::split_paths(&path));
        }
        env::join_paths(dirs).expect("Failed to build PATH")
    }

    /// Create a command running in the target with the stubs on `PATH`.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("lorry-mirror-updater");
        cmd.current_dir(self.target())
            .env("PATH", self.search_path())
            .env_remove("RUST_LOG")
            .env_remove("GITLAB_API_KEY")
            .env_remove("FREEDESKTOP_API_TOKEN")
            .env_remove("CI_PROJECT_ID")
            .env_remove("CI_SERVER_URL")
            .arg("--mirror-config")
            .arg(self.config_path());
        cmd
    }
}

fn list_branches(dir: &Path, args: &[&str]) -> Vec<String> {
    git(dir, args)
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
