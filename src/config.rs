//! # Mirror Configuration and Run Settings
//!
//! The mirror configuration is a JSON object mapping each source repository
//! URL to an object that maps branch names to the build elements that must
//! exist on that branch:
//!
//! ```json
//! {
//!   "https://gitlab.com/freedesktop-sdk/freedesktop-sdk.git": {
//!     "master": ["bootstrap/bootstrap.bst", "components.bst"],
//!     "release/24.08": ["components.bst"]
//!   }
//! }
//! ```
//!
//! Repositories and branches are processed in the order they appear in the
//! file. A key repeated inside one object keeps its first position and takes
//! the value of its last occurrence.
//!
//! [`RunContext`] holds the settings that stay fixed for the whole run.

use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use log::info;
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};

use crate::error::{Error, Result};
use crate::generator::LorryFormat;

/// Directory, relative to the target toplevel, that receives git mirror files.
pub const DEFAULT_GIT_DIRECTORY: &str = "gits";

/// Directory, relative to the target toplevel, that receives raw-file mirrors.
pub const DEFAULT_RAW_FILES_DIRECTORY: &str = "files";

pub const DEFAULT_BASE_BRANCH: &str = "main";

pub const DEFAULT_MIRROR_CONFIG: &str = "mirrors.json";

/// Source aliases excluded from generation unless overridden.
pub const DEFAULT_EXCLUDE_ALIASES: [&str; 2] = ["fdsdk_git", "fdsdk_mirror"];

/// A JSON object decoded with its key order preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedMap<V>(Vec<(String, V)>);

impl<V> OrderedMap<V> {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn insert(&mut self, key: String, value: V) {
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<V> FromIterator<(String, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        let mut map = Self::default();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

struct OrderedMapVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
    type Value = OrderedMap<V>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
        let mut map = OrderedMap::default();
        while let Some((key, value)) = access.next_entry::<String, V>()? {
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

/// Branch name to the elements required on that branch.
pub type RepoConfig = OrderedMap<Vec<String>>;

/// Repository URL to its per-branch element lists.
pub type MirrorConfig = OrderedMap<RepoConfig>;

/// Parse a mirror configuration from a JSON string.
pub fn parse(content: &str) -> serde_json::Result<MirrorConfig> {
    serde_json::from_str(content)
}

/// Load the mirror configuration at `path`.
pub fn load_mirror_config(path: &Path) -> Result<MirrorConfig> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse(&content).map_err(|source| Error::ConfigParse {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Loaded mirror configuration from {}", path.display());
    Ok(config)
}

/// Settings shared by every stage of one run.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Branch of the target repository that automation branches fork from.
    pub base_branch: String,
    /// Working tree root of the target repository.
    pub toplevel: PathBuf,
    /// Absolute directory for generated git mirror files.
    pub git_dir: PathBuf,
    /// Absolute directory for generated raw-file mirror files.
    pub raw_files_dir: PathBuf,
    pub exclude_aliases: Vec<String>,
    pub format: LorryFormat,
    pub push: bool,
    pub create_review: bool,
}

impl RunContext {
    /// A context rooted at `toplevel` with the standard output directories.
    pub fn new(toplevel: impl Into<PathBuf>, base_branch: impl Into<String>) -> Self {
        let toplevel = toplevel.into();
        Self {
            base_branch: base_branch.into(),
            git_dir: toplevel.join(DEFAULT_GIT_DIRECTORY),
            raw_files_dir: toplevel.join(DEFAULT_RAW_FILES_DIRECTORY),
            toplevel,
            exclude_aliases: DEFAULT_EXCLUDE_ALIASES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            format: LorryFormat::default(),
            push: false,
            create_review: false,
        }
    }

    pub fn with_exclude_aliases(mut self, aliases: Vec<String>) -> Self {
        self.exclude_aliases = aliases;
        self
    }

    pub fn with_format(mut self, format: LorryFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_publishing(mut self, push: bool, create_review: bool) -> Self {
        self.push = push;
        self.create_review = create_review;
        self
    }
}
