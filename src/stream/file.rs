//! Record files: a header plus a set of named trees.

use crate::stream::tree::Tree;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Producer string written into every file header.
pub const PRODUCER: &str = concat!("eventsel ", env!("CARGO_PKG_VERSION"));

/// Metadata stored alongside the trees of a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileHeader {
    pub producer: String,
    pub created: DateTime<Utc>,
}

impl Default for FileHeader {
    fn default() -> Self {
        Self {
            producer: PRODUCER.to_string(),
            created: Utc::now(),
        }
    }
}

/// A record file holding any number of trees, keyed by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordFile {
    #[serde(default)]
    pub header: FileHeader,
    trees: BTreeMap<String, Tree>,
}

impl RecordFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// A file containing a single tree.
    pub fn with_tree(tree: Tree) -> Self {
        let mut file = Self::new();
        file.insert(tree);
        file
    }

    /// Insert `tree`, replacing any tree of the same name.
    pub fn insert(&mut self, tree: Tree) -> Option<Tree> {
        self.trees.insert(tree.name().to_string(), tree)
    }

    pub fn tree(&self, name: &str) -> Option<&Tree> {
        self.trees.get(name)
    }

    /// Remove and return the tree called `name`, ready for reading.
    pub fn take_tree(&mut self, name: &str) -> Option<Tree> {
        let mut tree = self.trees.remove(name)?;
        tree.reset_runtime_state();
        Some(tree)
    }

    pub fn tree_names(&self) -> impl Iterator<Item = &str> {
        self.trees.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}
