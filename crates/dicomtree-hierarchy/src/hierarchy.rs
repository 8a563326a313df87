//! Owned hierarchy context: the tree plus the path → row index built by
//! flattening it.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use dicomtree_core::DicomRecord;

use crate::error::SnapshotError;
use crate::flatten::{DisplayNode, Location, PathIndex, flatten};
use crate::tree::{HierarchyTree, NodeRef};

/// Tree and path index for one loaded dataset.
///
/// Consumers own one of these per view; there is no shared global tree.
/// All mutation goes through `&mut self`, so a flatten never observes a
/// half-applied insert.
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    tree: HierarchyTree,
    path_index: PathIndex,
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing tree, e.g. one restored from a snapshot.
    pub fn from_tree(tree: HierarchyTree) -> Self {
        Self {
            tree,
            path_index: PathIndex::new(),
        }
    }

    pub fn tree(&self) -> &HierarchyTree {
        &self.tree
    }

    pub fn into_tree(self) -> HierarchyTree {
        self.tree
    }

    /// See [`HierarchyTree::insert`].
    pub fn insert(&mut self, record: &DicomRecord) -> bool {
        self.tree.insert(record)
    }

    /// Insert records in order; returns how many were new instances.
    pub fn extend<'a>(&mut self, records: impl IntoIterator<Item = &'a DicomRecord>) -> usize {
        records
            .into_iter()
            .filter(|record| self.tree.insert(record))
            .count()
    }

    /// Flatten to visible rows, refreshing cached positions and the path index.
    pub fn flatten(&mut self) -> Vec<DisplayNode> {
        let rows = flatten(&mut self.tree, &mut self.path_index);
        debug!(rows = rows.len(), indexed = self.path_index.len(), "flattened hierarchy");
        rows
    }

    pub fn find_item<S: AsRef<str>>(&self, keys: &[S]) -> Option<NodeRef<'_>> {
        self.tree.find_item(keys)
    }

    pub fn set_expanded<S: AsRef<str>>(&mut self, keys: &[S], expanded: bool) -> bool {
        self.tree.set_expanded(keys, expanded)
    }

    pub fn toggle<S: AsRef<str>>(&mut self, keys: &[S]) -> Option<bool> {
        self.tree.toggle(keys)
    }

    pub fn expand_all(&mut self) {
        self.tree.set_all_expanded(true);
    }

    pub fn collapse_all(&mut self) {
        self.tree.set_all_expanded(false);
    }

    /// Last known row of the instance stored at `path`.
    pub fn locate(&self, path: &str) -> Option<&Location> {
        self.path_index.get(path)
    }

    pub fn path_index(&self) -> &PathIndex {
        &self.path_index
    }

    /// Drop every node and index entry.
    pub fn clear(&mut self) {
        self.tree = HierarchyTree::default();
        self.path_index.clear();
    }

    /// Serialize the tree, expansion flags included, as JSON.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(&self.tree)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let tree: HierarchyTree = serde_json::from_str(json)?;
        Ok(Self::from_tree(tree))
    }

    /// Write a JSON snapshot of the tree to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?).map_err(|e| SnapshotError::io(path, e))
    }

    /// Restore from a snapshot written by [`save`](Self::save).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| SnapshotError::io(path, e))?;
        Self::from_json(&json)
    }
}

impl Serialize for Hierarchy {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.tree.serialize(serializer)
    }
}
