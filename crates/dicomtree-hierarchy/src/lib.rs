//! Patient → study → series → instance hierarchy for dicomtree.
//!
//! Records are folded into a [`HierarchyTree`] as they arrive, then
//! [`flatten`]ed into the rows a tree view renders. Expansion flags live on
//! the nodes themselves, so a JSON snapshot restores the view exactly.
//!
//! ```rust
//! use dicomtree_core::{DicomRecord, DicomTags};
//! use dicomtree_hierarchy::Hierarchy;
//!
//! let mut hierarchy = Hierarchy::new();
//! hierarchy.insert(&DicomRecord::new("a.dcm", "/data/a.dcm", DicomTags::default()));
//! hierarchy.expand_all();
//!
//! let rows = hierarchy.flatten();
//! assert_eq!(rows.len(), 4);
//! assert_eq!(hierarchy.locate("/data/a.dcm").map(|l| l.index), Some(3));
//! ```

mod error;
mod flatten;
mod hierarchy;
mod tree;

pub use error::SnapshotError;
pub use flatten::{DisplayNode, Location, PathIndex, Slot, flatten};
pub use hierarchy::Hierarchy;
pub use tree::{
    HierarchyTree, InstanceNode, NodeRef, PatientNode, SeriesNode, StudyNode, UNKNOWN_PATIENT,
    UNKNOWN_SERIES, UNKNOWN_STUDY, patient_key,
};
