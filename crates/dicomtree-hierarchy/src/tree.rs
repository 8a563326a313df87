//! The patient → study → series → instance tree.
//!
//! Each level owns its children in an insertion-ordered map, so first-seen
//! order survives without any back pointers. Parent context is carried as
//! a key path during traversal instead.

use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::{Deserialize, Serialize};
use tracing::trace;

use dicomtree_core::{DicomRecord, DicomTags};

/// Fallback patient label when the record has no PatientName.
pub const UNKNOWN_PATIENT: &str = "Unknown Patient";
/// Fallback study key and display name.
pub const UNKNOWN_STUDY: &str = "Unknown Study";
/// Fallback series key and display name.
pub const UNKNOWN_SERIES: &str = "Unknown Series";

/// Composite patient key: the name, followed by ` (ID)` when an ID is known.
pub fn patient_key(tags: &DicomTags) -> String {
    let name = tags.patient_name.as_deref().unwrap_or(UNKNOWN_PATIENT);
    match tags.patient_id.as_deref() {
        Some(id) => format!("{name} ({id})"),
        None => name.to_string(),
    }
}

fn study_key(tags: &DicomTags) -> String {
    tags.study_instance_uid
        .clone()
        .unwrap_or_else(|| UNKNOWN_STUDY.to_string())
}

fn series_key(tags: &DicomTags) -> String {
    tags.series_instance_uid
        .clone()
        .unwrap_or_else(|| UNKNOWN_SERIES.to_string())
}

// Without a SOP Instance UID the file path is the only stable identity.
fn instance_key(record: &DicomRecord) -> String {
    record
        .tags
        .sop_instance_uid
        .clone()
        .unwrap_or_else(|| record.path.clone())
}

fn backfill<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
    if slot.is_none() {
        slot.clone_from(value);
    }
}

/// Root of one loaded dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HierarchyTree {
    #[serde(default)]
    pub patients: IndexMap<String, PatientNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientNode {
    #[serde(rename = "PatientName", default, skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,
    #[serde(rename = "PatientID", default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub studies: IndexMap<String, StudyNode>,
    #[serde(default)]
    pub expanded: bool,
    /// Row of this node in the last flatten pass.
    #[serde(rename = "i", default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudyNode {
    #[serde(rename = "StudyDescription", default, skip_serializing_if = "Option::is_none")]
    pub study_description: Option<String>,
    #[serde(rename = "StudyID", default, skip_serializing_if = "Option::is_none")]
    pub study_id: Option<String>,
    #[serde(default)]
    pub series: IndexMap<String, SeriesNode>,
    #[serde(default)]
    pub expanded: bool,
    #[serde(rename = "i", default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

impl StudyNode {
    /// Description, else Study ID, else "Unknown Study".
    pub fn display_name(&self) -> String {
        self.study_description
            .as_deref()
            .or(self.study_id.as_deref())
            .unwrap_or(UNKNOWN_STUDY)
            .to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesNode {
    #[serde(rename = "SeriesDescription", default, skip_serializing_if = "Option::is_none")]
    pub series_description: Option<String>,
    #[serde(rename = "SeriesNumber", default, skip_serializing_if = "Option::is_none")]
    pub series_number: Option<i32>,
    #[serde(default)]
    pub instances: IndexMap<String, InstanceNode>,
    #[serde(default)]
    pub expanded: bool,
    #[serde(rename = "i", default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

impl SeriesNode {
    /// Description (or "Unknown Series") with a ` #N` suffix when numbered.
    pub fn display_name(&self) -> String {
        let description = self
            .series_description
            .as_deref()
            .unwrap_or(UNKNOWN_SERIES);
        match self.series_number {
            Some(number) => format!("{description} #{number}"),
            None => description.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceNode {
    pub file_name: String,
    pub file_path: String,
    #[serde(rename = "InstanceNumber", default, skip_serializing_if = "Option::is_none")]
    pub instance_number: Option<i32>,
    #[serde(rename = "i", default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

/// A node reached by [`HierarchyTree::find_item`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeRef<'a> {
    Patient(&'a PatientNode),
    Study(&'a StudyNode),
    Series(&'a SeriesNode),
    Instance(&'a InstanceNode),
}

impl NodeRef<'_> {
    /// Cached row from the last flatten pass.
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::Patient(node) => node.position,
            Self::Study(node) => node.position,
            Self::Series(node) => node.position,
            Self::Instance(node) => node.position,
        }
    }

    /// Expansion state; instances are leaves and have none.
    pub fn expanded(&self) -> Option<bool> {
        match self {
            Self::Patient(node) => Some(node.expanded),
            Self::Study(node) => Some(node.expanded),
            Self::Series(node) => Some(node.expanded),
            Self::Instance(_) => None,
        }
    }
}

impl HierarchyTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, creating collapsed intermediate nodes on first sight.
    ///
    /// Returns `true` when a new instance was added; re-inserting a known
    /// SOP Instance UID overwrites that instance instead.
    pub fn insert(&mut self, record: &DicomRecord) -> bool {
        let tags = &record.tags;

        let patient = self
            .patients
            .entry(patient_key(tags))
            .or_insert_with(|| PatientNode {
                patient_name: tags.patient_name.clone(),
                patient_id: tags.patient_id.clone(),
                ..Default::default()
            });

        let study = patient.studies.entry(study_key(tags)).or_default();
        backfill(&mut study.study_description, &tags.study_description);
        backfill(&mut study.study_id, &tags.study_id);

        let series = study.series.entry(series_key(tags)).or_default();
        backfill(&mut series.series_description, &tags.series_description);
        backfill(&mut series.series_number, &tags.series_number);

        let instance = InstanceNode {
            file_name: record.name.clone(),
            file_path: record.path.clone(),
            instance_number: tags.instance_number,
            position: None,
        };
        match series.instances.entry(instance_key(record)) {
            Entry::Occupied(mut existing) => {
                trace!(path = %record.path, "replacing known instance");
                let position = existing.get().position;
                *existing.get_mut() = InstanceNode { position, ..instance };
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(instance);
                true
            }
        }
    }

    /// Descend by a prefix of `[patient, study, series, instance]` keys.
    ///
    /// Returns the deepest node named by the keys, or `None` when the
    /// patient key is missing or any key fails to resolve. An empty key
    /// ends the descent at its parent.
    pub fn find_item<S: AsRef<str>>(&self, keys: &[S]) -> Option<NodeRef<'_>> {
        let mut keys = keys.iter().map(S::as_ref).take_while(|k| !k.is_empty());

        let patient = self.patients.get(keys.next()?)?;
        let Some(study_key) = keys.next() else {
            return Some(NodeRef::Patient(patient));
        };
        let study = patient.studies.get(study_key)?;
        let Some(series_key) = keys.next() else {
            return Some(NodeRef::Study(study));
        };
        let series = study.series.get(series_key)?;
        let Some(instance_key) = keys.next() else {
            return Some(NodeRef::Series(series));
        };
        series.instances.get(instance_key).map(NodeRef::Instance)
    }

    /// Set the expansion flag of the patient, study or series named by `keys`.
    ///
    /// Returns `false` when the keys do not name an expandable node.
    pub fn set_expanded<S: AsRef<str>>(&mut self, keys: &[S], expanded: bool) -> bool {
        match self.expanded_flag(keys) {
            Some(flag) => {
                *flag = expanded;
                true
            }
            None => false,
        }
    }

    /// Flip the expansion flag; returns the new state.
    pub fn toggle<S: AsRef<str>>(&mut self, keys: &[S]) -> Option<bool> {
        let flag = self.expanded_flag(keys)?;
        *flag = !*flag;
        Some(*flag)
    }

    /// Expand or collapse every patient, study and series.
    pub fn set_all_expanded(&mut self, expanded: bool) {
        for patient in self.patients.values_mut() {
            patient.expanded = expanded;
            for study in patient.studies.values_mut() {
                study.expanded = expanded;
                for series in study.series.values_mut() {
                    series.expanded = expanded;
                }
            }
        }
    }

    fn expanded_flag<S: AsRef<str>>(&mut self, keys: &[S]) -> Option<&mut bool> {
        let keys: Vec<&str> = keys.iter().map(S::as_ref).collect();
        match keys.as_slice() {
            [patient] => self.patients.get_mut(*patient).map(|p| &mut p.expanded),
            [patient, study] => self
                .patients
                .get_mut(*patient)?
                .studies
                .get_mut(*study)
                .map(|s| &mut s.expanded),
            [patient, study, series] => self
                .patients
                .get_mut(*patient)?
                .studies
                .get_mut(*study)?
                .series
                .get_mut(*series)
                .map(|s| &mut s.expanded),
            _ => None,
        }
    }

    /// Number of instances across all patients.
    pub fn instance_count(&self) -> usize {
        self.patients
            .values()
            .flat_map(|p| p.studies.values())
            .flat_map(|s| s.series.values())
            .map(|s| s.instances.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }
}
