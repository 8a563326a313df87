//! Depth-first flattening of the tree into renderable rows.

use std::collections::HashMap;

use serde::Serialize;
use strum::{Display, EnumString};

use crate::tree::{HierarchyTree, InstanceNode};

/// Depth slot of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Slot {
    Patient,
    Study,
    Series,
    Instance,
}

impl Slot {
    /// Depth of the row, from 1 for patients to 4 for instances.
    pub fn level(self) -> u8 {
        match self {
            Self::Patient => 1,
            Self::Study => 2,
            Self::Series => 3,
            Self::Instance => 4,
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Self::Patient => "person",
            Self::Study => "folder",
            Self::Series => "collections",
            Self::Instance => "image",
        }
    }
}

/// One visible row of the flattened tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayNode {
    pub slot: Slot,
    pub level: u8,
    /// Position of this row in the flattened list.
    pub index: usize,
    /// Key of the node within its parent.
    pub id: String,
    /// Full key path from the patient down to this node.
    pub keys: Vec<String>,
    pub name: String,
    pub icon: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expanded: Option<bool>,
    /// File path; instances only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// InstanceNumber; instances only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<i32>,
}

impl DisplayNode {
    fn branch(slot: Slot, index: usize, keys: Vec<String>, name: String, expanded: bool) -> Self {
        Self {
            slot,
            level: slot.level(),
            index,
            id: keys.last().cloned().unwrap_or_default(),
            keys,
            name,
            icon: slot.icon(),
            expanded: Some(expanded),
            path: None,
            number: None,
        }
    }

    fn leaf(index: usize, keys: Vec<String>, instance: &InstanceNode) -> Self {
        Self {
            slot: Slot::Instance,
            level: Slot::Instance.level(),
            index,
            id: keys.last().cloned().unwrap_or_default(),
            keys,
            name: instance.file_name.clone(),
            icon: Slot::Instance.icon(),
            expanded: None,
            path: Some(instance.file_path.clone()),
            number: instance.instance_number,
        }
    }
}

/// Where an instance row landed in the last flatten that showed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub index: usize,
    pub keys: Vec<String>,
}

/// File path → row lookup.
///
/// Entries are refreshed whenever a flatten shows the instance; rows that
/// get collapsed away keep their last known location.
pub type PathIndex = HashMap<String, Location>;

/// Flatten `tree` depth-first, honoring expansion flags.
///
/// Patients, studies and series keep insertion order; instances within a
/// series are ordered by InstanceNumber with ties and missing numbers kept
/// in arrival order. Every visible node gets its row written back to `i`.
pub fn flatten(tree: &mut HierarchyTree, index: &mut PathIndex) -> Vec<DisplayNode> {
    let mut rows = Vec::new();

    for (patient_key, patient) in tree.patients.iter_mut() {
        let keys = vec![patient_key.clone()];
        patient.position = Some(rows.len());
        rows.push(DisplayNode::branch(
            Slot::Patient,
            rows.len(),
            keys.clone(),
            patient_key.clone(),
            patient.expanded,
        ));
        if !patient.expanded {
            continue;
        }

        for (study_key, study) in patient.studies.iter_mut() {
            let keys = extend(&keys, study_key);
            study.position = Some(rows.len());
            rows.push(DisplayNode::branch(
                Slot::Study,
                rows.len(),
                keys.clone(),
                study.display_name(),
                study.expanded,
            ));
            if !study.expanded {
                continue;
            }

            for (series_key, series) in study.series.iter_mut() {
                let keys = extend(&keys, series_key);
                series.position = Some(rows.len());
                rows.push(DisplayNode::branch(
                    Slot::Series,
                    rows.len(),
                    keys.clone(),
                    series.display_name(),
                    series.expanded,
                ));
                if !series.expanded {
                    continue;
                }

                let order = instance_order(series.instances.values().map(|i| i.instance_number));
                for slot in order {
                    let Some((instance_key, instance)) = series.instances.get_index_mut(slot)
                    else {
                        continue;
                    };
                    let keys = extend(&keys, instance_key);
                    let row = rows.len();
                    instance.position = Some(row);
                    index.insert(
                        instance.file_path.clone(),
                        Location {
                            index: row,
                            keys: keys.clone(),
                        },
                    );
                    rows.push(DisplayNode::leaf(row, keys, instance));
                }
            }
        }
    }

    rows
}

fn extend(keys: &[String], key: &str) -> Vec<String> {
    let mut next = keys.to_vec();
    next.push(key.to_string());
    next
}

/// Arrival indices in display order.
///
/// Each instance goes in front of the first already-placed instance with a
/// strictly greater number, otherwise at the end.
fn instance_order(numbers: impl Iterator<Item = Option<i32>>) -> Vec<usize> {
    let mut placed: Vec<(usize, Option<i32>)> = Vec::new();
    for (arrival, number) in numbers.enumerate() {
        let at = placed
            .iter()
            .position(|(_, existing)| matches!((existing, number), (Some(a), Some(b)) if *a > b));
        match at {
            Some(at) => placed.insert(at, (arrival, number)),
            None => placed.push((arrival, number)),
        }
    }
    placed.into_iter().map(|(arrival, _)| arrival).collect()
}
