//! DICOM records emitted by the scan stream.

use serde::{Deserialize, Serialize};

/// MIME type carried by every record.
pub const DICOM_MIME_TYPE: &str = "application/dicom";

/// Multi-frame / volumetric SOP classes rendered as volumes.
pub const VOLUME_SOP_CLASS_UIDS: [&str; 8] = [
    "1.2.840.10008.5.1.4.1.1.2.1",    // Enhanced CT Image Storage
    "1.2.840.10008.5.1.4.1.1.4.1",    // Enhanced MR Image Storage
    "1.2.840.10008.5.1.4.1.1.4.3",    // Enhanced MR Color Image Storage
    "1.2.840.10008.5.1.4.1.1.6.2",    // Enhanced US Volume Storage
    "1.2.840.10008.5.1.4.1.1.12.1.1", // Enhanced XA Image Storage
    "1.2.840.10008.5.1.4.1.1.12.2.1", // Enhanced XRF Image Storage
    "1.2.840.10008.5.1.4.1.1.88.22",  // Enhanced SR Storage
    "1.2.840.10008.5.1.4.1.1.130",    // Enhanced PET Image Storage
];

/// Check whether a SOP Class UID is on the volume allow-list.
pub fn is_volume(sop_class_uid: Option<&str>) -> bool {
    sop_class_uid.is_some_and(|uid| VOLUME_SOP_CLASS_UIDS.contains(&uid))
}

/// Identifying tags extracted from a DICOM header.
///
/// Field names follow the DICOM keywords so that serialized records and
/// snapshots read the same as the standard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DicomTags {
    #[serde(rename = "TransferSyntaxUID")]
    pub transfer_syntax_uid: Option<String>,
    #[serde(rename = "SOPClassUID")]
    pub sop_class_uid: Option<String>,

    pub patient_name: Option<String>,
    #[serde(rename = "PatientID")]
    pub patient_id: Option<String>,

    #[serde(rename = "StudyInstanceUID")]
    pub study_instance_uid: Option<String>,
    pub study_description: Option<String>,
    #[serde(rename = "StudyID")]
    pub study_id: Option<String>,

    #[serde(rename = "SeriesInstanceUID")]
    pub series_instance_uid: Option<String>,
    pub series_description: Option<String>,
    pub series_number: Option<i32>,

    #[serde(rename = "SOPInstanceUID")]
    pub sop_instance_uid: Option<String>,
    pub instance_number: Option<i32>,
}

/// One DICOM file accepted by the scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DicomRecord {
    /// File base name.
    pub name: String,
    /// Canonical forward-slash path.
    pub path: String,
    /// Always [`DICOM_MIME_TYPE`].
    pub mime_type: String,
    pub tags: DicomTags,
    /// Whether the SOP class is a multi-frame volume.
    pub is_volume: bool,
}

impl DicomRecord {
    /// Create a record, deriving `is_volume` from the SOP Class UID.
    pub fn new(name: impl Into<String>, path: impl Into<String>, tags: DicomTags) -> Self {
        let is_volume = is_volume(tags.sop_class_uid.as_deref());
        Self {
            name: name.into(),
            path: path.into(),
            mime_type: DICOM_MIME_TYPE.to_string(),
            tags,
            is_volume,
        }
    }
}
