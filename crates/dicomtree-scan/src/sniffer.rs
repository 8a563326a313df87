//! DICOM header sniffing and tag extraction.
//!
//! A file is only opened when its extension makes it a candidate. Once
//! parsed, an object is kept only if it carries usable pixel data: a
//! non-empty Pixel Data element plus non-zero Rows and Columns.
//! Everything else is excluded without being treated as an error.

use std::path::Path;

use dicom::core::Tag;
use dicom::core::value::Value;
use dicom::dictionary_std::tags;
use dicom::object::{DefaultDicomObject, open_file};
use strum::{Display, IntoStaticStr};

use dicomtree_core::{DicomRecord, DicomTags, FileEntry, extension, file_name, normalize_path};

/// Extensions worth opening. Files without an extension are common in
/// DICOM exports, so the empty extension is a candidate too.
pub const CANDIDATE_EXTENSIONS: [&str; 3] = ["", ".dcm", ".dicom"];

/// Why a file did not produce a record although nothing went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Exclusion {
    /// Extension outside [`CANDIDATE_EXTENSIONS`].
    UnsupportedType,
    /// No Pixel Data element.
    NoPixelData,
    /// Pixel Data present but zero bytes across all fragments.
    EmptyPixelData,
    /// Rows or Columns missing or zero.
    MissingDimensions,
}

/// Result of sniffing one file.
#[derive(Debug, Clone, PartialEq)]
pub enum SniffOutcome {
    Included(DicomRecord),
    Excluded(Exclusion),
    /// The file could not be parsed; carries the parser's message.
    Failed(String),
}

impl SniffOutcome {
    /// The record, if the file was included.
    pub fn into_record(self) -> Option<DicomRecord> {
        match self {
            Self::Included(record) => Some(record),
            _ => None,
        }
    }
}

/// Check whether a lowercased extension is worth opening.
pub fn is_candidate(extension: &str) -> bool {
    CANDIDATE_EXTENSIONS.contains(&extension)
}

/// Sniff a file found by the walker.
pub fn sniff_entry(entry: &FileEntry) -> SniffOutcome {
    if !is_candidate(&entry.extension) {
        return SniffOutcome::Excluded(Exclusion::UnsupportedType);
    }
    open_and_inspect(Path::new(&entry.path), &entry.name, &entry.path)
}

/// Sniff an arbitrary path. Never fails; parse errors become [`SniffOutcome::Failed`].
pub fn sniff(path: impl AsRef<Path>) -> SniffOutcome {
    let path = path.as_ref();
    let name = file_name(path);
    if !is_candidate(&extension(&name)) {
        return SniffOutcome::Excluded(Exclusion::UnsupportedType);
    }
    open_and_inspect(path, &name, &normalize_path(path))
}

fn open_and_inspect(path: &Path, name: &str, canonical: &str) -> SniffOutcome {
    match open_file(path) {
        Ok(object) => inspect(&object, name, canonical),
        Err(err) => SniffOutcome::Failed(err.to_string()),
    }
}

/// Apply the inclusion policy to a parsed object and extract its tags.
pub fn inspect(object: &DefaultDicomObject, name: &str, path: &str) -> SniffOutcome {
    let Ok(pixel_data) = object.element(tags::PIXEL_DATA) else {
        return SniffOutcome::Excluded(Exclusion::NoPixelData);
    };
    if pixel_data_len(pixel_data.value()) == 0 {
        return SniffOutcome::Excluded(Exclusion::EmptyPixelData);
    }
    if !has_dimension(object, tags::ROWS) || !has_dimension(object, tags::COLUMNS) {
        return SniffOutcome::Excluded(Exclusion::MissingDimensions);
    }

    let meta = object.meta();
    let extracted = DicomTags {
        transfer_syntax_uid: clean(meta.transfer_syntax()),
        sop_class_uid: clean(meta.media_storage_sop_class_uid())
            .or_else(|| text(object, tags::SOP_CLASS_UID)),

        patient_name: text(object, tags::PATIENT_NAME),
        patient_id: text(object, tags::PATIENT_ID),

        study_instance_uid: text(object, tags::STUDY_INSTANCE_UID),
        study_description: text(object, tags::STUDY_DESCRIPTION),
        study_id: text(object, tags::STUDY_ID),

        series_instance_uid: text(object, tags::SERIES_INSTANCE_UID),
        series_description: text(object, tags::SERIES_DESCRIPTION),
        series_number: number(object, tags::SERIES_NUMBER),

        sop_instance_uid: text(object, tags::SOP_INSTANCE_UID),
        instance_number: number(object, tags::INSTANCE_NUMBER),
    };

    SniffOutcome::Included(DicomRecord::new(name, path, extracted))
}

/// Total byte length of a Pixel Data value.
///
/// Encapsulated data sums every fragment; native data is its own length.
pub fn pixel_data_len<I, P>(value: &Value<I, P>) -> usize
where
    P: AsRef<[u8]>,
{
    match value {
        Value::Primitive(primitive) => primitive.calculate_byte_len(),
        Value::PixelSequence(sequence) => sequence
            .fragments()
            .iter()
            .map(|fragment| fragment.as_ref().len())
            .sum(),
        Value::Sequence(_) => 0,
    }
}

fn has_dimension(object: &DefaultDicomObject, tag: Tag) -> bool {
    object
        .element(tag)
        .ok()
        .and_then(|element| element.to_int::<u32>().ok())
        .is_some_and(|value| value > 0)
}

/// First value of a string element, trimmed of padding. Empty → `None`.
fn text(object: &DefaultDicomObject, tag: Tag) -> Option<String> {
    let element = object.element(tag).ok()?;
    let value = element.to_str().ok()?;
    value.split('\\').next().and_then(clean)
}

/// Integer String (IS) value; unparsable → `None`.
fn number(object: &DefaultDicomObject, tag: Tag) -> Option<i32> {
    let value = text(object, tag)?;
    value
        .parse::<i32>()
        .ok()
        .or_else(|| value.parse::<f64>().ok().map(|v| v as i32))
}

fn clean(value: &str) -> Option<String> {
    let trimmed = value.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
