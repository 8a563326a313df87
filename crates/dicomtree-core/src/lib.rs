//! Core types and traits for dicomtree.
//!
//! This crate provides the data structures shared by the scanner, the
//! hierarchy builder and the HTTP surface: filesystem entries, DICOM
//! records, scan configuration and the error taxonomy.

mod config;
mod entry;
mod error;
mod path;
mod record;

pub use config::{ScanConfig, ScanConfigBuilder, ScanRequest};
pub use entry::{DirEntry, FileEntry};
pub use error::{ScanError, ScanWarning, WarningKind};
pub use path::{extension, file_name, normalize_path};
pub use record::{DICOM_MIME_TYPE, DicomRecord, DicomTags, VOLUME_SOP_CLASS_UIDS, is_volume};
