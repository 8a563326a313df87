//! DICOM discovery engine for dicomtree.
//!
//! # Overview
//!
//! `dicomtree-scan` turns a set of root paths into a stream of
//! [`DicomRecord`]s:
//!
//! - **Walking** lists folders and files, skipping hidden entries,
//!   Windows shortcuts and symlinks, and recurses depth-first
//! - **Sniffing** opens candidate files and keeps those with usable pixel data
//! - **Streaming** hands records to the consumer through a bounded channel,
//!   so a slow consumer slows the scan down instead of growing a buffer
//! - **Framing** encodes each record as a self-delimiting binary frame
//!
//! # Example
//!
//! ```rust,no_run
//! use dicomtree_scan::{DicomScanner, ScanConfig};
//!
//! # async fn run() -> Result<(), dicomtree_scan::ScanError> {
//! let scanner = DicomScanner::new();
//! let mut stream = scanner.scan(ScanConfig::new(["/data/studies"]))?;
//!
//! while let Some(record) = stream.recv().await {
//!     println!("{} ({:?})", record.path, record.tags.sop_instance_uid);
//! }
//!
//! let progress = stream.finish().await?;
//! println!("{} files visited", progress.files_visited);
//! # Ok(())
//! # }
//! ```

mod codec;
mod progress;
mod sniffer;
mod stream;
mod walker;

pub use codec::{
    CodecError, FRAME_CONTENT_TYPE, FrameDecoder, FrameEncoder, MAX_FRAME_LEN, encode_frame,
};
pub use progress::ScanProgress;
pub use sniffer::{
    CANDIDATE_EXTENSIONS, Exclusion, SniffOutcome, inspect, is_candidate, pixel_data_len, sniff,
    sniff_entry,
};
pub use stream::{DicomScanner, ScanStream};
pub use walker::{DirectoryWalker, Listing, Walk, is_skipped_name, path_exists, read_children};

// Re-export core types for convenience
pub use dicomtree_core::{
    DicomRecord, DicomTags, DirEntry, FileEntry, ScanConfig, ScanError, ScanRequest, ScanWarning,
    WarningKind,
};
