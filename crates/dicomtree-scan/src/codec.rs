//! Wire framing for streamed records.
//!
//! Every record is serialized on its own with bincode. Strings are length
//! prefixed and options carry a tag byte, so concatenated frames can be
//! split again without an outer length prefix.

use std::io::Write;

use bincode::Options;
use thiserror::Error;

use dicomtree_core::DicomRecord;

/// Content type of a frame stream.
pub const FRAME_CONTENT_TYPE: &str = "application/vnd.dicomtree.frames";

/// Upper bound on a single encoded record.
pub const MAX_FRAME_LEN: u64 = 1024 * 1024;

/// Errors raised while encoding or decoding frames.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode record: {0}")]
    Encode(#[source] bincode::Error),

    #[error("corrupt frame: {0}")]
    Decode(#[source] bincode::Error),

    #[error("failed to write frame: {0}")]
    Io(#[from] std::io::Error),
}

// Same layout as `bincode::serialize` (fixed-width ints, little endian)
// with a size limit so a corrupt length cannot trigger a huge allocation.
fn frame_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_limit(MAX_FRAME_LEN)
}

/// Encode one record as a self-delimiting frame.
pub fn encode_frame(record: &DicomRecord) -> Result<Vec<u8>, CodecError> {
    frame_options().serialize(record).map_err(CodecError::Encode)
}

/// Writes frames to a byte sink. A frame is fully encoded before any of
/// its bytes are written.
#[derive(Debug)]
pub struct FrameEncoder<W> {
    writer: W,
    frames: u64,
}

impl<W: Write> FrameEncoder<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, frames: 0 }
    }

    pub fn write(&mut self, record: &DicomRecord) -> Result<(), CodecError> {
        let frame = encode_frame(record)?;
        self.writer.write_all(&frame)?;
        self.frames += 1;
        Ok(())
    }

    /// Number of frames written.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Incremental decoder for a chunked frame stream.
///
/// Chunks may split frames anywhere; only complete records are returned.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a received chunk.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Decode the next complete record, or `None` if more bytes are needed.
    pub fn next_record(&mut self) -> Result<Option<DicomRecord>, CodecError> {
        if self.buf.is_empty() {
            return Ok(None);
        }
        let mut remaining: &[u8] = &self.buf;
        match frame_options().deserialize_from::<_, DicomRecord>(&mut remaining) {
            Ok(record) => {
                let consumed = self.buf.len() - remaining.len();
                self.buf.drain(..consumed);
                Ok(Some(record))
            }
            Err(err) if is_incomplete(&err) => Ok(None),
            Err(err) => Err(CodecError::Decode(err)),
        }
    }

    /// Push a chunk and decode every record it completes.
    pub fn decode(&mut self, chunk: &[u8]) -> Result<Vec<DicomRecord>, CodecError> {
        self.push(chunk);
        let mut records = Vec::new();
        while let Some(record) = self.next_record()? {
            records.push(record);
        }
        Ok(records)
    }

    /// Bytes buffered for a frame that has not completed yet.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

fn is_incomplete(err: &bincode::Error) -> bool {
    matches!(
        err.as_ref(),
        bincode::ErrorKind::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof
    )
}
