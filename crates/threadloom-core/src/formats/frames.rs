//! # Record Streams
//!
//! Gzip-compressed sequence of length-prefixed JSON documents:
//!
//! ```text
//! [u32 LE payload length][payload: JSON document] ...
//! ```
//!
//! Used for ingest input files and for the per-kind snapshot files. Frame
//! lengths are checked against [`MAX_FRAME_SIZE`] before the payload buffer
//! is allocated.

use crate::primitives::MAX_FRAME_SIZE;
use crate::ThreadError;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde_json::Value;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

// =============================================================================
// WRITER
// =============================================================================

/// Writes frames into a gzip stream.
pub struct FrameWriter<W: Write> {
    encoder: GzEncoder<W>,
    frames: u64,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            encoder: GzEncoder::new(inner, Compression::default()),
            frames: 0,
        }
    }

    /// Append one already-encoded payload.
    pub fn write_frame(&mut self, payload: &[u8]) -> Result<(), ThreadError> {
        if payload.len() > MAX_FRAME_SIZE {
            return Err(ThreadError::Serialization(format!(
                "frame of {} bytes exceeds maximum {} bytes",
                payload.len(),
                MAX_FRAME_SIZE
            )));
        }
        let len = u32::try_from(payload.len())
            .map_err(|_| ThreadError::Serialization("frame length overflow".to_string()))?;
        self.encoder.write_all(&len.to_le_bytes())?;
        self.encoder.write_all(payload)?;
        self.frames += 1;
        Ok(())
    }

    /// Append one JSON document.
    pub fn write_value(&mut self, value: &Value) -> Result<(), ThreadError> {
        let payload =
            serde_json::to_vec(value).map_err(|e| ThreadError::Serialization(e.to_string()))?;
        self.write_frame(&payload)
    }

    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Flush the gzip trailer and return the inner writer.
    pub fn finish(self) -> Result<W, ThreadError> {
        Ok(self.encoder.finish()?)
    }
}

// =============================================================================
// READER
// =============================================================================

/// Reads frames from a gzip stream.
pub struct FrameReader<R: Read> {
    decoder: GzDecoder<R>,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            decoder: GzDecoder::new(inner),
        }
    }

    /// Read the next raw payload, or `None` at a clean end of stream.
    pub fn next_frame(&mut self) -> Result<Option<Vec<u8>>, ThreadError> {
        let Some(len) = self.read_len()? else {
            return Ok(None);
        };
        if len > MAX_FRAME_SIZE {
            return Err(ThreadError::Serialization(format!(
                "frame of {} bytes exceeds maximum {} bytes",
                len, MAX_FRAME_SIZE
            )));
        }
        let mut payload = vec![0u8; len];
        self.decoder.read_exact(&mut payload).map_err(|e| {
            ThreadError::Serialization(format!("truncated frame of {} bytes: {}", len, e))
        })?;
        Ok(Some(payload))
    }

    /// Read the next JSON document, or `None` at end of stream.
    pub fn next_value(&mut self) -> Result<Option<Value>, ThreadError> {
        self.next_frame()?
            .map(|payload| {
                serde_json::from_slice(&payload).map_err(|e| {
                    ThreadError::Serialization(format!("invalid JSON frame: {}", e))
                })
            })
            .transpose()
    }

    /// Length prefix; `None` if the stream ends before its first byte.
    fn read_len(&mut self) -> Result<Option<usize>, ThreadError> {
        let mut prefix = [0u8; 4];
        let mut filled = 0;
        while filled < prefix.len() {
            match self.decoder.read(&mut prefix[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => {
                    return Err(ThreadError::Serialization(
                        "truncated frame length".to_string(),
                    ));
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(Some(u32::from_le_bytes(prefix) as usize))
    }
}

impl<R: Read> Iterator for FrameReader<R> {
    type Item = Result<Value, ThreadError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_value().transpose()
    }
}

// =============================================================================
// FILE HELPERS
// =============================================================================

/// Read every document of a record stream file.
pub fn read_frames(path: &Path) -> Result<Vec<Value>, ThreadError> {
    let file = File::open(path)
        .map_err(|e| ThreadError::Io(format!("cannot open {}: {}", path.display(), e)))?;
    FrameReader::new(BufReader::new(file)).collect()
}

/// Write documents to a record stream file, replacing it. Returns the number
/// of frames written.
pub fn write_frames<'a>(
    path: &Path,
    documents: impl IntoIterator<Item = &'a Value>,
) -> Result<u64, ThreadError> {
    let file = File::create(path)
        .map_err(|e| ThreadError::Io(format!("cannot create {}: {}", path.display(), e)))?;
    let mut writer = FrameWriter::new(BufWriter::new(file));
    for document in documents {
        writer.write_value(document)?;
    }
    let frames = writer.frames();
    writer.finish()?.flush()?;
    Ok(frames)
}
