//! # Snapshot Manifest Format
//!
//! Format: Header (5 bytes) + postcard-serialized [`SnapshotManifest`].
//! - 4 bytes: Magic ("TLOM")
//! - 1 byte: Version
//!
//! Header and size are validated before the payload is decoded.

use crate::{PostId, PostKind, PostState, ThreadError, primitives};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Largest manifest accepted by [`manifest_from_bytes`].
pub const MAX_MANIFEST_SIZE: usize = 256 * 1024 * 1024;

const HEADER_SIZE: usize = 5;

// =============================================================================
// HEADER
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl ManifestHeader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), ThreadError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(ThreadError::Serialization(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(ThreadError::Serialization(format!(
                "Unsupported version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ThreadError> {
        if bytes.len() < HEADER_SIZE {
            return Err(ThreadError::Serialization(
                "Header too short".to_string(),
            ));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        Ok(Self {
            magic,
            version: bytes[4],
        })
    }
}

impl Default for ManifestHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// MANIFEST
// =============================================================================

/// One record stream of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEntry {
    pub file: String,
    pub records: u64,
}

/// Describes the files of a snapshot directory and the registry state that
/// is not carried by the records themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotManifest {
    /// Raw records per kind.
    pub kinds: BTreeMap<PostKind, StreamEntry>,
    /// Refreshed records, if any post has one.
    pub refreshed: Option<StreamEntry>,
    /// Lifecycle state of every post not in the default state.
    pub states: BTreeMap<PostId, PostState>,
    /// Placeholders expected after the records are stored again.
    pub placeholders: u64,
    pub exclusions: Vec<PostId>,
}

impl SnapshotManifest {
    /// Total number of raw records.
    #[must_use]
    pub fn records(&self) -> u64 {
        self.kinds.values().map(|entry| entry.records).sum()
    }
}

/// Serialize a manifest (header + payload).
pub fn manifest_to_bytes(manifest: &SnapshotManifest) -> Result<Vec<u8>, ThreadError> {
    let payload =
        postcard::to_stdvec(manifest).map_err(|e| ThreadError::Serialization(e.to_string()))?;
    let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
    bytes.extend_from_slice(&ManifestHeader::new().to_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Deserialize a manifest, validating size and header first.
pub fn manifest_from_bytes(bytes: &[u8]) -> Result<SnapshotManifest, ThreadError> {
    if bytes.len() > MAX_MANIFEST_SIZE {
        return Err(ThreadError::Serialization(format!(
            "Manifest size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_MANIFEST_SIZE
        )));
    }
    ManifestHeader::from_bytes(bytes)?.validate()?;
    postcard::from_bytes(&bytes[HEADER_SIZE..]).map_err(|e| {
        ThreadError::Serialization(format!("Failed to deserialize manifest: {}", e))
    })
}
