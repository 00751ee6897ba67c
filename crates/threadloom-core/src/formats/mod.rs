//! # Formats
//!
//! Byte-level codecs: gzip record streams and the snapshot manifest.

pub mod frames;
pub mod persistence;

pub use frames::{FrameReader, FrameWriter, read_frames, write_frames};
pub use persistence::{
    ManifestHeader, SnapshotManifest, StreamEntry, manifest_from_bytes, manifest_to_bytes,
};
