//! # Snapshots
//!
//! Writes a registry to a directory and rebuilds it from there.
//!
//! A snapshot holds one record stream per kind with the raw records of the
//! concrete posts, an optional stream of refreshed records and a
//! `manifest.bin`. Placeholders are not written: storing the records again
//! recreates exactly the placeholders that were still open.

use crate::formats::{
    SnapshotManifest, StreamEntry, manifest_from_bytes, manifest_to_bytes, read_frames,
    write_frames,
};
use crate::primitives::{MANIFEST_FILE, REFRESHED_FILE};
use crate::record::Record;
use crate::registry::{Registry, Slot};
use crate::{PostKind, PostState, ThreadError};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::info;

/// Write `registry` into `dir`, replacing any previous snapshot there.
pub fn write_snapshot(registry: &Registry, dir: &Path) -> Result<SnapshotManifest, ThreadError> {
    fs::create_dir_all(dir)?;
    let mut manifest = SnapshotManifest {
        placeholders: registry.placeholders().count() as u64,
        exclusions: registry.exclusions().iter().copied().collect(),
        ..SnapshotManifest::default()
    };

    for kind in PostKind::ALL {
        let records: Vec<Value> = registry
            .posts(kind)
            .filter_map(|post| post.raw())
            .map(|record| record.clone().into_value())
            .collect();
        let written = write_frames(&dir.join(kind.file_name()), &records)?;
        manifest.kinds.insert(
            kind,
            StreamEntry {
                file: kind.file_name().to_string(),
                records: written,
            },
        );
    }

    let refreshed: Vec<Value> = registry
        .concrete()
        .filter_map(|post| post.refreshed())
        .map(|record| record.clone().into_value())
        .collect();
    let refreshed_path = dir.join(REFRESHED_FILE);
    if refreshed.is_empty() {
        if refreshed_path.exists() {
            fs::remove_file(&refreshed_path)?;
        }
    } else {
        manifest.refreshed = Some(StreamEntry {
            file: REFRESHED_FILE.to_string(),
            records: write_frames(&refreshed_path, &refreshed)?,
        });
    }

    manifest.states = registry
        .concrete()
        .filter(|post| post.state() != PostState::Unknown)
        .map(|post| (post.id(), post.state()))
        .collect();

    fs::write(dir.join(MANIFEST_FILE), manifest_to_bytes(&manifest)?)?;
    info!(
        dir = %dir.display(),
        records = manifest.records(),
        placeholders = manifest.placeholders,
        "snapshot written"
    );
    Ok(manifest)
}

/// Rebuild a registry from a snapshot directory.
///
/// Record counts, kinds and the number of open placeholders are checked
/// against the manifest.
pub fn read_snapshot(dir: &Path) -> Result<Registry, ThreadError> {
    let manifest_path = dir.join(MANIFEST_FILE);
    let bytes = fs::read(&manifest_path)
        .map_err(|e| ThreadError::Io(format!("cannot read {}: {}", manifest_path.display(), e)))?;
    let manifest = manifest_from_bytes(&bytes)?;
    let mut registry = Registry::with_exclusions(manifest.exclusions.iter().copied());

    for (kind, entry) in &manifest.kinds {
        let documents = read_stream(dir, entry)?;
        for document in documents {
            let stored = registry.store(Record::from_value(document)?)?;
            let id = stored.id();
            if registry.slot(id) != Slot::Occupied(*kind) {
                return Err(ThreadError::Serialization(format!(
                    "record {} in {} is not a {}",
                    id, entry.file, kind
                )));
            }
        }
    }

    if let Some(entry) = &manifest.refreshed {
        for document in read_stream(dir, entry)? {
            registry.attach_refreshed(Record::from_value(document)?)?;
        }
    }
    for (id, state) in &manifest.states {
        registry.set_state(*id, *state)?;
    }

    let placeholders = registry.placeholders().count() as u64;
    if placeholders != manifest.placeholders {
        return Err(ThreadError::Serialization(format!(
            "snapshot rebuilt {} placeholders, manifest lists {}",
            placeholders, manifest.placeholders
        )));
    }
    info!(dir = %dir.display(), posts = registry.len(), "snapshot loaded");
    Ok(registry)
}

fn read_stream(dir: &Path, entry: &StreamEntry) -> Result<Vec<Value>, ThreadError> {
    let documents = read_frames(&dir.join(&entry.file))?;
    if documents.len() as u64 != entry.records {
        return Err(ThreadError::Serialization(format!(
            "{} holds {} records, manifest lists {}",
            entry.file,
            documents.len(),
            entry.records
        )));
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PostId;
    use serde_json::json;

    fn record(value: Value) -> Record {
        Record::from_value(value).expect("object")
    }

    fn sample() -> Registry {
        let mut registry = Registry::with_exclusions([PostId(99)]);
        registry.store(record(json!({"id": 1}))).expect("original");
        registry
            .store(record(json!({"id": 2, "in_reply_to_status_id": 1})))
            .expect("reply");
        registry
            .store(record(json!({"id": 3, "quoted_status_id": 50})))
            .expect("quote of unseen post");
        registry.mark_source(PostId(1)).expect("state");
        registry
            .attach_refreshed(record(json!({"id": 2, "in_reply_to_status_id": 1, "full_text": "v2"})))
            .expect("refresh");
        registry
    }

    #[test]
    fn snapshot_rebuilds_equal_registry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = sample();

        let manifest = write_snapshot(&registry, dir.path()).expect("write");
        assert_eq!(manifest.records(), 3);
        assert_eq!(manifest.placeholders, 1);

        let restored = read_snapshot(dir.path()).expect("read");
        assert_eq!(restored, registry);
        assert_eq!(restored.exclusions(), registry.exclusions());
        assert_eq!(
            restored.lookup(PostId(1)).map(|p| p.state()),
            Some(PostState::IsSource)
        );
    }

    #[test]
    fn count_mismatch_is_detected() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_snapshot(&sample(), dir.path()).expect("write");
        write_frames(&dir.path().join(PostKind::Original.file_name()), &Vec::new())
            .expect("truncate");

        let err = read_snapshot(dir.path()).expect_err("mismatch");
        assert!(err.to_string().contains("manifest lists"));
    }

    #[test]
    fn missing_manifest_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(read_snapshot(dir.path()), Err(ThreadError::Io(_))));
    }
}
