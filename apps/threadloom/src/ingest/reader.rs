//! Parallel decoding of record stream files.
//!
//! Files are decoded on blocking worker threads, at most `workers` at a
//! time. Decoded documents are returned in file order so the caller can fold
//! them into the registry deterministically on a single task.

use crate::error::AppError;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use threadloom_core::read_frames;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use walkdir::WalkDir;

/// Documents decoded from one file.
#[derive(Debug)]
pub struct DecodedFile {
    pub path: PathBuf,
    pub documents: Vec<Value>,
}

type Decoded = (usize, Result<Vec<Value>, AppError>);

/// Regular files anywhere under `dir`, sorted by path.
pub fn collect_files(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    if !dir.is_dir() {
        return Err(AppError::Io(format!(
            "input directory does not exist: {}",
            dir.display()
        )));
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.map_err(|e| AppError::Io(e.to_string()))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Decode every file on the worker pool.
///
/// The first failure cancels the outstanding work and is returned.
pub async fn decode_files(files: Vec<PathBuf>, workers: usize) -> Result<Vec<DecodedFile>, AppError> {
    let permits = Arc::new(Semaphore::new(workers.max(1)));
    let mut tasks: JoinSet<Decoded> = JoinSet::new();
    let mut decoded: Vec<Option<Vec<Value>>> = files.iter().map(|_| None).collect();

    for (index, path) in files.iter().cloned().enumerate() {
        let permit = Arc::clone(&permits)
            .acquire_owned()
            .await
            .map_err(|e| AppError::Task(e.to_string()))?;
        tasks.spawn_blocking(move || {
            let _permit = permit;
            let result = read_frames(&path).map_err(|source| AppError::File {
                path: path.display().to_string(),
                source,
            });
            (index, result)
        });
        while let Some(joined) = tasks.try_join_next() {
            settle(joined, &mut decoded, &mut tasks)?;
        }
    }
    while let Some(joined) = tasks.join_next().await {
        settle(joined, &mut decoded, &mut tasks)?;
    }

    files
        .into_iter()
        .zip(decoded)
        .map(|(path, documents)| {
            let documents = documents.ok_or_else(|| {
                AppError::Task(format!("no result for {}", path.display()))
            })?;
            Ok(DecodedFile { path, documents })
        })
        .collect()
}

fn settle(
    joined: Result<Decoded, JoinError>,
    decoded: &mut [Option<Vec<Value>>],
    tasks: &mut JoinSet<Decoded>,
) -> Result<(), AppError> {
    let outcome = joined
        .map_err(|e| AppError::Task(e.to_string()))
        .and_then(|(index, result)| result.map(|documents| (index, documents)));
    match outcome {
        Ok((index, documents)) => {
            if let Some(slot) = decoded.get_mut(index) {
                *slot = Some(documents);
            }
            Ok(())
        }
        Err(e) => {
            tasks.abort_all();
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use threadloom_core::write_frames;

    #[tokio::test]
    async fn results_follow_file_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        for n in 0..5 {
            let docs: Vec<Value> = (0..=n).map(|i| json!({"id": n * 10 + i})).collect();
            write_frames(&dir.path().join(format!("part-{n}.gz")), &docs).expect("write");
        }

        let files = collect_files(dir.path()).expect("collect");
        let decoded = decode_files(files, 2).await.expect("decode");

        let sizes: Vec<_> = decoded.iter().map(|f| f.documents.len()).collect();
        assert_eq!(sizes, vec![1, 2, 3, 4, 5]);
        assert!(decoded[0].path.ends_with("part-0.gz"));
    }

    #[tokio::test]
    async fn corrupt_file_fails_the_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_frames(&dir.path().join("a.gz"), &vec![json!({"id": 1})]).expect("write");
        std::fs::write(dir.path().join("b.gz"), b"not gzip").expect("write");

        let files = collect_files(dir.path()).expect("collect");
        let err = decode_files(files, 4).await.expect_err("corrupt");
        assert!(matches!(err, AppError::File { .. }));
        assert!(err.to_string().contains("b.gz"));
    }

    #[test]
    fn nested_files_are_collected_in_path_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("2020-03");
        std::fs::create_dir_all(nested.join("day-04")).expect("mkdir");
        write_frames(&dir.path().join("a.gz"), &vec![json!({"id": 1})]).expect("write");
        write_frames(&nested.join("b.gz"), &vec![json!({"id": 2})]).expect("write");
        write_frames(&nested.join("day-04").join("c.gz"), &vec![json!({"id": 3})]).expect("write");

        let files = collect_files(dir.path()).expect("collect");
        assert_eq!(files.len(), 3);
        assert!(files[0].ends_with("2020-03/b.gz"));
        assert!(files[1].ends_with("2020-03/day-04/c.gz"));
        assert!(files[2].ends_with("a.gz"));
    }

    #[test]
    fn missing_directory_is_an_error() {
        assert!(collect_files(Path::new("/nonexistent/threadloom")).is_err());
    }
}
