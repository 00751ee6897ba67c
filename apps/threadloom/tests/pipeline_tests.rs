//! Integration tests for the ingestion pipeline.
//!
//! Every test builds a dataset of record stream files in a temporary
//! directory and loads it through the public entry points.

#![allow(clippy::unwrap_used, clippy::panic)]

use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use threadloom::ingest::{self, load_dataset};
use threadloom::{AppError, Config};
use threadloom_core::{
    PostId, PostKind, PostState, Slot, ThreadError, UserId, UserState, read_snapshot,
    write_frames,
};

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

const CREATED: &str = "Wed Mar 04 21:43:11 +0000 2020";
const REFETCHED: &str = "Thu Mar 05 08:00:00 +0000 2020";

fn config() -> Config {
    Config {
        keywords: Vec::new(),
        workers: 2,
        exclude: Vec::new(),
    }
}

fn write(dir: &Path, name: &str, documents: &[Value]) {
    fs::create_dir_all(dir).unwrap();
    write_frames(&dir.join(name), documents).unwrap();
}

fn original(id: i64, author: i64, text: &str) -> Value {
    json!({
        "id": id,
        "full_text": text,
        "created_at": CREATED,
        "user": {"id": author, "screen_name": format!("user{author}")}
    })
}

/// A dataset exercising every phase:
///
/// - initial: original 1, a retweet of 1 embedding it, a reply to the
///   uncollected post 50
/// - enriched: post 50, a repeat of post 1, a quote of 1
/// - reloaded: a re-fetched post 1
/// - users: 10 and 11 reloaded, 12 deleted, 13 listed only
fn build_dataset(root: &Path) {
    write(
        &root.join("initial"),
        "part-0.gz",
        &[
            original(1, 10, "5g is here"),
            json!({
                "id": 2,
                "created_at": CREATED,
                "retweeted_status": original(1, 10, "5g is here"),
                "user": {"id": 11}
            }),
            json!({
                "id": 3,
                "created_at": CREATED,
                "in_reply_to_status_id": 50,
                "user": {"id": 12}
            }),
        ],
    );
    write(
        &root.join("enriched"),
        "part-0.gz",
        &[
            original(50, 10, "what about 5g"),
            original(1, 10, "5g is here"),
            json!({"id": 4, "quoted_status_id": 1, "user": 13}),
        ],
    );
    write(
        &root.join("reloaded"),
        "part-0.gz",
        &[json!({
            "id": 1,
            "full_text": "5g is here (edited)",
            "created_at": REFETCHED,
            "user": {"id": 10, "screen_name": "renamed"}
        })],
    );

    let users = root.join("users");
    write(
        &users,
        "reloaded-users.gz",
        &[json!({"id": 10, "screen_name": "renamed"}), json!({"id": 11})],
    );
    write(&users, "deleted-users.gz", &[json!({"id": 12})]);
    fs::write(users.join("userList"), "10\n11\n12\n\n13\n").unwrap();
}

// =============================================================================
// FOUR-PHASE LOAD
// =============================================================================

#[tokio::test]
async fn full_dataset_load() {
    let dir = tempfile::tempdir().unwrap();
    build_dataset(dir.path());

    let dataset = load_dataset(dir.path(), &config(), None).await.unwrap();
    let registry = &dataset.registry;

    assert_eq!(registry.slot(PostId(1)), Slot::Occupied(PostKind::Original));
    assert_eq!(registry.slot(PostId(2)), Slot::Occupied(PostKind::Retweet));
    assert_eq!(registry.slot(PostId(3)), Slot::Occupied(PostKind::Reply));
    assert_eq!(registry.slot(PostId(4)), Slot::Occupied(PostKind::Quote));
    assert_eq!(registry.slot(PostId(50)), Slot::Occupied(PostKind::Original));
    assert_eq!(registry.placeholders().count(), 0);

    let initial = dataset.report.initial.clone().unwrap();
    assert_eq!(initial.documents, 3);
    assert_eq!(initial.inserted, 3);
    assert_eq!(initial.known, 1);

    let enriched = dataset.report.enriched.clone().unwrap();
    assert_eq!(enriched.promoted, 1);
    assert_eq!(enriched.inserted, 1);
    assert_eq!(enriched.known, 1);

    assert_eq!(dataset.report.reloaded.as_ref().map(|r| r.refreshed), Some(1));
}

#[tokio::test]
async fn phases_tag_lifecycle_states() {
    let dir = tempfile::tempdir().unwrap();
    build_dataset(dir.path());

    let dataset = load_dataset(dir.path(), &config(), None).await.unwrap();
    let state = |id| dataset.registry.lookup(PostId(id)).unwrap().state();

    assert_eq!(state(1), PostState::IsSource);
    assert_eq!(state(2), PostState::IsSource);
    assert_eq!(state(3), PostState::IsSource);
    assert_eq!(state(50), PostState::Enriched);
    assert_eq!(state(4), PostState::Enriched);
}

#[tokio::test]
async fn promoted_placeholder_keeps_its_reply() {
    let dir = tempfile::tempdir().unwrap();
    build_dataset(dir.path());

    let dataset = load_dataset(dir.path(), &config(), None).await.unwrap();
    let post = dataset.registry.lookup(PostId(50)).unwrap();

    assert!(!post.is_placeholder());
    assert_eq!(post.children().of(PostKind::Reply).collect::<Vec<_>>(), vec![PostId(3)]);
}

#[tokio::test]
async fn reloaded_version_is_attached() {
    let dir = tempfile::tempdir().unwrap();
    build_dataset(dir.path());

    let dataset = load_dataset(dir.path(), &config(), None).await.unwrap();
    let post = dataset.registry.lookup(PostId(1)).unwrap();

    assert_eq!(post.raw().and_then(|r| r.text()), Some("5g is here"));
    assert_eq!(post.latest().and_then(|r| r.text()), Some("5g is here (edited)"));
}

#[tokio::test]
async fn users_are_loaded_and_reconciled() {
    let dir = tempfile::tempdir().unwrap();
    build_dataset(dir.path());

    let dataset = load_dataset(dir.path(), &config(), None).await.unwrap();
    let users = &dataset.users;

    assert_eq!(users.len(), 4);
    assert_eq!(users.get(UserId(10)).unwrap().state(), UserState::Exists);
    assert_eq!(users.get(UserId(11)).unwrap().state(), UserState::Exists);
    assert_eq!(users.get(UserId(12)).unwrap().state(), UserState::Deleted);
    assert_eq!(users.get(UserId(13)).unwrap().state(), UserState::NotAvailable);

    let author = users.get(UserId(10)).unwrap();
    assert_eq!(author.posts(PostKind::Original).collect::<Vec<_>>(), vec![PostId(1), PostId(50)]);
    assert_eq!(users.get(UserId(13)).unwrap().post_count(), 1);

    let report = dataset.report.users.clone().unwrap();
    assert_eq!(report.listed, 4);
    assert_eq!(report.reloaded, 2);
    assert_eq!(report.deleted, 1);
    assert_eq!(report.unavailable, 1);
    assert_eq!(report.reconcile.posts_attached, 5);
    assert_eq!(report.reconcile.anonymous_posts, 0);
}

#[tokio::test]
async fn unlisted_author_is_a_fault() {
    let dir = tempfile::tempdir().unwrap();
    build_dataset(dir.path());
    fs::write(dir.path().join("users").join("userList"), "10\n11\n12\n").unwrap();

    let err = load_dataset(dir.path(), &config(), None).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Thread(ThreadError::MissingAuthor {
            author: UserId(13),
            ..
        })
    ));
}

#[tokio::test]
async fn missing_phases_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("initial"), "a.gz", &[original(1, 10, "hello")]);

    let dataset = load_dataset(dir.path(), &config(), None).await.unwrap();

    assert!(dataset.report.initial.is_some());
    assert!(dataset.report.enriched.is_none());
    assert!(dataset.report.reloaded.is_none());
    assert!(dataset.report.users.is_none());
    assert!(dataset.users.is_empty());
    assert_eq!(dataset.registry.len(), 1);
}

#[tokio::test]
async fn missing_dataset_directory_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_dataset(&dir.path().join("absent"), &config(), None).await;
    assert!(matches!(result, Err(AppError::Io(_))));
}

#[tokio::test]
async fn conflicting_kind_names_the_file() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("initial"), "a.gz", &[original(1, 10, "hello")]);
    write(
        &dir.path().join("enriched"),
        "b.gz",
        &[json!({"id": 1, "quoted_status_id": 7})],
    );

    let err = load_dataset(dir.path(), &config(), None).await.unwrap_err();
    match err {
        AppError::File { path, source } => {
            assert!(path.ends_with("b.gz"));
            assert!(matches!(source, ThreadError::DuplicatePost { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn refresh_of_unknown_post_fails() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("initial"), "a.gz", &[original(1, 10, "hello")]);
    write(&dir.path().join("reloaded"), "r.gz", &[json!({"id": 2})]);

    let err = load_dataset(dir.path(), &config(), None).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::File {
            source: ThreadError::PostNotFound(PostId(2)),
            ..
        }
    ));
}

// =============================================================================
// CHECKPOINTS
// =============================================================================

#[tokio::test]
async fn checkpoint_restores_the_loaded_registry() {
    let dir = tempfile::tempdir().unwrap();
    build_dataset(dir.path());
    let snapshot = tempfile::tempdir().unwrap();

    let dataset = load_dataset(dir.path(), &config(), Some(snapshot.path()))
        .await
        .unwrap();
    let restored = read_snapshot(snapshot.path()).unwrap();

    assert_eq!(restored, dataset.registry);
    assert_eq!(
        restored.lookup(PostId(50)).unwrap().state(),
        PostState::Enriched
    );
}

// =============================================================================
// KEYWORD INGEST
// =============================================================================

#[tokio::test]
async fn ingest_keeps_matching_documents() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "a.gz",
        &[
            original(1, 10, "the 5G rollout"),
            original(2, 10, "weather today"),
        ],
    );
    write(
        dir.path(),
        "b.gz",
        &[json!({
            "id": 3,
            "full_text": "join the #5G protest tonight",
            "in_reply_to_status_id": 2
        })],
    );
    let config = Config {
        keywords: vec!["5g".to_string()],
        ..config()
    };

    let (registry, report) = ingest::ingest(dir.path(), &config, None).await.unwrap();

    assert_eq!(report.files, 2);
    assert_eq!(report.documents, 3);
    assert_eq!(report.filtered, 1);
    assert_eq!(registry.slot(PostId(1)), Slot::Occupied(PostKind::Original));
    assert_eq!(registry.slot(PostId(2)), Slot::Placeholder);
    assert_eq!(registry.slot(PostId(3)), Slot::Occupied(PostKind::Reply));
    assert_eq!(registry.lookup(PostId(3)).unwrap().state(), PostState::IsSource);
}

#[tokio::test]
async fn ingest_walks_nested_directories() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.gz", &[original(1, 10, "5g top level")]);
    write(
        &dir.path().join("2020-03"),
        "b.gz",
        &[json!({"id": 2, "full_text": "5g nested", "quoted_status_id": 1})],
    );

    let (registry, report) = ingest::ingest(dir.path(), &config(), None).await.unwrap();

    assert_eq!(report.files, 2);
    assert_eq!(report.documents, 2);
    assert_eq!(registry.slot(PostId(1)), Slot::Occupied(PostKind::Original));
    assert_eq!(registry.slot(PostId(2)), Slot::Occupied(PostKind::Quote));
    assert_eq!(
        registry.lookup(PostId(1)).unwrap().children().of(PostKind::Quote).collect::<Vec<_>>(),
        vec![PostId(2)]
    );
}

#[tokio::test]
async fn repeat_with_other_parents_keeps_the_first_copy() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "a.gz",
        &[
            original(1, 10, "5g"),
            original(2, 10, "5g too"),
            json!({"id": 3, "in_reply_to_status_id": 1}),
            json!({"id": 3, "in_reply_to_status_id": 2}),
        ],
    );

    let (registry, report) = ingest::ingest(dir.path(), &config(), None).await.unwrap();

    assert_eq!(report.inserted, 3);
    assert_eq!(report.known, 1);
    let reply = registry.lookup(PostId(3)).unwrap();
    assert_eq!(reply.parents().ids().collect::<Vec<_>>(), vec![PostId(1)]);
    assert!(registry.lookup(PostId(2)).unwrap().children().is_empty());
}

#[tokio::test]
async fn excluded_ids_are_never_stored() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "a.gz",
        &[original(1, 10, "one"), original(7, 10, "seven")],
    );
    let config = Config {
        exclude: vec![7],
        ..config()
    };
    let snapshot = tempfile::tempdir().unwrap();

    let (registry, report) = ingest::ingest(dir.path(), &config, Some(snapshot.path()))
        .await
        .unwrap();

    assert_eq!(report.excluded, 1);
    assert!(!registry.contains(PostId(7)));
    assert!(read_snapshot(snapshot.path()).unwrap().exclusions().contains(&PostId(7)));
}
