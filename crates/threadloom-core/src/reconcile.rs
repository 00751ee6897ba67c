//! # User Reconciliation
//!
//! Attaches every concrete post to its author once all posts are stored.

use crate::registry::Registry;
use crate::user::UserRegistry;
use crate::{PostId, ThreadError, UserId};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Summary of a reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Posts registered under their author.
    pub posts_attached: usize,
    /// Concrete posts without a known author.
    pub anonymous_posts: usize,
    /// Profile snapshots newly added to users.
    pub snapshots_added: usize,
    /// Records embedding a profile but lacking `created_at`; not kept.
    pub undated_profiles: usize,
    /// Users that end up with no snapshot at all.
    pub users_without_snapshots: usize,
}

/// Link every concrete post to its author.
///
/// For each post with a known author, the post's raw record (and refreshed
/// record, if any) is kept as a profile snapshot when it embeds the author's
/// `user` document; the snapshot is keyed by the record's `created_at` and the
/// post id. A refreshed record sharing the raw record's timestamp replaces it.
/// Records with a profile but no `created_at` are counted and skipped. The
/// post is then registered under the author's per-kind map.
///
/// Every author must already be present in `users`; a missing one is a
/// [`ThreadError::MissingAuthor`] fault. An embedded profile naming another
/// user is a [`ThreadError::AuthorMismatch`] fault. Running the pass twice is
/// a no-op the second time.
pub fn reconcile(posts: &Registry, users: &mut UserRegistry) -> Result<ReconcileReport, ThreadError> {
    let mut report = ReconcileReport::default();

    for post in posts.concrete() {
        let (Some(author), Some(kind)) = (post.author(), post.kind()) else {
            report.anonymous_posts += 1;
            continue;
        };
        let user = users
            .get_mut(author)
            .ok_or(ThreadError::MissingAuthor {
                post: post.id(),
                author,
            })?;

        let mut dated = BTreeMap::new();
        for version in post.raw().into_iter().chain(post.refreshed()) {
            if version.author_profile().is_none() {
                continue;
            }
            check_profile_owner(post.id(), author, version.author()?)?;
            match version.created_at()? {
                Some(created_at) => {
                    dated.insert(created_at, version);
                }
                None => {
                    warn!(
                        post = post.id().0,
                        author = author.0,
                        "profile without created_at skipped"
                    );
                    report.undated_profiles += 1;
                }
            }
        }
        for (created_at, version) in dated {
            if user.add_version(created_at, post.id(), version.clone()) {
                report.snapshots_added += 1;
            }
        }
        user.add_post(kind, post.id());
        report.posts_attached += 1;
    }

    report.users_without_snapshots = users.iter().filter(|u| u.versions().is_empty()).count();
    info!(
        posts = report.posts_attached,
        snapshots = report.snapshots_added,
        undated = report.undated_profiles,
        users_without_snapshots = report.users_without_snapshots,
        "users reconciled"
    );
    Ok(report)
}

fn check_profile_owner(post: PostId, author: UserId, embedded: Option<UserId>) -> Result<(), ThreadError> {
    match embedded {
        Some(embedded) if embedded != author => Err(ThreadError::AuthorMismatch {
            post,
            author,
            embedded,
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use crate::user::User;
    use crate::{PostId, PostKind, UserId};
    use serde_json::{Value, json};

    fn record(value: Value) -> Record {
        Record::from_value(value).expect("object")
    }

    #[test]
    fn missing_author_is_a_fault() {
        let mut posts = Registry::new();
        posts.store(record(json!({"id": 1, "user": 5}))).expect("store");
        let mut users = UserRegistry::new();

        let err = reconcile(&posts, &mut users).expect_err("author missing");
        assert!(matches!(
            err,
            ThreadError::MissingAuthor {
                post: PostId(1),
                author: UserId(5)
            }
        ));
    }

    #[test]
    fn posts_are_filed_per_kind() {
        let mut posts = Registry::new();
        posts
            .store(record(json!({
                "id": 1,
                "created_at": "Wed Mar 04 21:43:11 +0000 2020",
                "user": {"id": 5, "screen_name": "x"}
            })))
            .expect("original");
        posts
            .store(record(json!({"id": 2, "in_reply_to_status_id": 1, "user": 5})))
            .expect("reply");
        posts.store(record(json!({"id": 3}))).expect("anonymous");

        let mut users = UserRegistry::new();
        users.insert(User::unavailable(UserId(5)));

        let report = reconcile(&posts, &mut users).expect("reconcile");
        assert_eq!(report.posts_attached, 2);
        assert_eq!(report.anonymous_posts, 1);
        assert_eq!(report.snapshots_added, 1);
        assert_eq!(report.users_without_snapshots, 0);

        let user = users.get(UserId(5)).expect("user");
        assert_eq!(user.posts(PostKind::Original).collect::<Vec<_>>(), vec![PostId(1)]);
        assert_eq!(user.posts(PostKind::Reply).collect::<Vec<_>>(), vec![PostId(2)]);

        let again = reconcile(&posts, &mut users).expect("second pass");
        assert_eq!(again.snapshots_added, 0);
        assert_eq!(users.get(UserId(5)).map(User::post_count), Some(2));
    }

    #[test]
    fn undated_profile_is_counted() {
        let mut posts = Registry::new();
        posts
            .store(record(json!({"id": 1, "user": {"id": 7, "screen_name": "x"}})))
            .expect("original");
        let mut users = UserRegistry::new();
        users.insert(User::unavailable(UserId(7)));

        let report = reconcile(&posts, &mut users).expect("reconcile");
        assert_eq!(report.posts_attached, 1);
        assert_eq!(report.snapshots_added, 0);
        assert_eq!(report.undated_profiles, 1);
        assert_eq!(report.users_without_snapshots, 1);
    }

    #[test]
    fn same_second_posts_keep_both_profiles() {
        let mut posts = Registry::new();
        for (id, name) in [(1, "old"), (2, "new")] {
            posts
                .store(record(json!({
                    "id": id,
                    "created_at": "Wed Mar 04 21:43:11 +0000 2020",
                    "user": {"id": 7, "screen_name": name}
                })))
                .expect("original");
        }
        let mut users = UserRegistry::new();
        users.insert(User::unavailable(UserId(7)));

        let report = reconcile(&posts, &mut users).expect("reconcile");
        assert_eq!(report.posts_attached, 2);
        assert_eq!(report.snapshots_added, 2);

        let user = users.get(UserId(7)).expect("user");
        assert_eq!(user.versions().len(), 2);
        assert_eq!(
            user.profile().and_then(|p| p.get("screen_name")),
            Some(&json!("new"))
        );
        assert_eq!(reconcile(&posts, &mut users).expect("again").snapshots_added, 0);
    }

    #[test]
    fn profile_of_another_user_is_a_fault() {
        assert!(check_profile_owner(PostId(1), UserId(7), Some(UserId(7))).is_ok());
        assert!(matches!(
            check_profile_owner(PostId(1), UserId(7), Some(UserId(8))),
            Err(ThreadError::AuthorMismatch {
                post: PostId(1),
                author: UserId(7),
                embedded: UserId(8)
            })
        ));
    }
}
