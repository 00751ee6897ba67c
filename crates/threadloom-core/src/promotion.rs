//! # Promotion Engine
//!
//! Replaces a placeholder by the concrete post whose record has finally
//! arrived. The children accumulated by the placeholder move to the concrete
//! post unchanged, so the resulting registry is the same as if the parent had
//! been stored first.
//!
//! Promotion is one-way: once an id holds a concrete post it is never demoted
//! and never promoted again.

use crate::post::Post;
use crate::registry::{Registry, concrete_kind};
use crate::{PostId, ThreadError};
use tracing::debug;

impl Registry {
    /// Promote the placeholder `id` to `post`.
    ///
    /// Preconditions, all checked before anything changes:
    /// - `id` is currently held by a placeholder and `post` carries that id;
    /// - a placeholder with children is only promoted to a thread-source kind;
    /// - every accumulated child still names `id` among its parents;
    /// - every parent of `post` resolves to an entry that accepts children.
    pub fn promote(&mut self, id: PostId, post: Post) -> Result<(), ThreadError> {
        let kind = concrete_kind(&post)?;
        if post.id() != id {
            return Err(ThreadError::MalformedRecord(format!(
                "cannot promote placeholder {} with post {}",
                id,
                post.id()
            )));
        }
        let placeholder = self
            .placeholders
            .get(&id)
            .ok_or(ThreadError::NotPlaceholder(id))?;

        if !placeholder.children().is_empty() && !kind.is_thread_source() {
            return Err(ThreadError::LeafPromotion { id, kind });
        }
        for (_, child) in placeholder.children().iter() {
            let linked = self
                .lookup(child)
                .is_some_and(|entry| entry.parents().names(id));
            if !linked {
                return Err(ThreadError::UnlinkedChild { parent: id, child });
            }
        }
        self.check_parents_resolve(&post)?;

        let mut placeholder = self
            .placeholders
            .remove(&id)
            .ok_or(ThreadError::NotPlaceholder(id))?;
        let children = placeholder.take_children();
        debug!(
            id = id.0,
            kind = kind.name(),
            children = children.len(),
            "promoting placeholder"
        );

        let mut post = post;
        post.absorb_children(children);
        self.link_to_parents(&post, kind)?;
        self.posts.entry(kind).or_default().insert(id, post);
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::post::Post;
    use crate::record::Record;
    use crate::registry::{Registry, Slot, Stored};
    use crate::{PostId, PostKind, ThreadError};
    use serde_json::{Value, json};

    fn record(value: Value) -> Record {
        Record::from_value(value).expect("object")
    }

    fn post(value: Value) -> Post {
        Post::from_record(record(value)).expect("post")
    }

    #[test]
    fn promotion_keeps_children() {
        let mut registry = Registry::new();
        registry
            .store(record(json!({"id": 2, "in_reply_to_status_id": 1})))
            .expect("reply");
        registry
            .store(record(json!({"id": 3, "quoted_status_id": 1})))
            .expect("quote");

        let stored = registry.store(record(json!({"id": 1}))).expect("original");
        assert_eq!(stored, Stored::Promoted(PostId(1)));

        let original = registry.lookup(PostId(1)).expect("promoted");
        assert_eq!(original.kind(), Some(PostKind::Original));
        assert_eq!(original.children().len(), 2);
        assert_eq!(
            original.children().of(PostKind::Quote).collect::<Vec<_>>(),
            vec![PostId(3)]
        );
        assert_eq!(registry.placeholders().count(), 0);
    }

    #[test]
    fn promoting_a_concrete_post_fails() {
        let mut registry = Registry::new();
        registry.store(record(json!({"id": 1}))).expect("original");
        let err = registry
            .promote(PostId(1), post(json!({"id": 1})))
            .expect_err("not a placeholder");
        assert!(matches!(err, ThreadError::NotPlaceholder(PostId(1))));
    }

    #[test]
    fn placeholder_with_children_cannot_become_a_retweet() {
        let mut registry = Registry::new();
        registry
            .store(record(json!({"id": 2, "in_reply_to_status_id": 1})))
            .expect("reply");
        registry.store(record(json!({"id": 9}))).expect("source");

        let err = registry
            .store(record(json!({"id": 1, "retweeted_status": 9})))
            .expect_err("leaf promotion");
        assert!(matches!(
            err,
            ThreadError::LeafPromotion {
                id: PostId(1),
                kind: PostKind::Retweet
            }
        ));
        assert_eq!(registry.slot(PostId(1)), Slot::Placeholder);
        assert!(
            registry
                .lookup(PostId(9))
                .is_some_and(|p| p.children().is_empty())
        );
    }

    #[test]
    fn childless_placeholder_may_become_any_kind() {
        let mut registry = Registry::new();
        registry.ensure_placeholder(PostId(1)).expect("placeholder");
        registry.store(record(json!({"id": 9}))).expect("source");

        registry
            .promote(PostId(1), post(json!({"id": 1, "retweeted_status": 9})))
            .expect("promote");
        assert_eq!(registry.slot(PostId(1)), Slot::Occupied(PostKind::Retweet));
        assert!(
            registry
                .lookup(PostId(9))
                .is_some_and(|p| p.children().contains(PostId(1)))
        );
    }

    #[test]
    fn promotion_rejects_mismatched_id() {
        let mut registry = Registry::new();
        registry.ensure_placeholder(PostId(1)).expect("placeholder");
        assert!(
            registry
                .promote(PostId(1), post(json!({"id": 2})))
                .is_err()
        );
        assert_eq!(registry.slot(PostId(1)), Slot::Placeholder);
    }
}
