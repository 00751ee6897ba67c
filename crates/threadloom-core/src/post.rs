//! # Post Model
//!
//! A [`Post`] is one entry of the registry: either a concrete post built from
//! a record, or a placeholder standing in for a thread-source whose record
//! has not arrived yet.
//!
//! Links between posts are ids, never references. Parents are held in the
//! kind-specific [`Parents`] variant; children in a per-kind [`ChildIndex`].
//! Resolving either direction goes through the registry.

use crate::classify::References;
use crate::record::Record;
use crate::{PostId, PostKind, PostState, ThreadError, UserId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// PARENTS
// =============================================================================

/// Kind-specific parent links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Parents {
    /// Stand-in for a forward-referenced thread-source. Has no parent.
    Placeholder,
    Original,
    Retweet { source: PostId },
    Quote { quoted: PostId },
    Reply { target: PostId },
    QuotedReply { target: PostId, quoted: PostId },
    QuotedRetweet { source: PostId, quoted: PostId },
}

impl Parents {
    /// Build the parent links for record `id` from its references.
    pub fn from_references(id: PostId, refs: &References) -> Result<Self, ThreadError> {
        let parents = match (refs.retweet_source, refs.quoted, refs.reply_target) {
            (None, None, None) => Parents::Original,
            (Some(source), None, None) => Parents::Retweet { source },
            (None, Some(quoted), None) => Parents::Quote { quoted },
            (None, None, Some(target)) => Parents::Reply { target },
            (None, Some(quoted), Some(target)) => Parents::QuotedReply { target, quoted },
            (Some(source), Some(quoted), None) => Parents::QuotedRetweet { source, quoted },
            (Some(_), quoted, Some(_)) => {
                return Err(ThreadError::Unclassifiable {
                    id,
                    retweet: true,
                    quote: quoted.is_some(),
                    reply: true,
                });
            }
        };
        if parents.ids().any(|parent| parent == id) {
            return Err(ThreadError::SelfReference(id));
        }
        Ok(parents)
    }

    /// The structural kind, or `None` for a placeholder.
    #[must_use]
    pub const fn kind(&self) -> Option<PostKind> {
        match self {
            Parents::Placeholder => None,
            Parents::Original => Some(PostKind::Original),
            Parents::Retweet { .. } => Some(PostKind::Retweet),
            Parents::Quote { .. } => Some(PostKind::Quote),
            Parents::Reply { .. } => Some(PostKind::Reply),
            Parents::QuotedReply { .. } => Some(PostKind::QuotedReply),
            Parents::QuotedRetweet { .. } => Some(PostKind::QuotedRetweet),
        }
    }

    /// Parent ids, in field order. A quoted-reply whose target and quoted
    /// post coincide yields the id twice.
    pub fn ids(&self) -> impl Iterator<Item = PostId> {
        let (first, second) = match *self {
            Parents::Placeholder | Parents::Original => (None, None),
            Parents::Retweet { source } => (Some(source), None),
            Parents::Quote { quoted } => (Some(quoted), None),
            Parents::Reply { target } => (Some(target), None),
            Parents::QuotedReply { target, quoted } => (Some(target), Some(quoted)),
            Parents::QuotedRetweet { source, quoted } => (Some(source), Some(quoted)),
        };
        first.into_iter().chain(second)
    }

    /// Whether `id` is one of the parents.
    #[must_use]
    pub fn names(&self, id: PostId) -> bool {
        self.ids().any(|parent| parent == id)
    }
}

// =============================================================================
// CHILD INDEX
// =============================================================================

/// Children of a thread-source, grouped by the child's kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ChildIndex {
    by_kind: BTreeMap<PostKind, BTreeSet<PostId>>,
}

impl ChildIndex {
    /// Record a child. Returns `false` if it was already present.
    pub fn insert(&mut self, kind: PostKind, child: PostId) -> bool {
        self.by_kind.entry(kind).or_default().insert(child)
    }

    /// Children of one kind, in id order.
    pub fn of(&self, kind: PostKind) -> impl Iterator<Item = PostId> + '_ {
        self.by_kind.get(&kind).into_iter().flatten().copied()
    }

    /// All children with their kinds, grouped by kind.
    pub fn iter(&self) -> impl Iterator<Item = (PostKind, PostId)> + '_ {
        self.by_kind
            .iter()
            .flat_map(|(kind, ids)| ids.iter().map(move |id| (*kind, *id)))
    }

    /// Whether `child` is indexed under any kind.
    #[must_use]
    pub fn contains(&self, child: PostId) -> bool {
        self.by_kind.values().any(|ids| ids.contains(&child))
    }

    /// Total number of children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_kind.values().map(BTreeSet::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_kind.values().all(BTreeSet::is_empty)
    }

    /// Move every entry of `other` into this index.
    pub fn absorb(&mut self, other: ChildIndex) {
        for (kind, ids) in other.by_kind {
            self.by_kind.entry(kind).or_default().extend(ids);
        }
    }
}

// =============================================================================
// POST
// =============================================================================

/// A registry entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    id: PostId,
    /// The originally discovered record. `None` marks a placeholder.
    raw: Option<Record>,
    /// A re-fetched version of the record.
    refreshed: Option<Record>,
    author: Option<UserId>,
    state: PostState,
    parents: Parents,
    children: ChildIndex,
}

impl Post {
    /// Create a placeholder for a referenced but not yet seen post.
    #[must_use]
    pub fn placeholder(id: PostId) -> Self {
        Self {
            id,
            raw: None,
            refreshed: None,
            author: None,
            state: PostState::Unknown,
            parents: Parents::Placeholder,
            children: ChildIndex::default(),
        }
    }

    /// Build a concrete post from its record.
    pub fn from_record(record: Record) -> Result<Self, ThreadError> {
        let id = record.id()?;
        let parents = Parents::from_references(id, &References::of(&record)?)?;
        let author = record.author()?;
        Ok(Self {
            id,
            raw: Some(record),
            refreshed: None,
            author,
            state: PostState::Unknown,
            parents,
            children: ChildIndex::default(),
        })
    }

    #[must_use]
    pub fn id(&self) -> PostId {
        self.id
    }

    /// The structural kind, or `None` for a placeholder.
    #[must_use]
    pub fn kind(&self) -> Option<PostKind> {
        self.parents.kind()
    }

    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.raw.is_none()
    }

    /// Whether other posts may reference this one. Placeholders only ever
    /// stand in for thread-sources.
    #[must_use]
    pub fn accepts_children(&self) -> bool {
        self.kind().is_none_or(PostKind::is_thread_source)
    }

    #[must_use]
    pub fn raw(&self) -> Option<&Record> {
        self.raw.as_ref()
    }

    #[must_use]
    pub fn refreshed(&self) -> Option<&Record> {
        self.refreshed.as_ref()
    }

    /// The record to read current content from: the refreshed version when
    /// there is one, the raw record otherwise.
    #[must_use]
    pub fn latest(&self) -> Option<&Record> {
        self.refreshed.as_ref().or(self.raw.as_ref())
    }

    /// Author id; `None` for placeholders and records without a `user` field.
    #[must_use]
    pub fn author(&self) -> Option<UserId> {
        self.author
    }

    #[must_use]
    pub fn state(&self) -> PostState {
        self.state
    }

    #[must_use]
    pub fn parents(&self) -> &Parents {
        &self.parents
    }

    #[must_use]
    pub fn children(&self) -> &ChildIndex {
        &self.children
    }

    pub(crate) fn set_state(&mut self, state: PostState) {
        self.state = state;
    }

    /// Index a child under this post.
    pub(crate) fn add_child(&mut self, kind: PostKind, child: PostId) -> Result<(), ThreadError> {
        match self.kind() {
            Some(own) if !own.is_thread_source() => Err(ThreadError::NotThreadSource {
                child,
                parent: self.id,
                kind: own,
            }),
            _ => {
                self.children.insert(kind, child);
                Ok(())
            }
        }
    }

    /// Hand the child index over, leaving this post childless.
    pub(crate) fn take_children(&mut self) -> ChildIndex {
        std::mem::take(&mut self.children)
    }

    pub(crate) fn absorb_children(&mut self, children: ChildIndex) {
        self.children.absorb(children);
    }

    /// Attach the re-fetched version of this post.
    pub(crate) fn attach_refreshed(&mut self, record: Record) -> Result<(), ThreadError> {
        if self.is_placeholder() {
            return Err(ThreadError::RefreshRejected {
                id: self.id,
                reason: "post is a placeholder",
            });
        }
        if self.refreshed.is_some() {
            return Err(ThreadError::RefreshRejected {
                id: self.id,
                reason: "post already has a refreshed record",
            });
        }
        match (self.author, record.author()?) {
            (Some(author), Some(embedded)) if author != embedded => {
                return Err(ThreadError::AuthorMismatch {
                    post: self.id,
                    author,
                    embedded,
                });
            }
            (None, Some(embedded)) => self.author = Some(embedded),
            _ => {}
        }
        self.refreshed = Some(record);
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
