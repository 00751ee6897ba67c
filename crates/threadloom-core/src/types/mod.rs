//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the reconciliation engine:
//! - Post and user identifiers (`PostId`, `UserId`)
//! - The six structural kinds (`PostKind`) and lifecycle states
//! - Error types (`ThreadError`)
//!
//! ## Determinism Guarantees
//!
//! All identifier and kind types implement `Ord` so they can key
//! `BTreeMap`/`BTreeSet` collections with a stable iteration order.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifier of a post, taken from the record's `id` field or from a
/// reference field when the post is created as a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PostId(pub i64);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a user (post author).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// POST KIND
// =============================================================================

/// The six mutually exclusive structural kinds a record is classified into.
///
/// | Kind | retweet-source | quoted-post | reply-target |
/// |---|---|---|---|
/// | Original | - | - | - |
/// | Retweet | x | - | - |
/// | Quote | - | x | - |
/// | Reply | - | - | x |
/// | QuotedReply | - | x | x |
/// | QuotedRetweet | x | x | - |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PostKind {
    Original,
    Retweet,
    Quote,
    Reply,
    QuotedReply,
    QuotedRetweet,
}

impl PostKind {
    /// All kinds, in registry probe order.
    pub const ALL: [PostKind; 6] = [
        PostKind::Original,
        PostKind::Retweet,
        PostKind::Quote,
        PostKind::Reply,
        PostKind::QuotedReply,
        PostKind::QuotedRetweet,
    ];

    /// Whether posts of this kind can be referenced by other posts and
    /// therefore own a child index.
    #[must_use]
    pub const fn is_thread_source(self) -> bool {
        matches!(
            self,
            PostKind::Original | PostKind::Quote | PostKind::Reply | PostKind::QuotedReply
        )
    }

    /// Stable lower-case name, used in logs and API output.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            PostKind::Original => "original",
            PostKind::Retweet => "retweet",
            PostKind::Quote => "quote",
            PostKind::Reply => "reply",
            PostKind::QuotedReply => "quoted_reply",
            PostKind::QuotedRetweet => "quoted_retweet",
        }
    }

    /// Snapshot file holding the raw records of this kind.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            PostKind::Original => "originals.gz",
            PostKind::Retweet => "retweets.gz",
            PostKind::Quote => "quotes.gz",
            PostKind::Reply => "replies.gz",
            PostKind::QuotedReply => "quoted_replies.gz",
            PostKind::QuotedRetweet => "quoted_retweets.gz",
        }
    }
}

impl fmt::Display for PostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// LIFECYCLE STATES
// =============================================================================

/// Which ingestion phase discovered a post.
///
/// The reconciliation core never sets this on its own; ingestion phases tag
/// the posts they store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum PostState {
    /// Part of the initial keyword-matched dataset.
    IsSource,
    /// Not yet attributed to a phase.
    #[default]
    Unknown,
    /// Discovered while reconstructing threads around the sources.
    Enriched,
}

/// Account status of a user at the time profiles were re-fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum UserState {
    Exists,
    #[default]
    Unknown,
    Deleted,
    NotAvailable,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised by the reconciliation engine.
///
/// Every variant is fatal for the load that produced it: the dataset is
/// assumed closed and internally consistent, so a fault means either a broken
/// schema assumption or an upstream data defect that needs manual inspection.
/// Registry state committed before the fault is not rolled back.
#[derive(Debug, Error)]
pub enum ThreadError {
    /// A record's reference fields match none of the six kinds.
    #[error(
        "record {id} has no structural kind (retweet: {retweet}, quote: {quote}, reply: {reply})"
    )]
    Unclassifiable {
        id: PostId,
        retweet: bool,
        quote: bool,
        reply: bool,
    },

    /// A record is missing a required field or holds a field of the wrong type.
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// A record references its own id.
    #[error("record {0} references itself")]
    SelfReference(PostId),

    /// A concrete post with this id is already stored.
    #[error("duplicate post {id}: already stored as {existing}, incoming {incoming}")]
    DuplicatePost {
        id: PostId,
        existing: PostKind,
        incoming: PostKind,
    },

    /// A plain insert hit a placeholder; the post must be promoted instead.
    #[error("post {0} is held by a placeholder and must be promoted")]
    PlaceholderOccupied(PostId),

    /// Promotion was requested for an id that is not a placeholder.
    #[error("post {0} is not a placeholder")]
    NotPlaceholder(PostId),

    /// A placeholder with children can only become a thread-source kind.
    #[error("placeholder {id} has children and cannot become a {kind}")]
    LeafPromotion { id: PostId, kind: PostKind },

    /// A child accumulated by a placeholder does not name it as a parent.
    #[error("child {child} of {parent} does not reference it")]
    UnlinkedChild { parent: PostId, child: PostId },

    /// A record references a post whose kind cannot have children.
    #[error("post {child} references {parent}, which is a {kind} and cannot have children")]
    NotThreadSource {
        child: PostId,
        parent: PostId,
        kind: PostKind,
    },

    /// A post of a leaf kind was asked to accept children.
    #[error("post {id} is a {kind} and cannot have children")]
    LeafPost { id: PostId, kind: PostKind },

    /// A record embeds a profile whose id differs from the post's author.
    #[error("post {post} embeds profile of user {embedded} but is authored by {author}")]
    AuthorMismatch {
        post: PostId,
        author: UserId,
        embedded: UserId,
    },

    /// A parent id does not resolve to any entry in the registry.
    #[error("post {post} references missing post {parent}")]
    DanglingReference { post: PostId, parent: PostId },

    /// A post names an author for which no user was loaded.
    #[error("post {post} references unknown author {author}")]
    MissingAuthor { post: PostId, author: UserId },

    /// The requested post does not exist.
    #[error("post not found: {0}")]
    PostNotFound(PostId),

    /// A refreshed version was attached to a post that cannot take one.
    #[error("cannot attach refreshed record to post {id}: {reason}")]
    RefreshRejected { id: PostId, reason: &'static str },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ThreadError {
    fn from(err: std::io::Error) -> Self {
        ThreadError::Io(err.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================
