//! # Record Classifier
//!
//! Assigns every record exactly one structural kind from the presence of its
//! three reference fields. Stateless.
//!
//! Of the eight presence combinations, six name a kind. A retweet that also
//! claims a reply target (with or without a quote) is contradictory and is
//! reported as [`ThreadError::Unclassifiable`]; it is never defaulted.

use crate::record::Record;
use crate::{PostId, PostKind, ThreadError};

/// Which of the three reference fields a record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordShape {
    pub retweet: bool,
    pub quote: bool,
    pub reply: bool,
}

impl RecordShape {
    /// Look the shape up in the kind table.
    #[must_use]
    pub const fn kind(self) -> Option<PostKind> {
        match (self.retweet, self.quote, self.reply) {
            (false, false, false) => Some(PostKind::Original),
            (true, false, false) => Some(PostKind::Retweet),
            (false, true, false) => Some(PostKind::Quote),
            (false, false, true) => Some(PostKind::Reply),
            (false, true, true) => Some(PostKind::QuotedReply),
            (true, true, false) => Some(PostKind::QuotedRetweet),
            (true, _, true) => None,
        }
    }
}

/// The reference ids named by a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct References {
    pub retweet_source: Option<PostId>,
    pub quoted: Option<PostId>,
    pub reply_target: Option<PostId>,
}

impl References {
    /// Read the three reference fields of a record.
    pub fn of(record: &Record) -> Result<Self, ThreadError> {
        Ok(Self {
            retweet_source: record.retweet_source()?,
            quoted: record.quoted_post()?,
            reply_target: record.reply_target()?,
        })
    }

    /// Presence flags of the references.
    #[must_use]
    pub const fn shape(&self) -> RecordShape {
        RecordShape {
            retweet: self.retweet_source.is_some(),
            quote: self.quoted.is_some(),
            reply: self.reply_target.is_some(),
        }
    }

    /// Classify the references of the record `id`.
    pub fn kind(&self, id: PostId) -> Result<PostKind, ThreadError> {
        let shape = self.shape();
        shape.kind().ok_or(ThreadError::Unclassifiable {
            id,
            retweet: shape.retweet,
            quote: shape.quote,
            reply: shape.reply,
        })
    }
}

/// Classify a record.
pub fn classify(record: &Record) -> Result<PostKind, ThreadError> {
    References::of(record)?.kind(record.id()?)
}

// =============================================================================
// TESTS
// =============================================================================
