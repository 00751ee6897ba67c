//! # Post Registry
//!
//! The single source of truth for every post known to a load.
//!
//! Concrete posts live in one collection per [`PostKind`]; forward-referenced
//! thread-sources live in a separate placeholder collection until their
//! record arrives and they are promoted (see [`crate::promotion`]). An id is
//! held by at most one entry across all seven collections.
//!
//! Every mutating operation takes `&mut Registry`: the registry has exactly
//! one writer for the duration of a load.

use crate::post::Post;
use crate::primitives::PROGRESS_INTERVAL;
use crate::record::{Record, flatten};
use crate::{PostId, PostKind, PostState, ThreadError};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

// =============================================================================
// RESULT TYPES
// =============================================================================

/// Occupancy of an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Vacant,
    Placeholder,
    Occupied(PostKind),
}

/// Outcome of a successful [`Registry::store`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stored {
    /// A new concrete post was added.
    Inserted(PostId),
    /// A placeholder was replaced by its concrete post.
    Promoted(PostId),
    /// The id is on the exclusion list; nothing changed.
    Excluded(PostId),
}

impl Stored {
    #[must_use]
    pub fn id(&self) -> PostId {
        match *self {
            Stored::Inserted(id) | Stored::Promoted(id) | Stored::Excluded(id) => id,
        }
    }
}

/// Entry counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub posts: BTreeMap<PostKind, usize>,
    pub placeholders: usize,
    /// Successful `store` calls since the registry was created.
    pub stored: u64,
    /// Records skipped because their id is excluded.
    pub excluded: u64,
}

impl RegistryStats {
    /// Number of concrete posts.
    #[must_use]
    pub fn concrete(&self) -> usize {
        self.posts.values().sum()
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Id-keyed index of all posts.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    /// Concrete posts per kind.
    pub(crate) posts: BTreeMap<PostKind, BTreeMap<PostId, Post>>,

    /// Forward-referenced thread-sources without a record yet.
    pub(crate) placeholders: BTreeMap<PostId, Post>,

    /// Ids whose records are known to be corrupt upstream.
    exclusions: BTreeSet<PostId>,

    stored: u64,
    excluded: u64,
}

/// Two registries are equal when they hold the same entries. Counters are
/// ignored.
impl PartialEq for Registry {
    fn eq(&self, other: &Self) -> bool {
        self.placeholders == other.placeholders
            && PostKind::ALL
                .iter()
                .all(|kind| self.collection(*kind).eq(other.collection(*kind)))
    }
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry that skips the given ids on `store`.
    #[must_use]
    pub fn with_exclusions(exclusions: impl IntoIterator<Item = PostId>) -> Self {
        Self {
            exclusions: exclusions.into_iter().collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn exclusions(&self) -> &BTreeSet<PostId> {
        &self.exclusions
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Find the entry for `id`: the kind collections in kind order, then the
    /// placeholders.
    #[must_use]
    pub fn lookup(&self, id: PostId) -> Option<&Post> {
        self.posts
            .values()
            .find_map(|collection| collection.get(&id))
            .or_else(|| self.placeholders.get(&id))
    }

    pub(crate) fn lookup_mut(&mut self, id: PostId) -> Option<&mut Post> {
        if self.placeholders.contains_key(&id) {
            return self.placeholders.get_mut(&id);
        }
        self.posts
            .values_mut()
            .find_map(|collection| collection.get_mut(&id))
    }

    /// Occupancy of `id`.
    #[must_use]
    pub fn slot(&self, id: PostId) -> Slot {
        match self.lookup(id) {
            None => Slot::Vacant,
            Some(post) => match post.kind() {
                None => Slot::Placeholder,
                Some(kind) => Slot::Occupied(kind),
            },
        }
    }

    #[must_use]
    pub fn contains(&self, id: PostId) -> bool {
        self.lookup(id).is_some()
    }

    /// Concrete posts of one kind, in id order.
    pub fn posts(&self, kind: PostKind) -> impl Iterator<Item = &Post> {
        self.collection(kind)
    }

    /// Placeholders, in id order.
    pub fn placeholders(&self) -> impl Iterator<Item = &Post> {
        self.placeholders.values()
    }

    /// All concrete posts, grouped by kind.
    pub fn concrete(&self) -> impl Iterator<Item = &Post> {
        self.posts.values().flat_map(BTreeMap::values)
    }

    /// Total number of entries, placeholders included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.posts.values().map(BTreeMap::len).sum::<usize>() + self.placeholders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            posts: PostKind::ALL
                .iter()
                .map(|kind| (*kind, self.collection(*kind).count()))
                .collect(),
            placeholders: self.placeholders.len(),
            stored: self.stored,
            excluded: self.excluded,
        }
    }

    fn collection(&self, kind: PostKind) -> impl Iterator<Item = &Post> {
        self.posts.get(&kind).into_iter().flat_map(BTreeMap::values)
    }

    // -------------------------------------------------------------------------
    // Insertion
    // -------------------------------------------------------------------------

    /// Add a concrete post to its kind collection and register it as a child
    /// of each parent.
    ///
    /// Fails if any entry already holds the id, or if a parent does not
    /// resolve to a thread-source or placeholder.
    pub fn insert(&mut self, post: Post) -> Result<(), ThreadError> {
        let kind = concrete_kind(&post)?;
        match self.slot(post.id()) {
            Slot::Vacant => {}
            Slot::Placeholder => return Err(ThreadError::PlaceholderOccupied(post.id())),
            Slot::Occupied(existing) => {
                return Err(ThreadError::DuplicatePost {
                    id: post.id(),
                    existing,
                    incoming: kind,
                });
            }
        }
        self.check_parents_resolve(&post)?;
        self.link_to_parents(&post, kind)?;
        self.posts.entry(kind).or_default().insert(post.id(), post);
        Ok(())
    }

    /// Make sure `id` can accept children: return the existing thread-source
    /// or placeholder, or create a placeholder when the id is vacant.
    pub fn ensure_placeholder(&mut self, id: PostId) -> Result<&Post, ThreadError> {
        if let Slot::Occupied(kind) = self.slot(id)
            && !kind.is_thread_source()
        {
            return Err(ThreadError::LeafPost { id, kind });
        }
        if !self.contains(id) {
            debug!(id = id.0, "creating placeholder");
            self.placeholders.insert(id, Post::placeholder(id));
        }
        self.lookup(id).ok_or(ThreadError::PostNotFound(id))
    }

    /// Classify a record and add it to the registry.
    ///
    /// Parents that are not known yet become placeholders. If the record's
    /// own id is held by a placeholder, the placeholder is promoted. Every
    /// precondition is checked before the registry is touched.
    pub fn store(&mut self, record: Record) -> Result<Stored, ThreadError> {
        let id = record.id()?;
        if self.exclusions.contains(&id) {
            debug!(id = id.0, "skipping excluded record");
            self.excluded += 1;
            return Ok(Stored::Excluded(id));
        }

        let post = Post::from_record(record)?;
        let kind = concrete_kind(&post)?;
        let promoting = match self.slot(id) {
            Slot::Vacant => false,
            Slot::Placeholder => true,
            Slot::Occupied(existing) => {
                return Err(ThreadError::DuplicatePost {
                    id,
                    existing,
                    incoming: kind,
                });
            }
        };
        if promoting
            && !kind.is_thread_source()
            && self.lookup(id).is_some_and(|p| !p.children().is_empty())
        {
            return Err(ThreadError::LeafPromotion { id, kind });
        }
        for parent in post.parents().ids() {
            if let Slot::Occupied(parent_kind) = self.slot(parent)
                && !parent_kind.is_thread_source()
            {
                return Err(ThreadError::NotThreadSource {
                    child: id,
                    parent,
                    kind: parent_kind,
                });
            }
        }

        for parent in post.parents().ids() {
            self.ensure_placeholder(parent)?;
        }
        let stored = if promoting {
            self.promote(id, post)?;
            Stored::Promoted(id)
        } else {
            self.insert(post)?;
            Stored::Inserted(id)
        };

        self.stored += 1;
        if self.stored % PROGRESS_INTERVAL == 0 {
            let stats = self.stats();
            info!(
                stored = self.stored,
                posts = stats.concrete(),
                placeholders = stats.placeholders,
                "registry progress"
            );
        }
        Ok(stored)
    }

    /// Flatten a raw API document and store every record it contains,
    /// innermost first.
    pub fn store_document(&mut self, document: Value) -> Result<Vec<Stored>, ThreadError> {
        flatten(document)?
            .into_iter()
            .map(|record| self.store(record))
            .collect()
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Set the lifecycle state of a concrete post.
    pub fn set_state(&mut self, id: PostId, state: PostState) -> Result<(), ThreadError> {
        let post = self
            .lookup_mut(id)
            .filter(|post| !post.is_placeholder())
            .ok_or(ThreadError::PostNotFound(id))?;
        post.set_state(state);
        Ok(())
    }

    /// Tag a post as part of the source dataset.
    pub fn mark_source(&mut self, id: PostId) -> Result<(), ThreadError> {
        self.set_state(id, PostState::IsSource)
    }

    /// Tag a post as discovered by enrichment, unless a phase already
    /// claimed it. Returns whether the state changed.
    pub fn mark_enriched(&mut self, id: PostId) -> Result<bool, ThreadError> {
        match self.lookup(id) {
            Some(post) if !post.is_placeholder() => {
                if post.state() != PostState::Unknown {
                    return Ok(false);
                }
                self.set_state(id, PostState::Enriched)?;
                Ok(true)
            }
            _ => Err(ThreadError::PostNotFound(id)),
        }
    }

    /// Attach a re-fetched version of an existing concrete post.
    pub fn attach_refreshed(&mut self, record: Record) -> Result<PostId, ThreadError> {
        let id = record.id()?;
        let post = self.lookup_mut(id).ok_or(ThreadError::PostNotFound(id))?;
        post.attach_refreshed(record)?;
        Ok(id)
    }

    // -------------------------------------------------------------------------
    // Linking
    // -------------------------------------------------------------------------

    /// Every parent of `post` must already be an entry that accepts children.
    pub(crate) fn check_parents_resolve(&self, post: &Post) -> Result<(), ThreadError> {
        for parent in post.parents().ids() {
            match self.lookup(parent) {
                None => {
                    return Err(ThreadError::DanglingReference {
                        post: post.id(),
                        parent,
                    });
                }
                Some(entry) => {
                    if let Some(kind) = entry.kind()
                        && !kind.is_thread_source()
                    {
                        return Err(ThreadError::NotThreadSource {
                            child: post.id(),
                            parent,
                            kind,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Index `post` in the child index of each of its parents.
    pub(crate) fn link_to_parents(&mut self, post: &Post, kind: PostKind) -> Result<(), ThreadError> {
        for parent in post.parents().ids() {
            self.lookup_mut(parent)
                .ok_or(ThreadError::DanglingReference {
                    post: post.id(),
                    parent,
                })?
                .add_child(kind, post.id())?;
        }
        Ok(())
    }
}

/// The kind of a post that is about to enter a kind collection.
pub(crate) fn concrete_kind(post: &Post) -> Result<PostKind, ThreadError> {
    post.kind().ok_or_else(|| {
        ThreadError::MalformedRecord(format!("post {} has no record to classify", post.id()))
    })
}

// =============================================================================
// TESTS
// =============================================================================
