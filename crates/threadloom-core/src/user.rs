//! # Users
//!
//! Post authors, their account status and the profile snapshots observed in
//! their posts.

use crate::record::Record;
use crate::{PostId, PostKind, ThreadError, UserId, UserState};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

/// Observation time of a profile snapshot and the post it came from;
/// `None` for profiles fetched on their own.
pub type VersionKey = (DateTime<Utc>, Option<PostId>);

/// An author.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    id: UserId,
    state: UserState,
    /// Documents carrying a profile of this user, keyed by observation time
    /// and the post they were taken from.
    versions: BTreeMap<VersionKey, Record>,
    /// Posts authored by this user, per kind.
    posts: BTreeMap<PostKind, BTreeSet<PostId>>,
}

impl User {
    fn new(id: UserId, state: UserState) -> Self {
        Self {
            id,
            state,
            versions: BTreeMap::new(),
            posts: BTreeMap::new(),
        }
    }

    /// A user whose profile was re-fetched successfully.
    pub fn from_profile(profile: Record, observed_at: DateTime<Utc>) -> Result<Self, ThreadError> {
        let mut user = Self::new(UserId(profile.id()?.0), UserState::Exists);
        user.versions.insert((observed_at, None), profile);
        Ok(user)
    }

    /// A user whose account was deleted; `profile` is the last known one.
    pub fn deleted(profile: Record, observed_at: DateTime<Utc>) -> Result<Self, ThreadError> {
        let mut user = Self::from_profile(profile, observed_at)?;
        user.state = UserState::Deleted;
        Ok(user)
    }

    /// A listed user for whom no profile could be retrieved.
    #[must_use]
    pub fn unavailable(id: UserId) -> Self {
        Self::new(id, UserState::NotAvailable)
    }

    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    #[must_use]
    pub fn state(&self) -> UserState {
        self.state
    }

    #[must_use]
    pub fn versions(&self) -> &BTreeMap<VersionKey, Record> {
        &self.versions
    }

    /// The most recently observed profile document.
    ///
    /// Versions taken from posts hold the whole post; the embedded `user`
    /// document is returned for those.
    #[must_use]
    pub fn profile(&self) -> Option<&Map<String, Value>> {
        self.versions
            .values()
            .next_back()
            .map(|version| version.author_profile().unwrap_or(version.as_map()))
    }

    /// Posts of one kind, in id order.
    pub fn posts(&self, kind: PostKind) -> impl Iterator<Item = PostId> + '_ {
        self.posts.get(&kind).into_iter().flatten().copied()
    }

    /// Number of posts across all kinds.
    #[must_use]
    pub fn post_count(&self) -> usize {
        self.posts.values().map(BTreeSet::len).sum()
    }

    /// Record a profile snapshot taken from `post`, replacing the one kept for
    /// the same time and post. Returns `false` if that exact snapshot was
    /// already kept.
    pub(crate) fn add_version(&mut self, at: DateTime<Utc>, post: PostId, record: Record) -> bool {
        match self.versions.entry((at, Some(post))) {
            Entry::Occupied(mut slot) => {
                if *slot.get() == record {
                    return false;
                }
                slot.insert(record);
                true
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
        }
    }

    pub(crate) fn add_post(&mut self, kind: PostKind, id: PostId) -> bool {
        self.posts.entry(kind).or_default().insert(id)
    }
}

// =============================================================================
// USER REGISTRY
// =============================================================================

/// All users of a load, keyed by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserRegistry {
    users: BTreeMap<UserId, User>,
}

impl UserRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user, replacing and returning any previous entry for the id.
    pub fn insert(&mut self, user: User) -> Option<User> {
        self.users.insert(user.id(), user)
    }

    #[must_use]
    pub fn get(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: UserId) -> Option<&mut User> {
        self.users.get_mut(&id)
    }

    #[must_use]
    pub fn contains(&self, id: UserId) -> bool {
        self.users.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Number of users per account state.
    #[must_use]
    pub fn counts(&self) -> BTreeMap<UserState, usize> {
        let mut counts = BTreeMap::new();
        for user in self.users.values() {
            *counts.entry(user.state()).or_insert(0) += 1;
        }
        counts
    }
}
