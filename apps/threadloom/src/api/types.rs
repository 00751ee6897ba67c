//! # API Response Types
//!
//! This module defines the JSON structures for the HTTP API.
//!
//! Post and user ids are 64-bit and exceed the exact integer range of
//! JavaScript numbers, so every id is also given as a decimal string.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use threadloom_core::{ChildIndex, Parents, Post, PostId, PostState, RegistryStats};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// STATUS RESPONSE
// =============================================================================

/// Registry status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Concrete posts per kind name.
    pub posts: BTreeMap<String, usize>,
    pub total_posts: usize,
    pub placeholders: usize,
}

impl From<&RegistryStats> for StatusResponse {
    fn from(stats: &RegistryStats) -> Self {
        Self {
            posts: stats
                .posts
                .iter()
                .map(|(kind, count)| (kind.name().to_string(), *count))
                .collect(),
            total_posts: stats.concrete(),
            placeholders: stats.placeholders,
        }
    }
}

// =============================================================================
// POST RESPONSE
// =============================================================================

/// One parent link of a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentJson {
    /// `retweet_source`, `quoted` or `reply_target`.
    pub role: String,
    pub id: i64,
    pub id_str: String,
}

impl ParentJson {
    fn new(role: &str, id: PostId) -> Self {
        Self {
            role: role.to_string(),
            id: id.0,
            id_str: id.to_string(),
        }
    }

    /// Parent links of a post in field order.
    #[must_use]
    pub fn list(parents: &Parents) -> Vec<Self> {
        match *parents {
            Parents::Placeholder | Parents::Original => Vec::new(),
            Parents::Retweet { source } => vec![Self::new("retweet_source", source)],
            Parents::Quote { quoted } => vec![Self::new("quoted", quoted)],
            Parents::Reply { target } => vec![Self::new("reply_target", target)],
            Parents::QuotedReply { target, quoted } => vec![
                Self::new("reply_target", target),
                Self::new("quoted", quoted),
            ],
            Parents::QuotedRetweet { source, quoted } => vec![
                Self::new("retweet_source", source),
                Self::new("quoted", quoted),
            ],
        }
    }
}

/// Child ids per child kind name.
pub type ChildrenJson = BTreeMap<String, Vec<i64>>;

fn children_json(children: &ChildIndex) -> ChildrenJson {
    let mut json = ChildrenJson::new();
    for (kind, id) in children.iter() {
        json.entry(kind.name().to_string()).or_default().push(id.0);
    }
    json
}

fn state_name(state: PostState) -> &'static str {
    match state {
        PostState::IsSource => "is_source",
        PostState::Unknown => "unknown",
        PostState::Enriched => "enriched",
    }
}

/// A post as seen through the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: i64,
    pub id_str: String,
    /// Kind name, or `placeholder`.
    pub kind: String,
    pub state: String,
    pub author: Option<i64>,
    pub text: Option<String>,
    pub created_at: Option<String>,
    pub refreshed: bool,
    pub parents: Vec<ParentJson>,
    pub children: ChildrenJson,
}

impl From<&Post> for PostResponse {
    fn from(post: &Post) -> Self {
        let latest = post.latest();
        Self {
            id: post.id().0,
            id_str: post.id().to_string(),
            kind: post
                .kind()
                .map_or_else(|| "placeholder".to_string(), |k| k.name().to_string()),
            state: state_name(post.state()).to_string(),
            author: post.author().map(|a| a.0),
            text: latest.and_then(|r| r.text()).map(str::to_string),
            created_at: latest
                .and_then(|r| r.created_at().ok().flatten())
                .map(|ts| ts.to_rfc3339()),
            refreshed: post.refreshed().is_some(),
            parents: ParentJson::list(post.parents()),
            children: children_json(post.children()),
        }
    }
}

// =============================================================================
// CHILDREN RESPONSE
// =============================================================================

/// Child ids of a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildrenResponse {
    pub id: i64,
    pub total: usize,
    pub children: ChildrenJson,
}

impl From<&Post> for ChildrenResponse {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id().0,
            total: post.children().len(),
            children: children_json(post.children()),
        }
    }
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn not_found(id: PostId) -> Self {
        Self {
            error: format!("post {} not found", id),
        }
    }
}

