//! # Configuration
//!
//! Loaded from an optional TOML file; every field has a default.
//!
//! ```toml
//! keywords = ["5g"]
//! workers = 8
//! exclude = [1246401563125518336]
//! ```

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use threadloom_core::PostId;

/// Records whose ids are listed here are known to be corrupt in the source
/// dataset and are never stored.
pub const KNOWN_CORRUPT_IDS: [i64; 6] = [
    1_246_401_563_125_518_336,
    1_239_318_882_428_620_801,
    1_223_756_754_821_009_408,
    1_243_174_595_542_294_528,
    1_240_672_989_584_203_781,
    1_235_998_549_235_634_178,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Keywords a raw document must mention to be ingested. Empty accepts
    /// every document.
    pub keywords: Vec<String>,

    /// Parallel file decoders.
    pub workers: usize,

    /// Post ids skipped on store.
    pub exclude: Vec<i64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keywords: vec!["5g".to_string()],
            workers: default_workers(),
            exclude: KNOWN_CORRUPT_IDS.to_vec(),
        }
    }
}

impl Config {
    /// Load the file at `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::parse(&text)?;
        tracing::info!(
            path = %path.display(),
            keywords = config.keywords.len(),
            workers = config.workers,
            excluded = config.exclude.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Parse TOML text.
    pub fn parse(text: &str) -> Result<Self, AppError> {
        let config: Self = toml::from_str(text).map_err(|e| AppError::Config(e.to_string()))?;
        if config.workers == 0 {
            return Err(AppError::Config("workers must be at least 1".to_string()));
        }
        Ok(config)
    }

    /// The exclusion list as post ids.
    pub fn exclusions(&self) -> impl Iterator<Item = PostId> + '_ {
        self.exclude.iter().copied().map(PostId)
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}
