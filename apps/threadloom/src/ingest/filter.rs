//! Keyword filter applied to raw documents before they are stored.

use serde_json::Value;
use threadloom_core::primitives::{FIELD_FULL_TEXT, FIELD_TEXT};

/// Matches a text that mentions any configured keyword as a word or a
/// hashtag. Matching is ASCII case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct KeywordFilter {
    keywords: Vec<String>,
}

impl KeywordFilter {
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Self {
        Self {
            keywords: keywords
                .iter()
                .map(|k| k.as_ref().trim().to_ascii_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// An empty filter accepts everything.
    #[must_use]
    pub fn accepts_all(&self) -> bool {
        self.keywords.is_empty()
    }

    /// Whether `text` contains ` k `, ` #k ` or starts with `k `.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        if self.accepts_all() {
            return true;
        }
        let text = text.to_ascii_lowercase();
        self.keywords.iter().any(|k| {
            text.starts_with(&format!("{} ", k))
                || text.contains(&format!(" {} ", k))
                || text.contains(&format!(" #{} ", k))
        })
    }

    /// Apply the filter to a raw document's text. Documents without text
    /// only pass an empty filter.
    #[must_use]
    pub fn matches_document(&self, document: &Value) -> bool {
        if self.accepts_all() {
            return true;
        }
        document
            .get(FIELD_FULL_TEXT)
            .or_else(|| document.get(FIELD_TEXT))
            .and_then(Value::as_str)
            .is_some_and(|text| self.matches(text))
    }
}
