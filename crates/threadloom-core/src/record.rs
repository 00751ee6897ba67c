//! # Record Model
//!
//! A [`Record`] is one self-describing post document: a JSON object that
//! names its own id and, optionally, the ids of the posts it retweets, quotes
//! or replies to. The engine only reads the reference fields and the author;
//! everything else (text, entities, counts) is carried untouched.
//!
//! Ids are read from the exact decimal `*_str` companion fields when they are
//! present, because the integer fields may have been rounded by a JavaScript
//! producer.

use crate::primitives::{
    CREATED_AT_FORMAT, FIELD_CREATED_AT, FIELD_FULL_TEXT, FIELD_ID, FIELD_ID_STR,
    FIELD_QUOTED_ID, FIELD_QUOTED_ID_STR, FIELD_REPLY_TARGET, FIELD_REPLY_TARGET_STR,
    FIELD_RETWEET_SOURCE, FIELD_TEXT, FIELD_USER, NESTED_STATUS_FIELDS,
};
use crate::{PostId, ThreadError, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A raw post document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Wrap a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self, ThreadError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(ThreadError::MalformedRecord(format!(
                "expected a JSON object, found {}",
                json_type(&other)
            ))),
        }
    }

    /// Parse a record from JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ThreadError> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| ThreadError::Serialization(format!("invalid record JSON: {}", e)))?;
        Self::from_value(value)
    }

    /// Encode the record as JSON bytes.
    pub fn to_vec(&self) -> Result<Vec<u8>, ThreadError> {
        serde_json::to_vec(&self.0).map_err(|e| ThreadError::Serialization(e.to_string()))
    }

    /// Borrow the underlying document.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Unwrap into a JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Get a raw field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// The post id. Required.
    pub fn id(&self) -> Result<PostId, ThreadError> {
        document_id(&self.0).map(PostId)
    }

    /// Id of the retweeted post, if this record is a retweet.
    pub fn retweet_source(&self) -> Result<Option<PostId>, ThreadError> {
        self.reference(FIELD_RETWEET_SOURCE, None)
    }

    /// Id of the quoted post, if any.
    pub fn quoted_post(&self) -> Result<Option<PostId>, ThreadError> {
        self.reference(FIELD_QUOTED_ID, Some(FIELD_QUOTED_ID_STR))
    }

    /// Id of the post this record replies to, if any.
    pub fn reply_target(&self) -> Result<Option<PostId>, ThreadError> {
        self.reference(FIELD_REPLY_TARGET, Some(FIELD_REPLY_TARGET_STR))
    }

    /// Author id from the embedded profile or the bare `user` id.
    pub fn author(&self) -> Result<Option<UserId>, ThreadError> {
        match self.0.get(FIELD_USER) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(profile)) => document_id(profile).map(|id| Some(UserId(id))),
            Some(value) => integer(value, FIELD_USER).map(|id| Some(UserId(id))),
        }
    }

    /// The embedded author profile, when the record carries one.
    #[must_use]
    pub fn author_profile(&self) -> Option<&Map<String, Value>> {
        self.0.get(FIELD_USER).and_then(Value::as_object)
    }

    /// Post text (`full_text`, falling back to `text`).
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.0
            .get(FIELD_FULL_TEXT)
            .or_else(|| self.0.get(FIELD_TEXT))
            .and_then(Value::as_str)
    }

    /// Creation time of the post, if present.
    pub fn created_at(&self) -> Result<Option<DateTime<Utc>>, ThreadError> {
        match self.0.get(FIELD_CREATED_AT) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(raw)) => DateTime::parse_from_str(raw, CREATED_AT_FORMAT)
                .map(|ts| Some(ts.with_timezone(&Utc)))
                .map_err(|e| {
                    ThreadError::MalformedRecord(format!(
                        "{} '{}' is not a valid timestamp: {}",
                        FIELD_CREATED_AT, raw, e
                    ))
                }),
            Some(other) => Err(ThreadError::MalformedRecord(format!(
                "{} must be a string, found {}",
                FIELD_CREATED_AT,
                json_type(other)
            ))),
        }
    }

    /// Read a reference field. Absent and `null` both mean "no reference".
    /// A nested document counts as a reference to its own id.
    fn reference(&self, field: &str, exact: Option<&str>) -> Result<Option<PostId>, ThreadError> {
        match self.0.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(nested)) => document_id(nested).map(|id| Some(PostId(id))),
            Some(value) => {
                if let Some(exact) = exact
                    && let Some(Value::String(decimal)) = self.0.get(exact)
                {
                    return parse_decimal(decimal, exact).map(|id| Some(PostId(id)));
                }
                integer(value, field).map(|id| Some(PostId(id)))
            }
        }
    }
}

// =============================================================================
// FLATTENING
// =============================================================================

/// Split a raw API document into individual records.
///
/// Nested `current_user_retweet`, `retweeted_status` and `quoted_status`
/// documents are extracted depth-first and replaced by their ids, so every
/// returned record references other posts by id only. Nested records come
/// before the record that embedded them.
pub fn flatten(value: Value) -> Result<Vec<Record>, ThreadError> {
    let mut records = Vec::new();
    flatten_into(Record::from_value(value)?, &mut records)?;
    Ok(records)
}

fn flatten_into(mut record: Record, out: &mut Vec<Record>) -> Result<(), ThreadError> {
    for field in NESTED_STATUS_FIELDS {
        let Some(slot) = record.0.get_mut(field) else {
            continue;
        };
        if !slot.is_object() {
            continue;
        }
        let nested = Record::from_value(slot.take())?;
        let nested_id = nested.id()?;
        record.0.insert(field.to_string(), Value::from(nested_id.0));
        flatten_into(nested, out)?;
    }
    out.push(record);
    Ok(())
}

// =============================================================================
// FIELD HELPERS
// =============================================================================

fn document_id(map: &Map<String, Value>) -> Result<i64, ThreadError> {
    match map.get(FIELD_ID_STR) {
        Some(Value::String(decimal)) => parse_decimal(decimal, FIELD_ID_STR),
        _ => match map.get(FIELD_ID) {
            Some(value) if !value.is_null() => integer(value, FIELD_ID),
            _ => Err(ThreadError::MalformedRecord(format!(
                "document has neither {} nor {}",
                FIELD_ID_STR, FIELD_ID
            ))),
        },
    }
}

fn integer(value: &Value, field: &str) -> Result<i64, ThreadError> {
    value.as_i64().ok_or_else(|| {
        ThreadError::MalformedRecord(format!(
            "{} must be a 64-bit integer, found {}",
            field,
            json_type(value)
        ))
    })
}

fn parse_decimal(decimal: &str, field: &str) -> Result<i64, ThreadError> {
    decimal.trim().parse().map_err(|_| {
        ThreadError::MalformedRecord(format!("{} '{}' is not a decimal id", field, decimal))
    })
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// TESTS
// =============================================================================
