//! # Record Schema & Runtime Constants
//!
//! The engine supports exactly one record shape. The field names below are
//! compiled in and are the only place that shape is spelled out.

// =============================================================================
// RECORD FIELDS
// =============================================================================

/// Post identifier (integer, possibly lossy after a JavaScript round trip).
pub const FIELD_ID: &str = "id";

/// Exact decimal form of [`FIELD_ID`]; preferred when present.
pub const FIELD_ID_STR: &str = "id_str";

/// Retweet source: either a nested document or, once flattened, its id.
pub const FIELD_RETWEET_SOURCE: &str = "retweeted_status";

/// Quoted post id.
pub const FIELD_QUOTED_ID: &str = "quoted_status_id";

/// Exact decimal form of [`FIELD_QUOTED_ID`].
pub const FIELD_QUOTED_ID_STR: &str = "quoted_status_id_str";

/// Nested quoted document, replaced by its id during flattening.
pub const FIELD_QUOTED_STATUS: &str = "quoted_status";

/// Reply target id.
pub const FIELD_REPLY_TARGET: &str = "in_reply_to_status_id";

/// Exact decimal form of [`FIELD_REPLY_TARGET`].
pub const FIELD_REPLY_TARGET_STR: &str = "in_reply_to_status_id_str";

/// Nested document for the viewing account's own retweet.
pub const FIELD_CURRENT_USER_RETWEET: &str = "current_user_retweet";

/// Author: an embedded profile document or a bare user id.
pub const FIELD_USER: &str = "user";

/// Full post text.
pub const FIELD_FULL_TEXT: &str = "full_text";

/// Truncated post text, used when `full_text` is absent.
pub const FIELD_TEXT: &str = "text";

/// Creation timestamp.
pub const FIELD_CREATED_AT: &str = "created_at";

/// Format of [`FIELD_CREATED_AT`], e.g. `Wed Mar 04 21:43:11 +0000 2020`.
pub const CREATED_AT_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Nested documents extracted as separate records during flattening, in
/// extraction order.
pub const NESTED_STATUS_FIELDS: [&str; 3] = [
    FIELD_CURRENT_USER_RETWEET,
    FIELD_RETWEET_SOURCE,
    FIELD_QUOTED_STATUS,
];

// =============================================================================
// SNAPSHOT FORMAT
// =============================================================================

/// Magic bytes for the snapshot manifest header.
pub const MAGIC_BYTES: &[u8; 4] = b"TLOM";

/// Current manifest format version.
pub const FORMAT_VERSION: u8 = 1;

/// Name of the manifest file inside a snapshot directory.
pub const MANIFEST_FILE: &str = "manifest.bin";

/// Record stream holding the refreshed versions of posts.
pub const REFRESHED_FILE: &str = "refreshed.gz";

/// Largest single frame accepted by the record stream reader (64 MiB).
///
/// Checked before the payload buffer is allocated.
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

// =============================================================================
// PROGRESS
// =============================================================================

/// Number of `store` calls between two progress log lines.
pub const PROGRESS_INTERVAL: u64 = 10_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_bytes_correct() {
        assert_eq!(MAGIC_BYTES, b"TLOM");
    }

    #[test]
    fn created_at_format_parses_api_timestamps() {
        let parsed =
            chrono::DateTime::parse_from_str("Wed Mar 04 21:43:11 +0000 2020", CREATED_AT_FORMAT);
        assert!(parsed.is_ok());
    }
}
