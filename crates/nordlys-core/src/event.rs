//! Jetstream wire types.
//!
//! The firehose delivers one JSON event per websocket frame. Nordlys only
//! consumes commit events for the post collection; everything else is
//! skipped at the worker. Frames arrive either as plain text or as
//! zstd-compressed binary when the subscription requested compression.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Kind of a raw websocket frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Plain JSON text frame.
    Text,
    /// Binary frame; zstd-compressed JSON when compression is enabled.
    Binary,
}

/// An unparsed frame as received from the websocket, handed to the worker
/// pool over the shared queue.
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub kind: MessageKind,
    pub bytes: Vec<u8>,
}

/// A Jetstream event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    /// Repository DID the event originates from.
    pub did: String,
    /// Upstream cursor position in microseconds.
    #[serde(default)]
    pub time_us: i64,
    /// Commit payload; absent for identity/account events.
    #[serde(default)]
    pub commit: Option<Commit>,
}

impl Event {
    /// Parse an event envelope from a decompressed frame.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Whether this event is a create commit for the given collection.
    pub fn is_create_for(&self, collection: &str) -> bool {
        self.commit
            .as_ref()
            .map(|c| c.operation == CommitOperation::Create && c.collection == collection)
            .unwrap_or(false)
    }

    /// Whether this event is a delete commit for the given collection.
    pub fn is_delete_for(&self, collection: &str) -> bool {
        self.commit
            .as_ref()
            .map(|c| c.operation == CommitOperation::Delete && c.collection == collection)
            .unwrap_or(false)
    }
}

/// A repository commit within an event.
#[derive(Debug, Clone, Deserialize)]
pub struct Commit {
    pub operation: CommitOperation,
    pub collection: String,
    pub rkey: String,
    /// The record body; absent on deletes.
    #[serde(default)]
    pub record: Option<serde_json::Value>,
}

/// Commit operation discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitOperation {
    Create,
    Update,
    Delete,
}

/// The subset of a post record Nordlys reads.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    #[serde(default)]
    pub text: String,
    /// Languages declared by the author, if any.
    #[serde(default)]
    pub langs: Vec<String>,
    pub created_at: String,
    #[serde(default)]
    pub reply: Option<ReplyRef>,
}

impl PostRecord {
    /// Parse a record out of a commit's raw JSON body.
    pub fn parse(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// The record's `createdAt` as a UTC timestamp.
    pub fn created_at(&self) -> Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|source| Error::InvalidTimestamp {
                value: self.created_at.clone(),
                source,
            })
    }

    /// Parent URI when this post is a reply.
    pub fn parent_uri(&self) -> Option<&str> {
        self.reply.as_ref().map(|r| r.parent.uri.as_str())
    }
}

/// Reply references within a post record.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplyRef {
    pub parent: RecordRef,
}

/// A strong reference to another record.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordRef {
    pub uri: String,
}

/// Build the canonical at:// URI for a post.
pub fn post_uri(did: &str, rkey: &str) -> String {
    format!("at://{}/{}/{}", did, crate::POST_COLLECTION, rkey)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event(operation: &str, collection: &str) -> String {
        format!(
            r#"{{
                "did": "did:plc:abc123",
                "time_us": 1725000000000000,
                "kind": "commit",
                "commit": {{
                    "operation": "{operation}",
                    "collection": "{collection}",
                    "rkey": "3kab2xyz",
                    "record": {{
                        "text": "Hei alle sammen, fin dag i dag!",
                        "langs": ["no"],
                        "createdAt": "2024-09-01T10:00:00Z"
                    }}
                }}
            }}"#
        )
    }

    // =========================================================================
    // Event envelope parsing
    // =========================================================================

    #[test]
    fn parses_create_commit() {
        let event = Event::parse(sample_event("create", crate::POST_COLLECTION).as_bytes())
            .expect("valid event");
        assert_eq!(event.did, "did:plc:abc123");
        assert!(event.is_create_for(crate::POST_COLLECTION));
        assert!(!event.is_delete_for(crate::POST_COLLECTION));
    }

    #[test]
    fn delete_commit_is_not_create() {
        let event =
            Event::parse(sample_event("delete", crate::POST_COLLECTION).as_bytes()).unwrap();
        assert!(!event.is_create_for(crate::POST_COLLECTION));
        assert!(event.is_delete_for(crate::POST_COLLECTION));
    }

    #[test]
    fn other_collection_is_skipped() {
        let event = Event::parse(sample_event("create", "app.bsky.feed.like").as_bytes()).unwrap();
        assert!(!event.is_create_for(crate::POST_COLLECTION));
    }

    #[test]
    fn event_without_commit_parses() {
        let event = Event::parse(br#"{"did": "did:plc:x", "kind": "identity"}"#).unwrap();
        assert!(event.commit.is_none());
        assert!(!event.is_create_for(crate::POST_COLLECTION));
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(Event::parse(b"{not json").is_err());
    }

    // =========================================================================
    // Post record parsing
    // =========================================================================

    #[test]
    fn parses_record_fields() {
        let event =
            Event::parse(sample_event("create", crate::POST_COLLECTION).as_bytes()).unwrap();
        let record = PostRecord::parse(event.commit.unwrap().record.unwrap()).unwrap();
        assert_eq!(record.text, "Hei alle sammen, fin dag i dag!");
        assert_eq!(record.langs, vec!["no"]);
        assert!(record.parent_uri().is_none());

        let ts = record.created_at().unwrap();
        assert_eq!(ts.timestamp(), 1725184800);
    }

    #[test]
    fn parses_reply_parent() {
        let value: serde_json::Value = serde_json::from_str(
            r#"{
                "text": "svar",
                "createdAt": "2024-09-01T10:00:00+02:00",
                "reply": {
                    "parent": {"uri": "at://did:plc:parent/app.bsky.feed.post/1"},
                    "root": {"uri": "at://did:plc:root/app.bsky.feed.post/0"}
                }
            }"#,
        )
        .unwrap();
        let record = PostRecord::parse(value).unwrap();
        assert_eq!(
            record.parent_uri(),
            Some("at://did:plc:parent/app.bsky.feed.post/1")
        );
    }

    #[test]
    fn bad_timestamp_is_an_error() {
        let value: serde_json::Value =
            serde_json::from_str(r#"{"text": "x", "createdAt": "yesterday"}"#).unwrap();
        let record = PostRecord::parse(value).unwrap();
        assert!(matches!(
            record.created_at(),
            Err(Error::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn missing_langs_defaults_empty() {
        let value: serde_json::Value =
            serde_json::from_str(r#"{"text": "x", "createdAt": "2024-09-01T10:00:00Z"}"#).unwrap();
        let record = PostRecord::parse(value).unwrap();
        assert!(record.langs.is_empty());
    }

    // =========================================================================
    // URI construction
    // =========================================================================

    #[test]
    fn builds_post_uri() {
        assert_eq!(
            post_uri("did:plc:abc", "3kab"),
            "at://did:plc:abc/app.bsky.feed.post/3kab"
        );
    }
}
