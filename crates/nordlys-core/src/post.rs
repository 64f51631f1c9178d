//! The persisted post model and feed response types.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A post as written to the store.
///
/// `indexed_at` is assigned by the store on write and therefore not part of
/// this value. `parent_uri` is `None` for top-level posts; the empty string
/// never reaches the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub uri: String,
    /// Authoritative creation time, preserved across re-ingests.
    pub created_at: DateTime<Utc>,
    pub text: String,
    pub parent_uri: Option<String>,
    /// Lowercase ISO-639-1 codes, insertion-ordered, deduplicated.
    pub languages: Vec<String>,
    pub author_did: String,
}

impl Post {
    /// Normalize a raw parent URI: empty strings become `None`.
    pub fn normalize_parent(parent: Option<&str>) -> Option<String> {
        parent.filter(|p| !p.is_empty()).map(str::to_string)
    }
}

/// One row of a feed skeleton page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedPost {
    #[serde(skip)]
    pub id: i64,
    #[serde(rename = "post")]
    pub uri: String,
    #[serde(skip)]
    pub score: Option<f64>,
}

/// A feed skeleton response page.
///
/// `cursor` is present iff a next page exists, and always names the id of
/// the last post in `feed`.
#[derive(Debug, Clone, Serialize)]
pub struct FeedResponse {
    pub feed: Vec<FeedPost>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// One bucket of the posts-per-time dashboard aggregation.
#[derive(Debug, Clone, Serialize)]
pub struct PostsPerTime {
    pub time: DateTime<Utc>,
    pub count: i64,
}

/// Truncation bucket for the posts-per-time aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBucket {
    Hour,
    Day,
    Week,
}

impl TimeBucket {
    /// Parse a bucket name as it appears in the query string.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "hour" => Some(Self::Hour),
            "day" => Some(Self::Day),
            "week" => Some(Self::Week),
            _ => None,
        }
    }

    /// The `date_trunc` field name for this bucket.
    pub fn as_sql_field(self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Parent normalization
    // =========================================================================

    #[test]
    fn empty_parent_becomes_none() {
        assert_eq!(Post::normalize_parent(Some("")), None);
        assert_eq!(Post::normalize_parent(None), None);
        assert_eq!(
            Post::normalize_parent(Some("at://x/app.bsky.feed.post/1")),
            Some("at://x/app.bsky.feed.post/1".to_string())
        );
    }

    // =========================================================================
    // Wire serialization
    // =========================================================================

    #[test]
    fn feed_response_wire_format() {
        let response = FeedResponse {
            feed: vec![FeedPost {
                id: 42,
                uri: "at://did:plc:a/app.bsky.feed.post/1".to_string(),
                score: Some(0.5),
            }],
            cursor: Some("42".to_string()),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "feed": [{"post": "at://did:plc:a/app.bsky.feed.post/1"}],
                "cursor": "42"
            })
        );
    }

    #[test]
    fn cursor_absent_when_no_next_page() {
        let response = FeedResponse {
            feed: vec![],
            cursor: None,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("cursor"));
    }

    // =========================================================================
    // Time buckets
    // =========================================================================

    #[test]
    fn bucket_parsing() {
        assert_eq!(TimeBucket::parse("hour"), Some(TimeBucket::Hour));
        assert_eq!(TimeBucket::parse("day"), Some(TimeBucket::Day));
        assert_eq!(TimeBucket::parse("week"), Some(TimeBucket::Week));
        assert_eq!(TimeBucket::parse("month"), None);
        assert_eq!(TimeBucket::parse(""), None);
    }
}
