//! Cursor parsing and page assembly.

use nordlys_core::{FeedPost, FeedResponse};

/// Parse a feed cursor. The cursor is a base-10 post id; an empty or
/// unparseable cursor means "start from newest" (0).
pub fn parse_cursor(cursor: &str) -> i64 {
    cursor.parse().unwrap_or(0)
}

/// Assemble a response page from rows fetched with a `limit + 1` probe.
///
/// When more than `limit` rows came back a next page exists: the page is
/// trimmed to `limit` and the cursor names the id of its last post. The
/// cursor therefore always refers to a post returned in this response.
pub fn paginate(mut posts: Vec<FeedPost>, limit: usize) -> FeedResponse {
    let mut cursor = None;
    if posts.len() > limit {
        posts.truncate(limit);
        cursor = posts.last().map(|post| post.id.to_string());
    }
    FeedResponse {
        feed: posts,
        cursor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(ids: impl Iterator<Item = i64>) -> Vec<FeedPost> {
        ids.map(|id| FeedPost {
            id,
            uri: format!("at://did:plc:a/app.bsky.feed.post/{id}"),
            score: None,
        })
        .collect()
    }

    // =========================================================================
    // Cursor parsing
    // =========================================================================

    #[test]
    fn empty_cursor_is_newest() {
        assert_eq!(parse_cursor(""), 0);
    }

    #[test]
    fn garbage_cursor_is_newest() {
        assert_eq!(parse_cursor("abc"), 0);
        assert_eq!(parse_cursor("12abc"), 0);
    }

    #[test]
    fn numeric_cursor_parses() {
        assert_eq!(parse_cursor("31"), 31);
    }

    // =========================================================================
    // Page assembly over a 50-post store, pages of 20
    // =========================================================================

    #[test]
    fn full_page_carries_cursor_of_last_row() {
        // Query returned limit+1 = 21 rows: ids 50..30.
        let response = paginate(rows((30..=50).rev()), 20);
        assert_eq!(response.feed.len(), 20);
        assert_eq!(response.feed.first().unwrap().id, 50);
        assert_eq!(response.feed.last().unwrap().id, 31);
        assert_eq!(response.cursor.as_deref(), Some("31"));
    }

    #[test]
    fn middle_page_continues_from_cursor() {
        // Rows below cursor 31: ids 30..10.
        let response = paginate(rows((10..=30).rev()), 20);
        assert_eq!(response.feed.first().unwrap().id, 30);
        assert_eq!(response.feed.last().unwrap().id, 11);
        assert_eq!(response.cursor.as_deref(), Some("11"));
    }

    #[test]
    fn final_partial_page_has_no_cursor() {
        // Only 10 rows remain; the probe found no extra row.
        let response = paginate(rows((1..=10).rev()), 20);
        assert_eq!(response.feed.len(), 10);
        assert!(response.cursor.is_none());
    }

    #[test]
    fn exactly_limit_rows_is_the_last_page() {
        let response = paginate(rows((1..=20).rev()), 20);
        assert_eq!(response.feed.len(), 20);
        assert!(response.cursor.is_none());
    }

    #[test]
    fn empty_result_is_an_empty_page() {
        let response = paginate(vec![], 20);
        assert!(response.feed.is_empty());
        assert!(response.cursor.is_none());
    }
}
