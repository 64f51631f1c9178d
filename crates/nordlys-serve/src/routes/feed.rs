//! Feed-skeleton endpoints.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use nordlys_core::{FeedResponse, FEED_GENERATOR_COLLECTION};
use nordlys_feeds::{paginate, parse_cursor};

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

/// `GET /xrpc/app.bsky.feed.describeFeedGenerator`
///
/// Enumerates every registered feed as a fully qualified URI.
pub async fn describe_feed_generator(State(state): State<AppState>) -> Json<serde_json::Value> {
    let feeds: Vec<serde_json::Value> = state
        .registry
        .ids()
        .into_iter()
        .map(|id| json!({ "uri": state.feed_uri(id) }))
        .collect();

    Json(json!({
        "did": state.service_did(),
        "feeds": feeds,
    }))
}

/// Query parameters for the skeleton endpoint. `limit` stays a string so
/// an unparseable value falls back to the default instead of rejecting.
#[derive(Debug, Deserialize)]
pub struct SkeletonParams {
    pub feed: Option<String>,
    pub cursor: Option<String>,
    pub limit: Option<String>,
}

/// `GET /xrpc/app.bsky.feed.getFeedSkeleton?feed=<URI>&cursor=<str>&limit=<int>`
///
/// Serves one page of a ranked feed. One extra row is requested to decide
/// whether a next-page cursor exists; the page itself never exceeds the
/// clamped limit.
pub async fn get_feed_skeleton(
    State(state): State<AppState>,
    Query(params): Query<SkeletonParams>,
) -> Result<Json<FeedResponse>, ApiError> {
    let feed_uri = params
        .feed
        .unwrap_or_else(|| state.feed_uri("all"));

    let feed_id = parse_feed_uri(&feed_uri)
        .ok_or_else(|| ApiError::BadRequest("invalid feed URI".to_string()))?;

    let feed = state
        .registry
        .get(feed_id)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown feed '{feed_id}'")))?;

    let limit = clamp_limit(params.limit.as_deref());
    let cursor = parse_cursor(params.cursor.as_deref().unwrap_or(""));

    tracing::debug!(feed = %feed.id, cursor, limit, "generating feed skeleton");
    metrics::counter!("feed_skeleton_requests_total", "feed" => feed.id.clone()).increment(1);

    let query = feed.build_query(limit + 1, cursor);
    let rows = state.store.get_feed_posts(&query).await?;

    Ok(Json(paginate(rows, limit as usize)))
}

/// Extract the feed id (record key) from a feed generator URI of the form
/// `at://<did>/app.bsky.feed.generator/<id>`.
fn parse_feed_uri(uri: &str) -> Option<&str> {
    let rest = uri.strip_prefix("at://")?;
    let mut segments = rest.split('/');
    let authority = segments.next()?;
    let collection = segments.next()?;
    let rkey = segments.next()?;

    if authority.is_empty()
        || collection != FEED_GENERATOR_COLLECTION
        || rkey.is_empty()
        || segments.next().is_some()
    {
        return None;
    }
    Some(rkey)
}

/// Clamp the requested page size to [1, 100], defaulting to 20.
fn clamp_limit(raw: Option<&str>) -> i64 {
    raw.and_then(|value| value.parse::<i64>().ok())
        .unwrap_or(DEFAULT_LIMIT)
        .clamp(1, MAX_LIMIT)
}
