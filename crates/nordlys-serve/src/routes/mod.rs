//! API route definitions.
//!
//! # Route Structure
//!
//! - `GET /health` — liveness plus a store ping
//! - `GET /.well-known/did.json` — DID document for the feed generator
//! - `GET /xrpc/app.bsky.feed.describeFeedGenerator` — registered feeds
//! - `GET /xrpc/app.bsky.feed.getFeedSkeleton` — one ranked feed page
//! - `GET /dashboard/posts-per-time` — dashboard aggregation

mod feed;
mod health;
mod stats;
mod wellknown;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;

/// Build the complete router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/.well-known/did.json", get(wellknown::did_document))
        .route(
            "/xrpc/app.bsky.feed.describeFeedGenerator",
            get(feed::describe_feed_generator),
        )
        .route(
            "/xrpc/app.bsky.feed.getFeedSkeleton",
            get(feed::get_feed_skeleton),
        )
        .route("/dashboard/posts-per-time", get(stats::posts_per_time))
        .with_state(state)
}
