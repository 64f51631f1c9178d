//! Core types and shared utilities for the Nordlys feed generator.
//!
//! This crate provides:
//! - Jetstream wire types and raw-frame envelopes
//! - The persisted post model and feed-skeleton response types
//! - The declarative feeds TOML configuration
//! - The query value vector handed from the feed compiler to the store
//! - Prometheus metrics helpers
//! - Shared error types

mod config;
mod error;
mod event;
pub mod metrics;
mod post;
mod query;

/// The record collection Nordlys consumes from the firehose.
pub const POST_COLLECTION: &str = "app.bsky.feed.post";

/// The record collection feeds are published under.
pub const FEED_GENERATOR_COLLECTION: &str = "app.bsky.feed.generator";

pub use config::{
    load_feeds_config, AuthorWeight, FeedConfig, FeedsConfig, FilterConfig, ScoringConfig,
};
pub use error::{Error, Result};
pub use event::{
    post_uri, Commit, CommitOperation, Event, MessageKind, PostRecord, RawMessage, RecordRef,
    ReplyRef,
};
pub use post::{FeedPost, FeedResponse, Post, PostsPerTime, TimeBucket};
pub use query::{BuiltQuery, QueryValue};
