//! Jetstream firehose ingestion for the Nordlys feed generator.
//!
//! Two halves cooperate through one bounded queue:
//!
//! - [`jetstream`] maintains exactly one live websocket connection to one of
//!   the configured Jetstream hosts and pushes every received frame onto the
//!   queue. When the queue is full the send blocks, so backpressure reaches
//!   the socket read and eventually the upstream.
//! - [`worker`] runs N long-lived workers that pop frames, decode them, run
//!   the cheap-to-expensive filter cascade, and upsert surviving posts into
//!   the store. Workers own their zstd decoder and language detector
//!   privately; nothing mutable is shared between them.

mod backoff;
mod filters;
pub mod jetstream;
mod language;
pub mod worker;

use thiserror::Error;

pub use backoff::ExponentialBackoff;
pub use filters::{
    contains_repetitive_pattern, contains_spam, has_enough_letters, has_enough_words,
};
pub use jetstream::JetstreamConfig;
pub use language::{LanguageGate, LanguageGateConfig};
pub use worker::{WorkerPool, WorkerPoolConfig};

/// Result type alias for ingestion operations.
pub type IngestResult<T> = std::result::Result<T, IngestError>;

/// Errors raised by the ingestion pipeline.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Websocket dial or protocol failure.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// A configured Jetstream host is not a valid URL.
    #[error("invalid jetstream url '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    /// The host list was empty.
    #[error("no jetstream hosts configured")]
    NoHosts,

    /// A compressed frame failed to decompress.
    #[error("zstd decompression error: {0}")]
    Decompress(std::io::Error),

    /// Frame or record decoding failure.
    #[error(transparent)]
    Decode(#[from] nordlys_core::Error),

    /// Store write failure.
    #[error(transparent)]
    Store(#[from] nordlys_store::StoreError),
}
