//! HTTP surface and supervisor for the Nordlys feed generator.
//!
//! The binary in this crate owns the whole service lifecycle: it runs
//! migrations, compiles the feed registry, starts the ingestion pipeline
//! under a liveness watchdog, and serves the feed-skeleton HTTP contract.
//!
//! # Architecture
//!
//! - **AppState**: shared request state (store handle, compiled feeds,
//!   hostname)
//! - **Routes**: endpoint handlers grouped by domain
//! - **Supervisor**: ingestion task orchestration and the watchdog

mod error;
mod routes;
mod state;
pub mod supervisor;

pub use self::error::ApiError;
pub use self::routes::router;
pub use self::state::AppState;
