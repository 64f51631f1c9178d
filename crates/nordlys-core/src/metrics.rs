//! Prometheus metrics helpers for the Nordlys service.
//!
//! This module provides centralized metrics initialization and the metric
//! descriptions used across the workspace. Components record through the
//! `metrics` facade macros; the exporter and the `/metrics` endpoint live
//! here.
//!
//! # Metric Naming Conventions
//!
//! - Prefix: component name (`jetstream_`, `ingest_`, `store_`, `feed_`)
//! - Suffix: unit or type (`_total`, `_seconds`)
//! - Labels: used sparingly (rejection stage, host switch direction)

use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;

/// Initialize the Prometheus metrics recorder.
///
/// Must be called once at startup before any metrics are recorded. Returns
/// a handle for [`start_metrics_server`].
///
/// # Panics
///
/// Panics if called more than once.
pub fn init_metrics() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    register_common_metrics();

    handle
}

/// Like [`init_metrics`] but returns `None` if a recorder is already
/// installed. Used by tests.
pub fn try_init_metrics() -> Option<PrometheusHandle> {
    PrometheusBuilder::new().install_recorder().ok()
}

/// Start the metrics HTTP server on the given port.
///
/// Serves `/metrics` in a background task and returns immediately.
pub async fn start_metrics_server(
    port: u16,
    handle: PrometheusHandle,
) -> Result<(), std::io::Error> {
    let app = Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move { handle.render() }
        }),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("metrics server listening on http://{}/metrics", addr);

    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            tracing::error!(error = %err, "metrics server failed");
        }
    });

    Ok(())
}

/// Register descriptions for every metric recorded by the workspace.
fn register_common_metrics() {
    // =========================================================================
    // Streaming client
    // =========================================================================

    describe_counter!(
        "jetstream_connection_attempts_total",
        "Connection attempts to the Jetstream websocket"
    );
    describe_counter!(
        "jetstream_connection_errors_total",
        "Connection and read errors on the Jetstream websocket"
    );
    describe_counter!(
        "jetstream_host_switches_total",
        "Failovers to a different Jetstream host"
    );
    describe_counter!(
        "jetstream_frames_total",
        "Raw frames received from the Jetstream websocket"
    );
    describe_gauge!(
        "jetstream_connected",
        "Whether a Jetstream connection is currently live (1/0)"
    );

    // =========================================================================
    // Worker pool
    // =========================================================================

    describe_counter!(
        "ingest_posts_accepted_total",
        "Posts that passed the full filter cascade and were written"
    );
    describe_counter!(
        "ingest_posts_rejected_total",
        "Posts rejected by the filter cascade (label: stage)"
    );
    describe_counter!(
        "ingest_posts_deleted_total",
        "Delete commits applied to the store"
    );
    describe_counter!(
        "ingest_decode_errors_total",
        "Frames that failed decompression or JSON decoding"
    );
    describe_gauge!(
        "ingest_last_activity_seconds",
        "Unix timestamp of the last accepted post"
    );

    // =========================================================================
    // Store
    // =========================================================================

    describe_counter!(
        "store_write_errors_total",
        "Post upserts or deletes that failed"
    );

    // =========================================================================
    // HTTP surface
    // =========================================================================

    describe_counter!(
        "feed_skeleton_requests_total",
        "Feed skeleton requests served (label: feed)"
    );
}
