//! Nordlys feed generator daemon.
//!
//! Starts the full service: runs database migrations, compiles the feed
//! registry from the feeds TOML, subscribes to the Jetstream firehose
//! under a liveness watchdog, and serves the feed-skeleton HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Minimal: public hostname plus database defaults
//! nordlys --hostname feeds.example.com
//!
//! # Compressed firehose with an explicit dictionary and custom feeds file
//! nordlys --hostname feeds.example.com \
//!     --config /etc/nordlys/feeds.toml \
//!     --jetstream-compress true \
//!     --jetstream-zstd-dictionary /etc/nordlys/zstd_dictionary
//! ```
//!
//! # Graceful Shutdown
//!
//! SIGINT (Ctrl+C) and SIGTERM cancel the root context: the streaming
//! client stops, the workers drain, active HTTP requests finish, and the
//! connection pool closes before exit.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use axum::http::Request;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use nordlys_core::metrics::{init_metrics, start_metrics_server};
use nordlys_core::load_feeds_config;
use nordlys_feeds::Registry;
use nordlys_ingest::{JetstreamConfig, LanguageGateConfig, WorkerPoolConfig};
use nordlys_serve::{router, AppState};
use nordlys_store::{Store, StoreConfig};

/// Nordlys feed generator daemon.
#[derive(Parser, Debug)]
#[command(name = "nordlys")]
#[command(about = "Feed generator for the AT-protocol firehose")]
#[command(version)]
struct Args {
    /// Public hostname, used for the DID document and feed URIs.
    #[arg(long, short = 'n', env = "NORDLYS_HOSTNAME")]
    hostname: String,

    /// Bind address of the HTTP server.
    #[arg(long, short = 'o', env = "NORDLYS_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port of the HTTP server.
    #[arg(long, short = 'p', env = "NORDLYS_PORT", default_value_t = 3000)]
    port: u16,

    /// Run language detection on every post, catching posts mistagged
    /// with the wrong language.
    #[arg(long, env = "NORDLYS_RUN_LANGUAGE_DETECTION")]
    run_language_detection: bool,

    /// Minimum confidence for the detected language, in [0, 1].
    #[arg(long, env = "NORDLYS_CONFIDENCE_THRESHOLD", default_value_t = 0.6)]
    confidence_threshold: f64,

    /// Path to the feeds configuration file.
    #[arg(long, short = 'c', env = "NORDLYS_CONFIG", default_value = "config/feeds.toml")]
    config: PathBuf,

    /// Jetstream hosts to connect to, in failover order.
    #[arg(
        long,
        env = "NORDLYS_JETSTREAM_HOSTS",
        value_delimiter = ',',
        default_values_t = [
            "wss://jetstream1.us-east.bsky.network".to_string(),
            "wss://jetstream2.us-east.bsky.network".to_string(),
            "wss://jetstream1.us-west.bsky.network".to_string(),
            "wss://jetstream2.us-west.bsky.network".to_string(),
        ]
    )]
    jetstream_hosts: Vec<String>,

    /// Request zstd-compressed Jetstream frames.
    #[arg(
        long,
        env = "NORDLYS_JETSTREAM_COMPRESS",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    jetstream_compress: bool,

    /// Path to the static Jetstream zstd dictionary; required when
    /// compression is enabled.
    #[arg(long, env = "NORDLYS_JETSTREAM_ZSTD_DICTIONARY")]
    jetstream_zstd_dictionary: Option<PathBuf>,

    /// Collections to subscribe to.
    #[arg(
        long,
        env = "NORDLYS_JETSTREAM_WANTED_COLLECTIONS",
        value_delimiter = ',',
        default_value = "app.bsky.feed.post"
    )]
    jetstream_wanted_collections: Vec<String>,

    /// User agent for the Jetstream connection.
    #[arg(long, env = "NORDLYS_USER_AGENT")]
    user_agent: Option<String>,

    /// Number of post-processing workers.
    #[arg(long, env = "NORDLYS_WORKERS", default_value_t = 10)]
    workers: usize,

    /// Metrics HTTP server port (0 to disable).
    #[arg(long, env = "NORDLYS_METRICS_PORT", default_value_t = 9090)]
    metrics_port: u16,

    /// PostgreSQL host.
    #[arg(long, env = "NORDLYS_DB_HOST", default_value = "localhost")]
    db_host: String,

    /// PostgreSQL port.
    #[arg(long, env = "NORDLYS_DB_PORT", default_value_t = 5432)]
    db_port: u16,

    /// PostgreSQL user.
    #[arg(long, env = "NORDLYS_DB_USER", default_value = "nordlys")]
    db_user: String,

    /// PostgreSQL password.
    #[arg(long, env = "NORDLYS_DB_PASSWORD", default_value = "nordlys")]
    db_password: String,

    /// PostgreSQL database name.
    #[arg(long, env = "NORDLYS_DB_NAME", default_value = "nordlys")]
    db_name: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    if !(0.0..=1.0).contains(&args.confidence_threshold) {
        bail!(
            "confidence-threshold must be between 0 and 1, got {}",
            args.confidence_threshold
        );
    }

    tracing::info!("starting Nordlys feed generator");

    if args.metrics_port > 0 {
        let handle = init_metrics();
        start_metrics_server(args.metrics_port, handle).await?;
    }

    // The dictionary is a startup asset: fail fast, not on the first frame.
    let zstd_dictionary = if args.jetstream_compress {
        let path = args.jetstream_zstd_dictionary.as_ref().context(
            "jetstream-zstd-dictionary is required when jetstream-compress is enabled",
        )?;
        let bytes = std::fs::read(path)
            .with_context(|| format!("reading zstd dictionary from {}", path.display()))?;
        tracing::info!(path = %path.display(), size = bytes.len(), "loaded zstd dictionary");
        Some(Arc::new(bytes))
    } else {
        None
    };

    let store = Store::connect(&StoreConfig {
        host: args.db_host.clone(),
        port: args.db_port,
        user: args.db_user.clone(),
        password: args.db_password.clone(),
        database: args.db_name.clone(),
    })
    .await
    .context("connecting to PostgreSQL")?;

    store.migrate().await.context("running migrations")?;

    let feeds_config = load_feeds_config(&args.config)
        .with_context(|| format!("loading feeds config from {}", args.config.display()))?;
    let registry = Registry::compile(&feeds_config).context("compiling feed registry")?;

    let target_languages = registry.target_languages();
    match &target_languages {
        Some(languages) => {
            tracing::info!(languages = ?languages, "ingesting specific languages");
        }
        None => {
            tracing::info!(
                "a feed has no language filter, ingesting all supported languages"
            );
        }
    }

    let cursor = nordlys_serve::supervisor::derive_cursor(&store)
        .await
        .context("deriving initial cursor")?;
    tracing::info!(cursor, "initial upstream cursor");

    let jetstream_config = JetstreamConfig {
        hosts: args.jetstream_hosts.clone(),
        wanted_collections: args.jetstream_wanted_collections.clone(),
        wanted_dids: Vec::new(),
        cursor,
        compress: args.jetstream_compress,
        user_agent: args.user_agent.clone(),
    };

    let worker_config = WorkerPoolConfig {
        workers: args.workers,
        queue_capacity: nordlys_ingest::worker::DEFAULT_QUEUE_CAPACITY,
        zstd_dictionary,
        language: LanguageGateConfig {
            run_detection: args.run_language_detection,
            confidence_threshold: args.confidence_threshold,
            target_languages,
        },
    };

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    let ingest_task = tokio::spawn(nordlys_serve::supervisor::run_ingest(
        store.clone(),
        jetstream_config,
        worker_config,
        shutdown.clone(),
    ));

    let state = AppState::new(store.clone(), registry, &args.hostname);
    let app = router(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                tracing::span!(
                    Level::INFO,
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    query = request.uri().query().unwrap_or("")
                )
            }),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let bind_addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, hostname = %args.hostname, "starting server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await
        .context("serving HTTP")?;

    // The HTTP server only returns after the token fired; wait for the
    // ingestion side to drain before closing the pool.
    ingest_task
        .await
        .context("joining ingestion task")?
        .context("ingestion failed")?;

    store.close().await;
    tracing::info!("Nordlys feed generator stopped");

    Ok(())
}

/// Cancel the root token on SIGINT or SIGTERM.
fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            let mut sigterm =
                match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(signal) => signal,
                    Err(err) => {
                        tracing::error!(error = %err, "failed to install SIGTERM handler");
                        if ctrl_c.await.is_ok() {
                            shutdown.cancel();
                        }
                        return;
                    }
                };
            tokio::select! {
                _ = ctrl_c => {}
                _ = sigterm.recv() => {}
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
        }

        tracing::info!("shutdown signal received, stopping gracefully");
        shutdown.cancel();
    });
}
