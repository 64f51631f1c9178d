//! Ingestion supervision: task spawning, the liveness watchdog, and cursor
//! recovery.
//!
//! The streaming client and the worker pool are separate tasks joined by
//! one bounded queue. The watchdog fires every 15 minutes; if no post was
//! accepted since the previous tick it cancels the streaming task,
//! recomputes the resume cursor from the store watermark, and resubscribes.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use nordlys_ingest::{jetstream, JetstreamConfig, WorkerPool, WorkerPoolConfig};
use nordlys_store::{Store, StoreResult};

/// How often the watchdog checks for progress, and how long the ingest
/// path may be silent before the stream is restarted.
pub const WATCHDOG_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Overlap subtracted from the store watermark when resuming, absorbing
/// reordered writes around the crash point. Duplicates in the window are
/// handled by the idempotent upsert.
const CURSOR_OVERLAP: chrono::Duration = chrono::Duration::seconds(10);

/// Derive the upstream resume cursor (microseconds) from the store
/// watermark; 0 when the store is empty.
pub async fn derive_cursor(store: &Store) -> StoreResult<i64> {
    Ok(store
        .get_latest_post_timestamp()
        .await?
        .map(|latest| (latest - CURSOR_OVERLAP).timestamp_micros())
        .unwrap_or(0))
}

/// Whether the ingest path has been silent for a full watchdog interval.
fn is_stale(last_activity_unix: i64, now_unix: i64) -> bool {
    now_unix.saturating_sub(last_activity_unix) > WATCHDOG_INTERVAL.as_secs() as i64
}

/// Run the full ingestion side until `shutdown` fires: worker pool,
/// streaming client, and watchdog.
pub async fn run_ingest(
    store: Store,
    jetstream_config: JetstreamConfig,
    worker_config: WorkerPoolConfig,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let activity = Arc::new(AtomicI64::new(Utc::now().timestamp()));

    let pool = WorkerPool::spawn(
        worker_config,
        store.clone(),
        Arc::clone(&activity),
        shutdown.clone(),
    );
    let sender = pool.sender();

    let mut stream_token = shutdown.child_token();
    let mut stream_task = spawn_stream(jetstream_config.clone(), &sender, &stream_token);

    let mut watchdog = tokio::time::interval_at(
        tokio::time::Instant::now() + WATCHDOG_INTERVAL,
        WATCHDOG_INTERVAL,
    );

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,

            _ = watchdog.tick() => {
                let now = Utc::now().timestamp();
                let last = activity.load(Ordering::Relaxed);
                if !is_stale(last, now) {
                    continue;
                }

                tracing::warn!(
                    last_activity = last,
                    "firehose inactive for a full watchdog interval, restarting connection"
                );

                stream_token.cancel();
                let _ = (&mut stream_task).await;

                let mut config = jetstream_config.clone();
                config.cursor = derive_cursor(&store)
                    .await
                    .context("recomputing resume cursor")?;

                stream_token = shutdown.child_token();
                stream_task = spawn_stream(config, &sender, &stream_token);

                // The restart itself counts as activity; give the new
                // connection a full interval before judging it.
                activity.store(now, Ordering::Relaxed);
            }

            result = &mut stream_task => {
                match result {
                    Ok(Ok(())) => {
                        // The client only returns cleanly on cancellation.
                        drop(sender);
                        pool.join().await;
                        tracing::info!("ingestion stopped");
                        return Ok(());
                    }
                    Ok(Err(err)) => {
                        // Configuration errors: nothing a reconnect fixes.
                        shutdown.cancel();
                        pool.join().await;
                        return Err(err).context("jetstream subscription failed");
                    }
                    Err(join_err) => {
                        tracing::error!(error = %join_err, "streaming task aborted, resubscribing");
                        stream_token = shutdown.child_token();
                        stream_task =
                            spawn_stream(jetstream_config.clone(), &sender, &stream_token);
                    }
                }
            }
        }
    }

    // Drain: stop the reader first, then let the workers empty the queue.
    stream_token.cancel();
    let _ = stream_task.await;
    drop(sender);
    pool.join().await;

    tracing::info!("ingestion stopped");
    Ok(())
}

fn spawn_stream(
    config: JetstreamConfig,
    sender: &tokio::sync::mpsc::Sender<nordlys_core::RawMessage>,
    token: &CancellationToken,
) -> JoinHandle<nordlys_ingest::IngestResult<()>> {
    tokio::spawn(jetstream::run(config, sender.clone(), token.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Staleness decision
    // =========================================================================

    #[test]
    fn fresh_activity_is_not_stale() {
        assert!(!is_stale(1000, 1000));
        assert!(!is_stale(1000, 1000 + 900));
    }

    #[test]
    fn silence_past_the_interval_is_stale() {
        assert!(is_stale(1000, 1000 + 901));
    }

    #[test]
    fn clock_going_backwards_is_not_stale() {
        assert!(!is_stale(2000, 1000));
    }
}
