//! The Jetstream streaming client.
//!
//! Maintains exactly one live websocket connection drawn from an ordered
//! list of candidate hosts and forwards every received frame into the
//! worker queue. Dial failures fail over to the next host; read failures
//! reconnect with exponential backoff; the client never gives up while the
//! cancellation token is live.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{ACCEPT_ENCODING, USER_AGENT};
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use url::Url;

use nordlys_core::{MessageKind, RawMessage};

use crate::backoff::ExponentialBackoff;
use crate::{IngestError, IngestResult};

const READ_TIMEOUT: Duration = Duration::from_secs(60);
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);
const PING_INTERVAL: Duration = Duration::from_secs(30);

const BACKOFF_INITIAL: Duration = Duration::from_millis(100);
const BACKOFF_MULTIPLIER: f64 = 1.5;
const BACKOFF_MAX: Duration = Duration::from_secs(30);

/// Back-off after a clean close; the peer asked us to go away, not to hammer.
const NORMAL_CLOSE_DELAY: Duration = Duration::from_secs(1);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Configuration for the Jetstream connection.
#[derive(Debug, Clone, Default)]
pub struct JetstreamConfig {
    /// Jetstream endpoints to try in order, e.g.
    /// `wss://jetstream1.us-east.bsky.network`.
    pub hosts: Vec<String>,
    pub wanted_collections: Vec<String>,
    pub wanted_dids: Vec<String>,
    /// Resume cursor in microseconds; 0 tails live.
    pub cursor: i64,
    /// Request zstd-compressed frames.
    pub compress: bool,
    pub user_agent: Option<String>,
}

/// How a live connection ended.
enum ConnectionEnd {
    /// Root context cancelled; stop cleanly, do not reconnect.
    Cancelled,
    /// Normal or going-away close from the peer.
    NormalClose,
    /// Read error, timeout, EOF, or ping failure.
    Error,
}

/// Build the subscribe URL for one host.
pub fn subscribe_url(host: &str, config: &JetstreamConfig) -> IngestResult<Url> {
    let raw = format!("{}/subscribe", host.trim_end_matches('/'));
    let mut url = Url::parse(&raw).map_err(|source| IngestError::InvalidUrl { url: raw, source })?;

    {
        let mut query = url.query_pairs_mut();
        for collection in &config.wanted_collections {
            query.append_pair("wantedCollections", collection);
        }
        for did in &config.wanted_dids {
            query.append_pair("wantedDids", did);
        }
        if config.cursor != 0 {
            query.append_pair("cursor", &config.cursor.to_string());
        }
        if config.compress {
            query.append_pair("compress", "true");
        }
    }

    Ok(url)
}

/// Subscribe and pump frames into `queue` until cancelled.
///
/// Returns `Err` only for configuration problems (no hosts, malformed host
/// URL); every runtime failure is handled by reconnecting.
pub async fn run(
    config: JetstreamConfig,
    queue: mpsc::Sender<RawMessage>,
    shutdown: CancellationToken,
) -> IngestResult<()> {
    if config.hosts.is_empty() {
        return Err(IngestError::NoHosts);
    }

    tracing::info!(hosts = ?config.hosts, cursor = config.cursor, "subscribing to Jetstream");

    let mut host_idx = 0;
    let mut backoff = ExponentialBackoff::new(BACKOFF_INITIAL, BACKOFF_MULTIPLIER, BACKOFF_MAX);

    loop {
        if shutdown.is_cancelled() {
            return Ok(());
        }

        let host = &config.hosts[host_idx];
        metrics::counter!("jetstream_connection_attempts_total").increment(1);

        let stream = match connect(host, &config).await {
            Ok(stream) => stream,
            Err(err) => {
                metrics::counter!("jetstream_connection_errors_total").increment(1);
                tracing::error!(host = %host, error = %err, "error connecting to Jetstream host");

                let next_idx = (host_idx + 1) % config.hosts.len();
                if next_idx != host_idx {
                    tracing::info!(
                        from = %config.hosts[host_idx],
                        to = %config.hosts[next_idx],
                        "switching Jetstream host"
                    );
                    metrics::counter!("jetstream_host_switches_total").increment(1);
                    host_idx = next_idx;
                    backoff.reset();
                    continue;
                }

                // Single host, or wrapped the whole list: wait before retrying.
                if sleep_cancellable(backoff.next_delay(), &shutdown).await {
                    return Ok(());
                }
                continue;
            }
        };

        tracing::info!(host = %host, "connected to Jetstream");
        backoff.reset();
        metrics::gauge!("jetstream_connected").set(1.0);

        let outcome = consume(stream, &queue, &shutdown).await;
        metrics::gauge!("jetstream_connected").set(0.0);

        match outcome {
            ConnectionEnd::Cancelled => return Ok(()),
            ConnectionEnd::NormalClose => {
                if sleep_cancellable(NORMAL_CLOSE_DELAY, &shutdown).await {
                    return Ok(());
                }
            }
            ConnectionEnd::Error => {
                metrics::counter!("jetstream_connection_errors_total").increment(1);
                if sleep_cancellable(backoff.next_delay(), &shutdown).await {
                    return Ok(());
                }
            }
        }
    }
}

/// Dial one host with the configured headers.
async fn connect(host: &str, config: &JetstreamConfig) -> IngestResult<WsStream> {
    let url = subscribe_url(host, config)?;
    let mut request = url.as_str().into_client_request()?;

    if let Some(user_agent) = &config.user_agent {
        if let Ok(value) = HeaderValue::from_str(user_agent) {
            request.headers_mut().insert(USER_AGENT, value);
        }
    }
    if config.compress {
        request
            .headers_mut()
            .insert(ACCEPT_ENCODING, HeaderValue::from_static("zstd"));
    }

    let (stream, _response) = connect_async(request).await?;
    Ok(stream)
}

/// Read frames off a live connection until it ends.
async fn consume(
    mut stream: WsStream,
    queue: &mpsc::Sender<RawMessage>,
    shutdown: &CancellationToken,
) -> ConnectionEnd {
    let mut ping = tokio::time::interval_at(
        tokio::time::Instant::now() + PING_INTERVAL,
        PING_INTERVAL,
    );

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                let _ = stream.close(None).await;
                return ConnectionEnd::Cancelled;
            }

            _ = ping.tick() => {
                tracing::debug!("sending ping to check connection");
                let write = stream.send(Message::Ping(Vec::new().into()));
                match tokio::time::timeout(WRITE_TIMEOUT, write).await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        tracing::warn!(error = %err, "ping failed, closing connection for restart");
                        let _ = stream.close(None).await;
                        return ConnectionEnd::Error;
                    }
                    Err(_) => {
                        tracing::warn!("ping write deadline exceeded, closing connection");
                        let _ = stream.close(None).await;
                        return ConnectionEnd::Error;
                    }
                }
            }

            // Every received frame, control frames included, re-arms the
            // read deadline because the timeout is created per read.
            frame = tokio::time::timeout(READ_TIMEOUT, stream.next()) => {
                match frame {
                    Err(_) => {
                        tracing::warn!("read deadline exceeded, reconnecting");
                        let _ = stream.close(None).await;
                        return ConnectionEnd::Error;
                    }
                    Ok(None) => {
                        tracing::warn!("connection closed by server");
                        return ConnectionEnd::Error;
                    }
                    Ok(Some(Err(err))) => {
                        tracing::error!(error = %err, "websocket read error");
                        return ConnectionEnd::Error;
                    }
                    Ok(Some(Ok(message))) => {
                        let raw = match message {
                            Message::Text(text) => RawMessage {
                                kind: MessageKind::Text,
                                bytes: text.as_bytes().to_vec(),
                            },
                            Message::Binary(bytes) => RawMessage {
                                kind: MessageKind::Binary,
                                bytes: bytes.to_vec(),
                            },
                            Message::Ping(_) | Message::Pong(_) => {
                                tracing::trace!("received control frame");
                                continue;
                            }
                            Message::Close(frame) => {
                                let normal = frame
                                    .as_ref()
                                    .map(|f| {
                                        f.code == CloseCode::Normal || f.code == CloseCode::Away
                                    })
                                    .unwrap_or(true);
                                tracing::info!(frame = ?frame, "websocket closed by peer");
                                return if normal {
                                    ConnectionEnd::NormalClose
                                } else {
                                    ConnectionEnd::Error
                                };
                            }
                            _ => continue,
                        };

                        metrics::counter!("jetstream_frames_total").increment(1);

                        // Blocking on a full queue is the backpressure path.
                        if queue.send(raw).await.is_err() {
                            tracing::warn!("worker queue closed, stopping reader");
                            let _ = stream.close(None).await;
                            return ConnectionEnd::Cancelled;
                        }
                    }
                }
            }
        }
    }
}

/// Sleep unless cancelled first; returns true when cancelled.
async fn sleep_cancellable(delay: Duration, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => true,
        _ = tokio::time::sleep(delay) => false,
    }
}
