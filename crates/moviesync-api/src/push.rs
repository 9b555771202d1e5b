//! Push channel: server-originated movie notifications over a WebSocket.
//!
//! [`PushHandle::open`] connects, sends the authorization frame, and spawns a
//! reader task that forwards parsed [`PushMessage`]s through an `mpsc`
//! channel. The channel never reconnects on its own; [`ReconnectConfig`]
//! provides the backoff schedule for callers that want to.
//!
//! # Example
//!
//! ```rust,ignore
//! use moviesync_api::push::PushHandle;
//! use tokio_util::sync::CancellationToken;
//!
//! let mut handle = PushHandle::open(&ws_url, &token, &CancellationToken::new()).await?;
//! while let Some(msg) = handle.recv().await {
//!     println!("{}: {}", msg.kind, msg.payload);
//! }
//! handle.close();
//! ```

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::Error;
use crate::models::{AuthorizationFrame, PushMessage};

// ── Channel capacity ─────────────────────────────────────────────────

const MESSAGE_CHANNEL_CAPACITY: usize = 256;

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for push channel reconnection.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

impl ReconnectConfig {
    /// Whether another attempt is allowed after `attempt` failures.
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_retries.is_none_or(|max| attempt < max)
    }

    /// Exponential backoff with jitter.
    ///
    /// `delay = min(initial * 2^attempt, max) * (1 +- 0.25)`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base = self.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
        let capped = base.min(self.max_delay.as_secs_f64());

        // Deterministic jitter seeded from the attempt number.
        let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
        Duration::from_secs_f64((capped * jitter_factor).max(0.0))
    }
}

// ── PushHandle ───────────────────────────────────────────────────────

/// Receiving end of an open push channel.
///
/// Closing is idempotent. Once [`close`](Self::close) has been called,
/// [`recv`](Self::recv) returns `None`, even if a message was already
/// buffered. Dropping the handle closes the channel.
pub struct PushHandle {
    messages: mpsc::Receiver<PushMessage>,
    cancel: CancellationToken,
}

impl PushHandle {
    /// Wrap an existing message receiver. The reader side must stop
    /// forwarding once `cancel` fires.
    pub fn new(messages: mpsc::Receiver<PushMessage>, cancel: CancellationToken) -> Self {
        Self { messages, cancel }
    }

    /// Connect to `ws_url`, authorize with `token`, and start reading.
    ///
    /// Resolves once the connection is up and the authorization frame is
    /// sent. The channel closes when `parent` is cancelled or
    /// [`close`](Self::close) is called.
    pub async fn open(
        ws_url: &Url,
        token: &SecretString,
        parent: &CancellationToken,
    ) -> Result<Self, Error> {
        info!(url = %ws_url, "Connecting push channel");

        let (mut ws, _response) = tokio_tungstenite::connect_async(ws_url.as_str())
            .await
            .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

        let frame = serde_json::to_string(&AuthorizationFrame::new(token.expose_secret()))
            .map_err(|e| Error::WebSocketSend(e.to_string()))?;
        ws.send(Message::Text(frame.into()))
            .await
            .map_err(|e| Error::WebSocketSend(e.to_string()))?;

        info!("Push channel connected and authorized");

        let cancel = parent.child_token();
        let (tx, rx) = mpsc::channel(MESSAGE_CHANNEL_CAPACITY);
        tokio::spawn(read_loop(ws, tx, cancel.clone()));

        Ok(Self::new(rx, cancel))
    }

    /// Next inbound message, or `None` once closed or disconnected.
    pub async fn recv(&mut self) -> Option<PushMessage> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            msg = self.messages.recv() => msg,
        }
    }

    /// Close the channel. Safe to call more than once.
    pub fn close(&self) {
        if !self.cancel.is_cancelled() {
            debug!("Closing push channel");
        }
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for PushHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Reader task ──────────────────────────────────────────────────────

/// Read frames until close, error, or cancellation.
async fn read_loop<S>(
    mut ws: WebSocketStream<S>,
    tx: mpsc::Sender<PushMessage>,
    cancel: CancellationToken,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                if let Err(e) = ws.close(None).await {
                    trace!(error = %e, "Push channel close handshake failed");
                }
                break;
            }
            frame = ws.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        let Some(msg) = parse_message(&text) else { continue };
                        tokio::select! {
                            biased;
                            () = cancel.cancelled() => break,
                            sent = tx.send(msg) => {
                                if sent.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Ping(_))) => {
                        // tungstenite handles pong replies automatically
                        trace!("Push channel ping");
                    }
                    Some(Ok(Message::Close(frame))) => {
                        if let Some(ref cf) = frame {
                            info!(code = %cf.code, reason = %cf.reason, "Push channel closed by server");
                        } else {
                            info!("Push channel closed by server (no payload)");
                        }
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "Push channel error");
                        break;
                    }
                    None => {
                        info!("Push channel stream ended");
                        break;
                    }
                    Some(Ok(_)) => {
                        // Binary, Pong, Frame -- ignore
                    }
                }
            }
        }
    }

    debug!("Push channel reader exiting");
}

// ── Message parsing ──────────────────────────────────────────────────

/// Parse a text frame into a push envelope, logging and skipping garbage.
fn parse_message(text: &str) -> Option<PushMessage> {
    match serde_json::from_str::<PushMessage>(text) {
        Ok(msg) => {
            debug!(kind = %msg.kind, "Push message received");
            Some(msg)
        }
        Err(e) => {
            debug!(error = %e, "Failed to parse push message");
            None
        }
    }
}

/// Derive the push URL from the HTTP server URL: `http -> ws`,
/// `https -> wss`, root path.
pub fn push_url_for(server: &Url) -> Result<Url, Error> {
    let scheme = match server.scheme() {
        "https" | "wss" => "wss",
        _ => "ws",
    };
    let host = server
        .host_str()
        .ok_or(Error::InvalidUrl(url::ParseError::EmptyHost))?;
    let full = match server.port() {
        Some(port) => format!("{scheme}://{host}:{port}/"),
        None => format!("{scheme}://{host}/"),
    };
    Ok(Url::parse(&full)?)
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_reconnect_config() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert!(config.max_retries.is_none());
        assert!(config.allows(10_000));
    }

    #[test]
    fn backoff_increases_exponentially() {
        let config = ReconnectConfig::default();
        let d0 = config.delay_for(0);
        let d1 = config.delay_for(1);
        let d2 = config.delay_for(2);
        assert!(d1 > d0, "d1 ({d1:?}) should be greater than d0 ({d0:?})");
        assert!(d2 > d1, "d2 ({d2:?}) should be greater than d1 ({d1:?})");
    }

    #[test]
    fn backoff_caps_at_max_delay() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            max_retries: Some(3),
        };
        // With jitter factor up to 1.25, max effective is 12.5s
        assert!(config.delay_for(10) <= Duration::from_secs(13));
        assert!(config.allows(2));
        assert!(!config.allows(3));
    }

    #[test]
    fn parse_known_message() {
        let msg = parse_message(
            r#"{"type":"created","payload":{"_id":"1","title":"A","investment":1,"releaseDate":"01.01.2020","hasSequel":false}}"#,
        )
        .unwrap();
        assert_eq!(msg.kind, "created");
        assert_eq!(msg.movie().unwrap().id(), Some("1"));
    }

    #[test]
    fn parse_malformed_message_is_skipped() {
        assert!(parse_message("not json at all").is_none());
        assert!(parse_message(r#"{"payload":{}}"#).is_none());
    }

    #[test]
    fn push_url_follows_scheme() {
        let http = Url::parse("http://localhost:3000/api").unwrap();
        assert_eq!(push_url_for(&http).unwrap().as_str(), "ws://localhost:3000/");

        let https = Url::parse("https://movies.example.com").unwrap();
        assert_eq!(push_url_for(&https).unwrap().as_str(), "wss://movies.example.com/");
    }

    #[tokio::test]
    async fn recv_returns_none_after_close_even_with_buffered_message() {
        let (tx, rx) = mpsc::channel(4);
        let handle_cancel = CancellationToken::new();
        let mut handle = PushHandle::new(rx, handle_cancel);

        tx.send(PushMessage {
            kind: "created".into(),
            payload: serde_json::Value::Null,
        })
        .await
        .unwrap();

        handle.close();
        handle.close();
        assert!(handle.is_closed());
        assert!(handle.recv().await.is_none());
    }

    #[tokio::test]
    async fn recv_delivers_until_sender_drops() {
        let (tx, rx) = mpsc::channel(4);
        let mut handle = PushHandle::new(rx, CancellationToken::new());

        tx.send(PushMessage {
            kind: "updated".into(),
            payload: serde_json::Value::Null,
        })
        .await
        .unwrap();
        drop(tx);

        assert_eq!(handle.recv().await.unwrap().kind, "updated");
        assert!(handle.recv().await.is_none());
    }
}
