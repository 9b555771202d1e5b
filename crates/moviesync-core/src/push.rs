// ── Push channel seam ──
//
// Opens push channels for the coordinator and translates inbound
// messages into reducer events.

use async_trait::async_trait;
use moviesync_api::{PushHandle, PushKind, PushMessage};
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::reducer::SyncEvent;

/// Opens one authorized push channel per call.
#[async_trait]
pub trait PushConnector: Send + Sync {
    /// The returned handle closes when `parent` is cancelled.
    async fn open(
        &self,
        token: &SecretString,
        parent: &CancellationToken,
    ) -> Result<PushHandle, moviesync_api::Error>;
}

/// WebSocket connector for a fixed push URL.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: Url,
}

impl WsConnector {
    pub fn new(url: Url) -> Self {
        Self { url }
    }
}

#[async_trait]
impl PushConnector for WsConnector {
    async fn open(
        &self,
        token: &SecretString,
        parent: &CancellationToken,
    ) -> Result<PushHandle, moviesync_api::Error> {
        PushHandle::open(&self.url, token, parent).await
    }
}

/// Translate a push message into a reducer event.
///
/// `created` and `updated` both become [`SyncEvent::SaveSucceeded`] so
/// remote changes share the local save path. Anything else, including a
/// payload that is not a movie, yields `None`.
pub fn event_for(message: &PushMessage) -> Option<SyncEvent> {
    match message.kind() {
        PushKind::Created | PushKind::Updated => match message.movie() {
            Ok(movie) => Some(SyncEvent::SaveSucceeded(movie)),
            Err(e) => {
                warn!(kind = %message.kind, error = %e, "Push payload is not a movie");
                None
            }
        },
        PushKind::Other => {
            debug!(kind = %message.kind, "Ignoring push message");
            None
        }
    }
}
