// ── Sync coordinator ──
//
// Owns session state and binds it to the active credential. Remote calls,
// cache fallbacks and push messages all end up as reducer dispatches
// tagged with the session they were started under; a dispatch from a
// session that is no longer current is dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use moviesync_api::{Movie, MovieClient, ReconnectConfig};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::{self, LocalCache};
use crate::config::SyncConfig;
use crate::error::CoreError;
use crate::push::{self, PushConnector, WsConnector};
use crate::reducer::{SyncEvent, reduce};
use crate::remote::RemoteClient;
use crate::state::SessionState;
use crate::stream::SessionStream;

// ── SyncCoordinator ──────────────────────────────────────────────

/// The entry point for the view layer.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`. Call
/// [`set_credential`](Self::set_credential) to start a session, then
/// [`save`](Self::save) / [`delete`](Self::delete) and render whatever
/// [`state`](Self::state) or [`subscribe`](Self::subscribe) yields.
/// Failures never surface as `Err`; they land in the state's error fields.
#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    remote: RemoteClient,
    push: Arc<dyn PushConnector>,
    reconnect: Option<ReconnectConfig>,
    state: watch::Sender<Arc<SessionState>>,
    /// The current session. Held while applying a dispatch so a session
    /// switch and a dispatch never interleave.
    session: Mutex<Option<Session>>,
    next_session: AtomicU64,
    /// Parent of every session token. Cancelled by `shutdown`.
    cancel: CancellationToken,
}

struct Session {
    ticket: Ticket,
    tasks: Vec<JoinHandle<()>>,
}

/// What an in-flight operation needs to know about the session it
/// belongs to.
#[derive(Clone)]
struct Ticket {
    id: u64,
    token: SecretString,
    cancel: CancellationToken,
}

impl SyncCoordinator {
    /// Build a coordinator talking HTTP and WebSocket to the configured
    /// server. No session is started until a credential is set.
    pub fn new(config: &SyncConfig, cache: Arc<dyn LocalCache>) -> Result<Self, CoreError> {
        let client = MovieClient::new(config.server_url.clone(), &config.transport())?;
        let remote = RemoteClient::new(Arc::new(client), cache);
        let push = Arc::new(WsConnector::new(config.push_url.clone()));
        Ok(Self::from_parts(remote, push, config.push_reconnect.clone()))
    }

    /// Build from explicit collaborators.
    pub fn from_parts(
        remote: RemoteClient,
        push: Arc<dyn PushConnector>,
        reconnect: Option<ReconnectConfig>,
    ) -> Self {
        let (state, _) = watch::channel(Arc::new(SessionState::default()));
        Self {
            inner: Arc::new(CoordinatorInner {
                remote,
                push,
                reconnect,
                state,
                session: Mutex::new(None),
                next_session: AtomicU64::new(0),
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn cache(&self) -> &Arc<dyn LocalCache> {
        self.inner.remote.cache()
    }

    // ── Session lifecycle ────────────────────────────────────────

    /// Bind the coordinator to a credential.
    ///
    /// Always ends the current session and resets state. A present,
    /// non-blank credential then starts a new session: an initial fetch
    /// and a push subscription run in the background.
    pub async fn set_credential(&self, credential: Option<SecretString>) {
        let credential = credential.filter(|c| !c.expose_secret().trim().is_empty());

        let mut session = self.inner.session.lock().await;
        if let Some(old) = session.take() {
            info!(session = old.ticket.id, "Ending session");
            old.ticket.cancel.cancel();
        }
        self.inner
            .state
            .send_replace(Arc::new(SessionState::default()));

        let Some(token) = credential else {
            debug!("No credential, coordinator idle");
            return;
        };

        let ticket = Ticket {
            id: self.inner.next_session.fetch_add(1, Ordering::Relaxed) + 1,
            token,
            cancel: self.inner.cancel.child_token(),
        };
        info!(session = ticket.id, "Starting session");

        let tasks = vec![
            tokio::spawn(fetch_task(self.clone(), ticket.clone())),
            tokio::spawn(push_task(self.clone(), ticket.clone())),
        ];
        *session = Some(Session { ticket, tasks });
    }

    /// Whether a credential is bound.
    pub async fn has_session(&self) -> bool {
        self.inner.session.lock().await.is_some()
    }

    /// End the session, stop all background work, and wait for it.
    ///
    /// Terminal: sessions started afterwards are cancelled from the start.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let session = self.inner.session.lock().await.take();
        self.inner
            .state
            .send_replace(Arc::new(SessionState::default()));

        if let Some(session) = session {
            for handle in session.tasks {
                if let Err(e) = handle.await {
                    warn!(error = %e, "Session task ended abnormally");
                }
            }
        }
        info!("Coordinator shut down");
    }

    // ── State ────────────────────────────────────────────────────

    /// Latest state snapshot.
    pub fn state(&self) -> Arc<SessionState> {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> SessionStream {
        SessionStream::new(self.inner.state.subscribe())
    }

    // ── Operations ───────────────────────────────────────────────

    /// Re-run the fetch routine for the current session.
    pub async fn refresh(&self) {
        match self.current_ticket().await {
            Some(ticket) => self.fetch(&ticket).await,
            None => debug!("Refresh without a session ignored"),
        }
    }

    /// Create (no id) or update (with id) a movie.
    ///
    /// Returns the server-confirmed movie once it is in state; `None` when
    /// the save failed (see `save_error`), no session is bound, or the
    /// session ended meanwhile. Without a session state is left alone.
    pub async fn save(&self, movie: Movie) -> Option<Movie> {
        let Some(ticket) = self.current_ticket().await else {
            warn!(error = %CoreError::NotAuthenticated, "Save ignored");
            return None;
        };
        self.dispatch(&ticket, SyncEvent::SaveStarted).await;

        let remote = &self.inner.remote;
        let result = if movie.id().is_some() {
            remote.update(&ticket.token, &movie).await
        } else {
            remote.create(&ticket.token, &movie).await
        };

        match result {
            Ok(saved) => self
                .dispatch(&ticket, SyncEvent::SaveSucceeded(saved.clone()))
                .await
                .then_some(saved),
            Err(e) => {
                warn!(error = %e, title = %movie.title, "Save failed");
                self.dispatch(&ticket, SyncEvent::SaveFailed(e)).await;
                None
            }
        }
    }

    /// Delete a movie. On success the state drops the entry matching the
    /// movie passed in. Returns whether the delete landed. Without a
    /// session nothing is dispatched.
    pub async fn delete(&self, movie: Movie) -> bool {
        let Some(ticket) = self.current_ticket().await else {
            warn!(error = %CoreError::NotAuthenticated, "Delete ignored");
            return false;
        };
        self.dispatch(&ticket, SyncEvent::DeleteStarted).await;

        match self.inner.remote.remove(&ticket.token, &movie).await {
            Ok(()) => {
                self.dispatch(&ticket, SyncEvent::DeleteSucceeded(movie))
                    .await
            }
            Err(e) => {
                warn!(error = %e, id = ?movie.id(), "Delete failed");
                self.dispatch(&ticket, SyncEvent::DeleteFailed(e)).await;
                false
            }
        }
    }

    // ── Internals ────────────────────────────────────────────────

    async fn current_ticket(&self) -> Option<Ticket> {
        self.inner
            .session
            .lock()
            .await
            .as_ref()
            .map(|s| s.ticket.clone())
    }

    /// The single fetch routine: remote list, or the cache fallback.
    async fn fetch(&self, ticket: &Ticket) {
        if !self.dispatch(ticket, SyncEvent::FetchStarted).await {
            return;
        }

        let event = match self.inner.remote.fetch_all(&ticket.token).await {
            Ok(movies) => SyncEvent::FetchSucceeded(movies),
            Err(e) => {
                warn!(error = %e, "Fetch failed, serving cached movies");
                let fallback = cache::load_fallback(self.cache().as_ref()).await;
                SyncEvent::FetchFailed(fallback)
            }
        };
        self.dispatch(ticket, event).await;
    }

    /// Apply `event` if `ticket` still names the current session.
    async fn dispatch(&self, ticket: &Ticket, event: SyncEvent) -> bool {
        let session = self.inner.session.lock().await;
        let current = session.as_ref().map(|s| s.ticket.id);
        let live = current == Some(ticket.id) && !ticket.cancel.is_cancelled();

        if !live {
            debug!(event = event.name(), "Dropping stale dispatch");
            return false;
        }

        debug!(session = ?current, event = event.name(), "Dispatch");
        self.inner.state.send_modify(|state| {
            let next = reduce(state, event);
            *state = Arc::new(next);
        });
        true
    }
}

// ── Background tasks ─────────────────────────────────────────────

async fn fetch_task(coordinator: SyncCoordinator, ticket: Ticket) {
    tokio::select! {
        biased;
        () = ticket.cancel.cancelled() => debug!(session = ticket.id, "Initial fetch cancelled"),
        () = coordinator.fetch(&ticket) => {}
    }
}

/// Keep a push channel open for the session, reconnecting with backoff
/// when a policy is configured.
async fn push_task(coordinator: SyncCoordinator, ticket: Ticket) {
    let inner = &coordinator.inner;
    let mut attempt: u32 = 0;

    loop {
        let opened = tokio::select! {
            biased;
            () = ticket.cancel.cancelled() => return,
            opened = inner.push.open(&ticket.token, &ticket.cancel) => opened,
        };

        match opened {
            Ok(mut handle) => {
                attempt = 0;
                while let Some(message) = handle.recv().await {
                    let Some(event) = push::event_for(&message) else {
                        continue;
                    };
                    if !coordinator.dispatch(&ticket, event).await {
                        handle.close();
                        return;
                    }
                }
                debug!(session = ticket.id, "Push channel ended");
            }
            Err(e) => {
                warn!(session = ticket.id, error = %CoreError::from(e), "Push channel unavailable");
            }
        }

        if ticket.cancel.is_cancelled() {
            return;
        }
        let Some(policy) = inner.reconnect.as_ref() else {
            return;
        };
        if !policy.allows(attempt) {
            warn!(session = ticket.id, attempt, "Giving up on push channel");
            return;
        }

        let delay = policy.delay_for(attempt);
        attempt += 1;
        info!(session = ticket.id, attempt, ?delay, "Reconnecting push channel");
        tokio::select! {
            biased;
            () = ticket.cancel.cancelled() => return,
            () = tokio::time::sleep(delay) => {}
        }
    }
}
