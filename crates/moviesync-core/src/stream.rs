// ── Session state stream ──
//
// Subscription type for consuming session state changes.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::state::SessionState;

/// A subscription to the coordinator's session state.
///
/// Point-in-time access via [`current`](Self::current) and
/// [`latest`](Self::latest), change notification via
/// [`changed`](Self::changed) or by converting into a `Stream`.
pub struct SessionStream {
    current: Arc<SessionState>,
    receiver: watch::Receiver<Arc<SessionState>>,
}

impl SessionStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<SessionState>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Snapshot as of creation or the last [`changed`](Self::changed).
    pub fn current(&self) -> &Arc<SessionState> {
        &self.current
    }

    pub fn latest(&self) -> Arc<SessionState> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next dispatch and return the new snapshot.
    /// `None` once the coordinator is gone.
    pub async fn changed(&mut self) -> Option<Arc<SessionState>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Wait until `done` holds for the latest snapshot.
    pub async fn wait_for(
        &mut self,
        mut done: impl FnMut(&SessionState) -> bool,
    ) -> Option<Arc<SessionState>> {
        let snap = self.receiver.wait_for(|s| done(s)).await.ok()?.clone();
        self.current = snap.clone();
        Some(snap)
    }

    pub fn into_stream(self) -> SessionWatchStream {
        SessionWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter yielding a snapshot per state change.
pub struct SessionWatchStream {
    inner: WatchStream<Arc<SessionState>>,
}

impl Stream for SessionWatchStream {
    type Item = Arc<SessionState>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
