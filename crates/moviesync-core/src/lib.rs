//! Synchronization layer between `moviesync-api` and view-layer consumers.
//!
//! Keeps one consistent movie list across the server, a durable local
//! cache, and in-memory session state:
//!
//! - **[`SyncCoordinator`]**: binds a session to a credential, runs the
//!   initial fetch (falling back to the cache when the server is
//!   unreachable), keeps a push subscription open, and exposes
//!   [`save`](SyncCoordinator::save) / [`delete`](SyncCoordinator::delete).
//!   Every outcome is a [`SyncEvent`] dispatched into the reducer.
//!
//! - **[`reduce`]**: the pure state machine over the closed [`SyncEvent`]
//!   set, producing immutable [`SessionState`] snapshots.
//!
//! - **[`RemoteClient`]**: CRUD over any [`MovieApi`] with write-through to
//!   a [`LocalCache`] ([`MemoryCache`] or [`FileCache`]).
//!
//! - **[`SessionStream`]**: watch-backed subscription exposing
//!   `current()` / `latest()` / `changed()` for reactive rendering.

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod push;
pub mod reducer;
pub mod remote;
pub mod state;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use cache::{CacheError, FileCache, LocalCache, MemoryCache};
pub use config::{SyncConfig, TlsVerification};
pub use coordinator::SyncCoordinator;
pub use error::CoreError;
pub use push::{PushConnector, WsConnector};
pub use reducer::{SyncEvent, reduce};
pub use remote::{MovieApi, RemoteClient};
pub use state::SessionState;
pub use stream::{SessionStream, SessionWatchStream};

// Wire types shared with the API crate.
pub use moviesync_api::{Movie, ReconnectConfig};
