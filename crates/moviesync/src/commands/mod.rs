//! Command handlers.

pub mod logout;
pub mod movies;
pub mod watch;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use moviesync_core::cache;
use moviesync_core::{FileCache, LocalCache, SessionState, SyncCoordinator};

use crate::cli::{Command, GlobalOpts};
use crate::config::{self, Resolved};
use crate::error::CliError;

/// Route a command. Only commands that talk to the server open a session.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Logout => logout::handle(global).await,
        Command::List(args) => {
            let session = Session::open(global).await?;
            let result = movies::list(&session.coordinator, args, global, session.settle).await;
            session.finish(result).await
        }
        Command::Save(args) => {
            let session = Session::open(global).await?;
            let result = movies::save(&session.coordinator, args, global).await;
            session.finish(result).await
        }
        Command::Delete(args) => {
            let session = Session::open(global).await?;
            let result = movies::delete(&session.coordinator, args, global, session.settle).await;
            session.finish(result).await
        }
        Command::Watch => {
            let session = Session::open(global).await?;
            let result = watch::handle(&session.coordinator, global).await;
            session.finish(result).await
        }
    }
}

/// A coordinator bound to the resolved profile's token.
struct Session {
    coordinator: SyncCoordinator,
    /// How long to wait for a fetch to settle.
    settle: Duration,
}

impl Session {
    async fn open(global: &GlobalOpts) -> Result<Self, CliError> {
        let resolved = config::resolve(global)?;
        debug!(profile = %resolved.profile_name, "Opening session");
        let settle = resolved.sync.timeout * 2;
        let coordinator = open_session(resolved).await?;
        Ok(Self {
            coordinator,
            settle,
        })
    }

    async fn finish(self, result: Result<(), CliError>) -> Result<(), CliError> {
        self.coordinator.shutdown().await;
        result
    }
}

/// Open the cache, pick the token, and bind a coordinator to it.
///
/// A token given on the command line (or by the profile) is remembered in
/// the cache; without one, the remembered token is reused.
async fn open_session(resolved: Resolved) -> Result<SyncCoordinator, CliError> {
    let cache: Arc<dyn LocalCache> = Arc::new(FileCache::open(resolved.cache_dir.clone()).await?);

    let token = if let Some(token) = resolved.token {
        if let Err(e) = cache::store_credential(cache.as_ref(), &token).await {
            warn!(error = %e, "Could not remember token");
        }
        token
    } else {
        debug!("Reusing remembered token");
        cache::load_credential(cache.as_ref())
            .await?
            .ok_or(CliError::NoCredentials {
                profile: resolved.profile_name,
            })?
    };

    let coordinator = SyncCoordinator::new(&resolved.sync, cache)?;
    coordinator.set_credential(Some(token)).await;
    Ok(coordinator)
}

/// Wait for the session's fetch to settle, from the server or the cache.
async fn settle(
    coordinator: &SyncCoordinator,
    timeout: Duration,
) -> Result<Arc<SessionState>, CliError> {
    let mut stream = coordinator.subscribe();
    tokio::time::timeout(timeout, stream.wait_for(|s| s.is_loaded() && !s.fetching))
        .await
        .map_err(|_| CliError::Timeout)?
        .ok_or_else(|| CliError::Internal("coordinator stopped".into()))
}
