// ── Synchronization reducer ──
//
// Pure `(state, event) -> state`. The coordinator owns every side effect
// and feeds the outcomes in here.

use moviesync_api::Movie;

use crate::error::CoreError;
use crate::state::SessionState;

/// Everything that can change session state.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    FetchStarted,
    FetchSucceeded(Vec<Movie>),
    /// Carries the list rebuilt from the local cache.
    FetchFailed(Vec<Movie>),
    SaveStarted,
    /// Also produced by push `created`/`updated` messages.
    SaveSucceeded(Movie),
    SaveFailed(CoreError),
    DeleteStarted,
    /// Carries the movie the caller asked to delete.
    DeleteSucceeded(Movie),
    DeleteFailed(CoreError),
}

impl SyncEvent {
    /// Short name for log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FetchStarted => "fetch_started",
            Self::FetchSucceeded(_) => "fetch_succeeded",
            Self::FetchFailed(_) => "fetch_failed",
            Self::SaveStarted => "save_started",
            Self::SaveSucceeded(_) => "save_succeeded",
            Self::SaveFailed(_) => "save_failed",
            Self::DeleteStarted => "delete_started",
            Self::DeleteSucceeded(_) => "delete_succeeded",
            Self::DeleteFailed(_) => "delete_failed",
        }
    }
}

/// Apply one event.
///
/// `FetchFailed` never sets `fetch_error`. A failed read degrades to
/// cached data and reports no error.
pub fn reduce(state: &SessionState, event: SyncEvent) -> SessionState {
    let mut next = state.clone();
    match event {
        SyncEvent::FetchStarted => {
            next.fetching = true;
            next.fetch_error = None;
        }
        SyncEvent::FetchSucceeded(records) | SyncEvent::FetchFailed(records) => {
            next.records = Some(records);
            next.fetching = false;
        }
        SyncEvent::SaveStarted => {
            next.saving = true;
            next.save_error = None;
        }
        SyncEvent::SaveSucceeded(movie) => {
            upsert(next.records.get_or_insert_with(Vec::new), movie);
            next.saving = false;
        }
        SyncEvent::SaveFailed(error) => {
            next.save_error = Some(error);
            next.saving = false;
        }
        SyncEvent::DeleteStarted => {
            next.deleting = true;
            next.delete_error = None;
        }
        SyncEvent::DeleteSucceeded(movie) => {
            if let Some(records) = next.records.as_mut() {
                records.retain(|m| !m.same_entity(&movie));
            }
            next.deleting = false;
        }
        SyncEvent::DeleteFailed(error) => {
            next.delete_error = Some(error);
            next.deleting = false;
        }
    }
    next
}

/// Replace in place when the id is already present, otherwise prepend.
fn upsert(records: &mut Vec<Movie>, movie: Movie) {
    match records.iter_mut().find(|m| m.same_entity(&movie)) {
        Some(slot) => *slot = movie,
        None => records.insert(0, movie),
    }
}
