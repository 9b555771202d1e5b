// ── Session state ──
//
// Immutable snapshot of everything the view layer renders. Only the
// reducer produces new snapshots.

use moviesync_api::Movie;

use crate::error::CoreError;

/// Observable state of one authenticated session.
///
/// `records` is `None` until the first fetch settles. Order is insertion
/// order (new movies are prepended), never sorted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub records: Option<Vec<Movie>>,
    pub fetching: bool,
    pub fetch_error: Option<CoreError>,
    pub saving: bool,
    pub save_error: Option<CoreError>,
    pub deleting: bool,
    pub delete_error: Option<CoreError>,
}

impl SessionState {
    /// Look up a loaded movie by id.
    pub fn movie(&self, id: &str) -> Option<&Movie> {
        self.records
            .as_deref()?
            .iter()
            .find(|m| m.id() == Some(id))
    }

    /// The first `limit` movies in state order.
    pub fn window(&self, limit: usize) -> &[Movie] {
        let records = self.records.as_deref().unwrap_or_default();
        &records[..limit.min(records.len())]
    }

    pub fn is_loaded(&self) -> bool {
        self.records.is_some()
    }

    pub fn is_busy(&self) -> bool {
        self.fetching || self.saving || self.deleting
    }
}
