// ── Local cache ──
//
// Durable key-value persistence for the last known-good server records.
// One entry per movie id holding the JSON-serialized movie, plus one
// reserved entry holding the session credential. The cache is only ever
// read back as a degraded-mode fallback when the server is unreachable.

mod file;
mod memory;

use async_trait::async_trait;
use moviesync_api::Movie;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::CoreError;

pub use file::FileCache;
pub use memory::MemoryCache;

/// Reserved key holding the session credential. Never a movie.
pub const CREDENTIAL_KEY: &str = "token";

/// Stored text that stands for "no value".
const ABSENT: &str = "null";

// ── Error ───────────────────────────────────────────────────────────

/// Failure on a single cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("cache I/O failed for '{key}': {message}")]
    Io { key: String, message: String },

    #[error("cache entry '{key}' is not a movie: {message}")]
    Decode { key: String, message: String },

    #[error("failed to encode cache entry: {message}")]
    Encode { message: String },
}

impl From<CacheError> for CoreError {
    fn from(err: CacheError) -> Self {
        CoreError::Cache {
            message: err.to_string(),
        }
    }
}

// ── Trait ───────────────────────────────────────────────────────────

/// Key-value storage backing the offline fallback.
///
/// Pure key-value semantics: `keys` has no ordering guarantee, `get` of a
/// missing key is `Ok(None)`, `remove` of a missing key is `Ok(())`.
#[async_trait]
pub trait LocalCache: Send + Sync {
    async fn keys(&self) -> Result<Vec<String>, CacheError>;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn put(&self, key: &str, value: String) -> Result<(), CacheError>;

    async fn remove(&self, key: &str) -> Result<(), CacheError>;
}

// ── Movie entries ───────────────────────────────────────────────────

/// Upsert a movie under its id. Movies without an id are not cacheable
/// and are skipped.
pub async fn put_movie(cache: &dyn LocalCache, movie: &Movie) -> Result<(), CacheError> {
    let Some(id) = movie.id() else {
        debug!(title = %movie.title, "Skipping cache write for movie without id");
        return Ok(());
    };
    let value = serde_json::to_string(movie).map_err(|e| CacheError::Encode {
        message: e.to_string(),
    })?;
    cache.put(id, value).await
}

/// Decode one stored entry. `Ok(None)` for the absence sentinel.
fn decode_entry(key: &str, raw: &str) -> Result<Option<Movie>, CacheError> {
    let raw = raw.trim();
    if raw.is_empty() || raw == ABSENT {
        return Ok(None);
    }
    serde_json::from_str(raw)
        .map(Some)
        .map_err(|e| CacheError::Decode {
            key: key.to_owned(),
            message: e.to_string(),
        })
}

/// Reconstruct an approximate movie list from the cache.
///
/// Enumerates every key except [`CREDENTIAL_KEY`]. Entries that are
/// missing, hold the absence sentinel, or fail to read or decode are
/// skipped with a warning; they never fail the whole enumeration.
pub async fn load_fallback(cache: &dyn LocalCache) -> Vec<Movie> {
    let mut keys = match cache.keys().await {
        Ok(keys) => keys,
        Err(e) => {
            warn!(error = %e, "Cannot enumerate cache, fallback list is empty");
            return Vec::new();
        }
    };
    keys.sort();

    let mut movies = Vec::with_capacity(keys.len());
    for key in keys.iter().filter(|k| k.as_str() != CREDENTIAL_KEY) {
        let entry = match cache.get(key).await {
            Ok(Some(raw)) => decode_entry(key, &raw),
            Ok(None) => Ok(None),
            Err(e) => Err(e),
        };
        match entry {
            Ok(Some(movie)) => movies.push(movie),
            Ok(None) => debug!(key = %key, "Skipping empty cache entry"),
            Err(e) => warn!(error = %e, "Skipping unreadable cache entry"),
        }
    }

    debug!(count = movies.len(), "Rebuilt movie list from cache");
    movies
}

// ── Credential entry ────────────────────────────────────────────────

pub async fn store_credential(
    cache: &dyn LocalCache,
    token: &SecretString,
) -> Result<(), CacheError> {
    cache
        .put(CREDENTIAL_KEY, token.expose_secret().to_owned())
        .await
}

/// The stored credential, if any non-blank one exists.
pub async fn load_credential(cache: &dyn LocalCache) -> Result<Option<SecretString>, CacheError> {
    Ok(cache
        .get(CREDENTIAL_KEY)
        .await?
        .filter(|raw| !raw.trim().is_empty() && raw != ABSENT)
        .map(SecretString::from))
}

pub async fn clear_credential(cache: &dyn LocalCache) -> Result<(), CacheError> {
    cache.remove(CREDENTIAL_KEY).await
}
