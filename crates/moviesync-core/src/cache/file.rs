// ── On-disk cache ──
//
// One file per key under a cache directory. Keys are percent-encoded into
// file names so server ids can never escape the directory. Writes go to a
// temp file first and are renamed into place.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;
use url::form_urlencoded;

use super::{CacheError, LocalCache};

const ENTRY_SUFFIX: &str = ".json";
const TEMP_SUFFIX: &str = ".tmp";

/// Durable [`LocalCache`] backed by a directory.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Open (creating if needed) a cache rooted at `dir`.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error(&dir.display().to_string(), &e))?;
        debug!(dir = %dir.display(), "Opened file cache");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}{ENTRY_SUFFIX}", encode_key(key)))
    }
}

#[async_trait]
impl LocalCache for FileCache {
    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        let dir_key = self.dir.display().to_string();
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| io_error(&dir_key, &e))?;

        let mut keys = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error(&dir_key, &e))?
        {
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(ENTRY_SUFFIX)) else {
                continue;
            };
            keys.push(decode_key(stem));
        }
        Ok(keys)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        match tokio::fs::read_to_string(self.entry_path(key)).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(key, &e)),
        }
    }

    async fn put(&self, key: &str, value: String) -> Result<(), CacheError> {
        let path = self.entry_path(key);
        let mut temp = path.clone().into_os_string();
        temp.push(TEMP_SUFFIX);

        tokio::fs::write(&temp, value)
            .await
            .map_err(|e| io_error(key, &e))?;
        tokio::fs::rename(&temp, &path)
            .await
            .map_err(|e| io_error(key, &e))
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        match tokio::fs::remove_file(self.entry_path(key)).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(io_error(key, &e)),
            _ => Ok(()),
        }
    }
}

fn encode_key(key: &str) -> String {
    form_urlencoded::byte_serialize(key.as_bytes()).collect()
}

fn decode_key(encoded: &str) -> String {
    form_urlencoded::parse(encoded.as_bytes())
        .next()
        .map(|(k, _)| k.into_owned())
        .unwrap_or_default()
}

fn io_error(key: &str, err: &std::io::Error) -> CacheError {
    CacheError::Io {
        key: key.to_owned(),
        message: err.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cache::{CREDENTIAL_KEY, load_fallback, put_movie};
    use moviesync_api::Movie;

    #[test]
    fn key_encoding_round_trips() {
        for key in ["abc123", "token", "a/b", "../etc", "x y&z=1"] {
            let encoded = encode_key(key);
            assert!(!encoded.contains('/'), "{encoded} must stay in the directory");
            assert_eq!(decode_key(&encoded), key);
        }
    }

    #[tokio::test]
    async fn entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();

        {
            let cache = FileCache::open(dir.path()).await.unwrap();
            let movie = Movie::new("Alien", 11.0, "25.05.1979", true).with_id("m1");
            put_movie(&cache, &movie).await.unwrap();
            cache.put(CREDENTIAL_KEY, "secret".into()).await.unwrap();
        }

        let reopened = FileCache::open(dir.path()).await.unwrap();
        let mut keys = reopened.keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["m1".to_string(), "token".to_string()]);

        let movies = load_fallback(&reopened).await;
        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].title, "Alien");
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::open(dir.path()).await.unwrap();

        cache.put("1", "{}".into()).await.unwrap();
        cache.remove("1").await.unwrap();
        cache.remove("1").await.unwrap();

        assert!(cache.get("1").await.unwrap().is_none());
        assert!(cache.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stray_files_are_not_keys() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::open(dir.path()).await.unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hi").unwrap();
        std::fs::write(dir.path().join("half.json.tmp"), "{").unwrap();

        assert!(cache.keys().await.unwrap().is_empty());
    }
}
