// ── Write-through remote client ──
//
// Wraps the HTTP client so every successful call is mirrored into the
// local cache before the result is handed back. The server is
// authoritative: a cache failure after a successful call is logged and
// never turns the success into an error.

use std::sync::Arc;

use async_trait::async_trait;
use moviesync_api::{Movie, MovieClient};
use secrecy::SecretString;
use tracing::{debug, warn};

use crate::cache::{self, LocalCache};
use crate::error::CoreError;

// ── Seam ─────────────────────────────────────────────────────────────

/// The four record endpoints. Implemented by [`MovieClient`]; tests
/// substitute fakes.
#[async_trait]
pub trait MovieApi: Send + Sync {
    async fn list_movies(&self, token: &SecretString) -> Result<Vec<Movie>, moviesync_api::Error>;

    async fn create_movie(
        &self,
        token: &SecretString,
        movie: &Movie,
    ) -> Result<Movie, moviesync_api::Error>;

    async fn update_movie(
        &self,
        token: &SecretString,
        movie: &Movie,
    ) -> Result<Movie, moviesync_api::Error>;

    async fn delete_movie(&self, token: &SecretString, id: &str)
    -> Result<(), moviesync_api::Error>;
}

#[async_trait]
impl MovieApi for MovieClient {
    async fn list_movies(&self, token: &SecretString) -> Result<Vec<Movie>, moviesync_api::Error> {
        MovieClient::list_movies(self, token).await
    }

    async fn create_movie(
        &self,
        token: &SecretString,
        movie: &Movie,
    ) -> Result<Movie, moviesync_api::Error> {
        MovieClient::create_movie(self, token, movie).await
    }

    async fn update_movie(
        &self,
        token: &SecretString,
        movie: &Movie,
    ) -> Result<Movie, moviesync_api::Error> {
        MovieClient::update_movie(self, token, movie).await
    }

    async fn delete_movie(
        &self,
        token: &SecretString,
        id: &str,
    ) -> Result<(), moviesync_api::Error> {
        MovieClient::delete_movie(self, token, id).await
    }
}

// ── RemoteClient ─────────────────────────────────────────────────────

/// CRUD against the server with cache write-through.
///
/// No retries: each call is one round trip, and retry policy belongs to
/// the caller.
#[derive(Clone)]
pub struct RemoteClient {
    api: Arc<dyn MovieApi>,
    cache: Arc<dyn LocalCache>,
}

impl RemoteClient {
    pub fn new(api: Arc<dyn MovieApi>, cache: Arc<dyn LocalCache>) -> Self {
        Self { api, cache }
    }

    pub fn cache(&self) -> &Arc<dyn LocalCache> {
        &self.cache
    }

    /// Fetch every movie, then make the cache mirror the result.
    pub async fn fetch_all(&self, token: &SecretString) -> Result<Vec<Movie>, CoreError> {
        let movies = self.api.list_movies(token).await?;
        debug!(count = movies.len(), "Fetched movies");
        self.mirror_all(&movies).await;
        Ok(movies)
    }

    /// Create a new movie. The server assigns the id.
    pub async fn create(&self, token: &SecretString, movie: &Movie) -> Result<Movie, CoreError> {
        let created = self.api.create_movie(token, movie).await?;
        debug!(id = ?created.id(), "Created movie");
        self.mirror_one(&created).await;
        Ok(created)
    }

    pub async fn update(&self, token: &SecretString, movie: &Movie) -> Result<Movie, CoreError> {
        if movie.id().is_none() {
            return Err(CoreError::MissingId {
                operation: "update".into(),
            });
        }
        let updated = self.api.update_movie(token, movie).await?;
        debug!(id = ?updated.id(), "Updated movie");
        self.mirror_one(&updated).await;
        Ok(updated)
    }

    pub async fn remove(&self, token: &SecretString, movie: &Movie) -> Result<(), CoreError> {
        let Some(id) = movie.id() else {
            return Err(CoreError::MissingId {
                operation: "delete".into(),
            });
        };
        self.api.delete_movie(token, id).await?;
        debug!(id, "Deleted movie");
        if let Err(e) = self.cache.remove(id).await {
            warn!(error = %e, id, "Cache removal failed after delete");
        }
        Ok(())
    }

    // ── Write-through helpers ────────────────────────────────────────

    async fn mirror_one(&self, movie: &Movie) {
        if let Err(e) = cache::put_movie(self.cache.as_ref(), movie).await {
            warn!(error = %e, "Cache write-through failed");
        }
    }

    /// Upsert every fetched movie. Entries are never removed here: a
    /// create that lands while the list is in flight must keep its entry.
    async fn mirror_all(&self, movies: &[Movie]) {
        for movie in movies {
            self.mirror_one(movie).await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;

    use super::*;
    use tokio::sync::Semaphore;

    use crate::cache::{CREDENTIAL_KEY, CacheError, MemoryCache, load_fallback};

    /// Scripted [`MovieApi`] that serves a shared list and counts calls.
    #[derive(Default)]
    pub(crate) struct FakeApi {
        pub movies: Mutex<Vec<Movie>>,
        pub fail_with: Mutex<Option<u16>>,
        pub calls: AtomicUsize,
        next_id: AtomicUsize,
    }

    impl FakeApi {
        pub fn with_movies(movies: Vec<Movie>) -> Self {
            let api = Self::default();
            *api.movies.lock().unwrap() = movies;
            api
        }

        pub fn fail_with(&self, status: u16) {
            *self.fail_with.lock().unwrap() = Some(status);
        }

        fn check(&self) -> Result<(), moviesync_api::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match *self.fail_with.lock().unwrap() {
                Some(status) => Err(moviesync_api::Error::Status {
                    status,
                    body: "scripted failure".into(),
                }),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl MovieApi for FakeApi {
        async fn list_movies(
            &self,
            _token: &SecretString,
        ) -> Result<Vec<Movie>, moviesync_api::Error> {
            self.check()?;
            Ok(self.movies.lock().unwrap().clone())
        }

        async fn create_movie(
            &self,
            _token: &SecretString,
            movie: &Movie,
        ) -> Result<Movie, moviesync_api::Error> {
            self.check()?;
            let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            let created = movie.clone().with_id(format!("x{n}"));
            self.movies.lock().unwrap().insert(0, created.clone());
            Ok(created)
        }

        async fn update_movie(
            &self,
            _token: &SecretString,
            movie: &Movie,
        ) -> Result<Movie, moviesync_api::Error> {
            self.check()?;
            let mut movies = self.movies.lock().unwrap();
            match movies.iter_mut().find(|m| m.same_entity(movie)) {
                Some(slot) => {
                    *slot = movie.clone();
                    Ok(movie.clone())
                }
                None => Err(moviesync_api::Error::Status {
                    status: 404,
                    body: "no such movie".into(),
                }),
            }
        }

        async fn delete_movie(
            &self,
            _token: &SecretString,
            id: &str,
        ) -> Result<(), moviesync_api::Error> {
            self.check()?;
            self.movies.lock().unwrap().retain(|m| m.id() != Some(id));
            Ok(())
        }
    }

    /// Cache whose writes always fail.
    struct BrokenCache;

    #[async_trait]
    impl LocalCache for BrokenCache {
        async fn keys(&self) -> Result<Vec<String>, CacheError> {
            Err(CacheError::Io {
                key: ".".into(),
                message: "disk gone".into(),
            })
        }

        async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Io {
                key: key.into(),
                message: "disk gone".into(),
            })
        }

        async fn put(&self, key: &str, _value: String) -> Result<(), CacheError> {
            Err(CacheError::Io {
                key: key.into(),
                message: "disk gone".into(),
            })
        }

        async fn remove(&self, key: &str) -> Result<(), CacheError> {
            Err(CacheError::Io {
                key: key.into(),
                message: "disk gone".into(),
            })
        }
    }

    fn token() -> SecretString {
        SecretString::from("tok".to_string())
    }

    fn movie(id: &str, title: &str) -> Movie {
        Movie::new(title, 100.0, "01.01.2020", false).with_id(id)
    }

    fn ids(movies: &[Movie]) -> Vec<&str> {
        movies.iter().filter_map(Movie::id).collect()
    }

    fn client(api: FakeApi, cache: Arc<MemoryCache>) -> RemoteClient {
        RemoteClient::new(Arc::new(api), cache)
    }

    /// Serves a list snapshot taken before it waits on `gate`.
    struct SlowListApi {
        inner: FakeApi,
        gate: Semaphore,
        listed: Semaphore,
    }

    #[async_trait]
    impl MovieApi for SlowListApi {
        async fn list_movies(
            &self,
            token: &SecretString,
        ) -> Result<Vec<Movie>, moviesync_api::Error> {
            let snapshot = self.inner.list_movies(token).await?;
            self.listed.add_permits(1);
            self.gate.acquire().await.unwrap().forget();
            Ok(snapshot)
        }

        async fn create_movie(
            &self,
            token: &SecretString,
            movie: &Movie,
        ) -> Result<Movie, moviesync_api::Error> {
            self.inner.create_movie(token, movie).await
        }

        async fn update_movie(
            &self,
            token: &SecretString,
            movie: &Movie,
        ) -> Result<Movie, moviesync_api::Error> {
            self.inner.update_movie(token, movie).await
        }

        async fn delete_movie(
            &self,
            token: &SecretString,
            id: &str,
        ) -> Result<(), moviesync_api::Error> {
            self.inner.delete_movie(token, id).await
        }
    }

    #[tokio::test]
    async fn fetch_all_upserts_without_dropping_entries() {
        let cache = Arc::new(MemoryCache::new());
        cache::put_movie(cache.as_ref(), &movie("old", "Old"))
            .await
            .unwrap();
        cache.put(CREDENTIAL_KEY, "tok".into()).await.unwrap();

        let remote = client(
            FakeApi::with_movies(vec![movie("1", "A"), movie("2", "B")]),
            Arc::clone(&cache),
        );
        let movies = remote.fetch_all(&token()).await.unwrap();
        assert_eq!(movies.len(), 2);

        let mut keys = cache.keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["1", "2", "old", "token"]);
    }

    #[tokio::test]
    async fn create_during_fetch_keeps_its_cache_entry() {
        let cache = Arc::new(MemoryCache::new());
        let api = Arc::new(SlowListApi {
            inner: FakeApi::with_movies(vec![movie("1", "A")]),
            gate: Semaphore::new(0),
            listed: Semaphore::new(0),
        });
        let remote = RemoteClient::new(api.clone(), Arc::<MemoryCache>::clone(&cache));

        let fetch = tokio::spawn({
            let remote = remote.clone();
            async move { remote.fetch_all(&token()).await }
        });
        // The list snapshot is taken before the create below.
        api.listed.acquire().await.unwrap().forget();

        let created = remote
            .create(&token(), &Movie::new("New", 5.0, "01.01.2021", true))
            .await
            .unwrap();
        api.gate.add_permits(1);
        let fetched = fetch.await.unwrap().unwrap();
        assert_eq!(ids(&fetched), vec!["1"]);

        let mut keys = cache.keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["1", "x1"]);
        assert!(load_fallback(cache.as_ref()).await.contains(&created));
    }

    #[tokio::test]
    async fn create_writes_through_before_returning() {
        let cache = Arc::new(MemoryCache::new());
        let remote = client(FakeApi::default(), Arc::clone(&cache));

        let created = remote
            .create(&token(), &Movie::new("A", 100.0, "01.01.2020", false))
            .await
            .unwrap();

        assert_eq!(created.id(), Some("x1"));
        assert_eq!(load_fallback(cache.as_ref()).await, vec![created]);
    }

    #[tokio::test]
    async fn update_without_id_never_calls_server() {
        let api = Arc::new(FakeApi::default());
        let remote = RemoteClient::new(api.clone(), Arc::new(MemoryCache::new()));

        let err = remote
            .update(&token(), &Movie::new("A", 1.0, "01.01.2020", false))
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::MissingId { .. }));
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn remove_drops_cache_entry() {
        let cache = Arc::new(MemoryCache::new());
        let target = movie("1", "A");
        cache::put_movie(cache.as_ref(), &target).await.unwrap();

        let remote = client(FakeApi::with_movies(vec![target.clone()]), Arc::clone(&cache));
        remote.remove(&token(), &target).await.unwrap();

        assert!(cache.get("1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_call_leaves_cache_alone() {
        let cache = Arc::new(MemoryCache::new());
        let target = movie("1", "A");
        cache::put_movie(cache.as_ref(), &target).await.unwrap();

        let api = FakeApi::with_movies(vec![target.clone()]);
        api.fail_with(500);
        let remote = client(api, Arc::clone(&cache));

        let err = remote.remove(&token(), &target).await.unwrap_err();
        assert!(err.is_remote());
        assert!(cache.get("1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn cache_failure_does_not_fail_success() {
        let remote = RemoteClient::new(
            Arc::new(FakeApi::with_movies(vec![movie("1", "A")])),
            Arc::new(BrokenCache),
        );

        assert_eq!(remote.fetch_all(&token()).await.unwrap().len(), 1);
        let saved = remote.update(&token(), &movie("1", "B")).await.unwrap();
        assert_eq!(saved.title, "B");
    }
}
