//! Cache-aside content loading.
//!
//! A loader call checks the key-value store before the data source and fills
//! the store on a miss. Clients that have not opted into caching never touch
//! the store. Store failures degrade to a direct fetch; fetch failures
//! propagate unchanged.

use std::{fmt, future::Future, sync::Arc, time::Duration};

use metrics::counter;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, instrument, warn};

use super::kv::KvStore;

pub const METRIC_CACHE_HIT_TOTAL: &str = "spindle_cache_hit_total";
pub const METRIC_CACHE_MISS_TOTAL: &str = "spindle_cache_miss_total";
pub const METRIC_CACHE_BYPASS_TOTAL: &str = "spindle_cache_bypass_total";
pub const METRIC_CACHE_STORE_ERROR_TOTAL: &str = "spindle_cache_store_error_total";

/// Logical names under which loader results are stored.
///
/// Catalog content is identical for every visitor, so keys are shared across
/// users. Nothing user-specific is ever stored under these keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Root,
    Home,
    AlbumIndex,
    Album(String),
    ArtistIndex,
    Artist(String),
    PlaylistIndex,
    Playlist(String),
    MainIndex,
}

impl CacheKey {
    /// Low-cardinality label used for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            CacheKey::Root => "root",
            CacheKey::Home => "home",
            CacheKey::AlbumIndex | CacheKey::Album(_) => "album",
            CacheKey::ArtistIndex | CacheKey::Artist(_) => "artist",
            CacheKey::PlaylistIndex | CacheKey::Playlist(_) => "playlist",
            CacheKey::MainIndex => "main_index",
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Root => f.write_str("root"),
            CacheKey::Home => f.write_str("home_v2"),
            CacheKey::AlbumIndex => f.write_str("album_v2"),
            CacheKey::Album(id) => write!(f, "album_{id}_v2"),
            CacheKey::ArtistIndex => f.write_str("artist_v2"),
            CacheKey::Artist(id) => write!(f, "artist_{id}_v2"),
            CacheKey::PlaylistIndex => f.write_str("playlist_v2"),
            CacheKey::Playlist(id) => write!(f, "playlist_{id}_v2"),
            CacheKey::MainIndex => f.write_str("main_index"),
        }
    }
}

#[derive(Clone)]
pub struct ContentLoader {
    store: Option<Arc<dyn KvStore>>,
    ttl: Duration,
}

impl ContentLoader {
    pub fn new(store: Arc<dyn KvStore>, ttl: Duration) -> Self {
        Self {
            store: Some(store),
            ttl,
        }
    }

    /// A loader that always fetches, regardless of client preference.
    pub fn disabled() -> Self {
        Self {
            store: None,
            ttl: Duration::ZERO,
        }
    }

    /// Return the value stored under `key`, or fetch, store and return it.
    ///
    /// At most one fetch happens per call. Concurrent misses for the same key
    /// may both write; the last write wins.
    #[instrument(skip_all, fields(cache.key = %key, cacheable = cacheable))]
    pub async fn load<T, E, F, Fut>(
        &self,
        key: &CacheKey,
        cacheable: bool,
        fetch: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let store = match (&self.store, cacheable) {
            (Some(store), true) => store,
            _ => {
                counter!(METRIC_CACHE_BYPASS_TOTAL, "route" => key.label()).increment(1);
                debug!(outcome = "bypass", "cache not consulted");
                return fetch().await;
            }
        };

        let raw_key = key.to_string();
        match store.get(&raw_key).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    counter!(METRIC_CACHE_HIT_TOTAL, "route" => key.label()).increment(1);
                    debug!(outcome = "hit", "serving stored payload");
                    return Ok(value);
                }
                Err(err) => {
                    warn!(error = %err, "discarding undecodable cache entry");
                }
            },
            Ok(None) => {}
            Err(err) => {
                counter!(METRIC_CACHE_STORE_ERROR_TOTAL, "op" => "get").increment(1);
                warn!(error = %err, "cache read failed, falling back to source");
            }
        }

        counter!(METRIC_CACHE_MISS_TOTAL, "route" => key.label()).increment(1);
        debug!(outcome = "miss", "fetching from source");

        let value = fetch().await?;

        match serde_json::to_string(&value) {
            Ok(payload) => {
                if let Err(err) = store.put(&raw_key, payload, self.ttl).await {
                    counter!(METRIC_CACHE_STORE_ERROR_TOTAL, "op" => "put").increment(1);
                    warn!(error = %err, "cache write failed");
                }
            }
            Err(err) => warn!(error = %err, "payload could not be serialized for caching"),
        }

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde::Deserialize;

    use super::*;
    use crate::application::kv::KvError;

    #[derive(Default)]
    struct RecordingStore {
        entries: Mutex<HashMap<String, (String, Duration)>>,
        gets: AtomicUsize,
        puts: AtomicUsize,
        fail_get: bool,
        fail_put: bool,
    }

    impl RecordingStore {
        fn failing_reads() -> Self {
            Self {
                fail_get: true,
                ..Default::default()
            }
        }

        fn failing_writes() -> Self {
            Self {
                fail_put: true,
                ..Default::default()
            }
        }

        fn entry(&self, key: &str) -> Option<(String, Duration)> {
            self.entries.lock().expect("entries").get(key).cloned()
        }
    }

    #[async_trait]
    impl KvStore for RecordingStore {
        async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            if self.fail_get {
                return Err(KvError::Unavailable("connection refused".into()));
            }
            Ok(self.entry(key).map(|(value, _)| value))
        }

        async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), KvError> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            if self.fail_put {
                return Err(KvError::Command("READONLY".into()));
            }
            self.entries
                .lock()
                .expect("entries")
                .insert(key.to_string(), (value, ttl));
            Ok(())
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Payload {
        name: String,
        tracks: u32,
    }

    fn payload() -> Payload {
        Payload {
            name: "First Light".into(),
            tracks: 9,
        }
    }

    const ONE_DAY: Duration = Duration::from_secs(86_400);

    #[test]
    fn keys_render_logical_names() {
        assert_eq!(CacheKey::Root.to_string(), "root");
        assert_eq!(CacheKey::Home.to_string(), "home_v2");
        assert_eq!(CacheKey::AlbumIndex.to_string(), "album_v2");
        assert_eq!(CacheKey::Album("A1".into()).to_string(), "album_A1_v2");
        assert_eq!(CacheKey::ArtistIndex.to_string(), "artist_v2");
        assert_eq!(CacheKey::Artist("R7".into()).to_string(), "artist_R7_v2");
        assert_eq!(CacheKey::PlaylistIndex.to_string(), "playlist_v2");
        assert_eq!(CacheKey::Playlist("P3".into()).to_string(), "playlist_P3_v2");
        assert_eq!(CacheKey::MainIndex.to_string(), "main_index");
    }

    #[tokio::test]
    async fn uncacheable_requests_never_touch_the_store() {
        let store = Arc::new(RecordingStore::default());
        let loader = ContentLoader::new(store.clone(), ONE_DAY);
        let fetches = AtomicUsize::new(0);

        for _ in 0..3 {
            let value: Result<Payload, RepoFailure> = loader
                .load(&CacheKey::Home, false, || async {
                    fetches.fetch_add(1, Ordering::SeqCst);
                    Ok(payload())
                })
                .await;
            assert_eq!(value.expect("fetched"), payload());
        }

        assert_eq!(fetches.load(Ordering::SeqCst), 3);
        assert_eq!(store.gets.load(Ordering::SeqCst), 0);
        assert_eq!(store.puts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn album_is_fetched_once_then_served_from_store() {
        let store = Arc::new(RecordingStore::default());
        let loader = ContentLoader::new(store.clone(), ONE_DAY);
        let fetches = AtomicUsize::new(0);
        let key = CacheKey::Album("A1".into());

        let first: Payload = loader
            .load(&key, true, || async {
                fetches.fetch_add(1, Ordering::SeqCst);
                Ok::<_, RepoFailure>(payload())
            })
            .await
            .expect("first load");

        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert_eq!(store.puts.load(Ordering::SeqCst), 1);
        let (stored, ttl) = store.entry("album_A1_v2").expect("stored under album key");
        assert_eq!(ttl, ONE_DAY);
        assert_eq!(
            serde_json::from_str::<Payload>(&stored).expect("stored json"),
            first
        );

        let second: Payload = loader
            .load(&key, true, || async {
                fetches.fetch_add(1, Ordering::SeqCst);
                Ok::<_, RepoFailure>(Payload {
                    name: "changed".into(),
                    tracks: 0,
                })
            })
            .await
            .expect("second load");

        assert_eq!(second, first);
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert_eq!(store.puts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unreadable_store_falls_back_to_fetch() {
        let store = Arc::new(RecordingStore::failing_reads());
        let loader = ContentLoader::new(store.clone(), ONE_DAY);

        let value: Payload = loader
            .load(&CacheKey::ArtistIndex, true, || async {
                Ok::<_, RepoFailure>(payload())
            })
            .await
            .expect("fail open");

        assert_eq!(value, payload());
        assert_eq!(store.gets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_write_still_returns_fetched_value() {
        let store = Arc::new(RecordingStore::failing_writes());
        let loader = ContentLoader::new(store.clone(), ONE_DAY);

        let value: Payload = loader
            .load(&CacheKey::PlaylistIndex, true, || async {
                Ok::<_, RepoFailure>(payload())
            })
            .await
            .expect("write failure tolerated");

        assert_eq!(value, payload());
        assert_eq!(store.puts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fetch_errors_propagate_and_nothing_is_stored() {
        let store = Arc::new(RecordingStore::default());
        let loader = ContentLoader::new(store.clone(), ONE_DAY);

        let result: Result<Payload, RepoFailure> = loader
            .load(&CacheKey::Album("missing".into()), true, || async {
                Err(RepoFailure)
            })
            .await;

        assert!(result.is_err());
        assert_eq!(store.puts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn undecodable_entry_is_replaced() {
        let store = Arc::new(RecordingStore::default());
        store
            .put("home_v2", "{\"legacy\":true}".into(), ONE_DAY)
            .await
            .expect("seed");
        let loader = ContentLoader::new(store.clone(), ONE_DAY);

        let value: Payload = loader
            .load(&CacheKey::Home, true, || async {
                Ok::<_, RepoFailure>(payload())
            })
            .await
            .expect("refetched");

        assert_eq!(value, payload());
        let (stored, _) = store.entry("home_v2").expect("rewritten");
        assert!(stored.contains("First Light"));
    }

    #[tokio::test]
    async fn disabled_loader_always_fetches() {
        let loader = ContentLoader::disabled();
        let fetches = AtomicUsize::new(0);

        for _ in 0..2 {
            let _: Payload = loader
                .load(&CacheKey::Root, true, || async {
                    fetches.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, RepoFailure>(payload())
                })
                .await
                .expect("fetched");
        }

        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[derive(Debug)]
    struct RepoFailure;
}
