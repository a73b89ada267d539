//! The cache decision tree for one route.
//!
//! [`RouteCache`] sits between a request and the handler that would answer it
//! (the *executor*). Per request it:
//!
//! 1. skips everything when the route's [`Age`] is zero;
//! 2. negotiates the request's `Cache-Control` into a [`RequestControl`];
//! 3. looks the key up unless the control forbids reading;
//! 4. serves a fresh entry, or refetches a stale one, falling back to the stale
//!    entry when the refetch fails or the client asked for `only-if-cached`;
//! 5. persists anything newly computed;
//! 6. stamps `ETag` / `Cache-Control` / `Warning`.
//!
//! Store and codec failures never reach the caller. They count as misses and
//! are reported through [`CacheMetrics::err`]. Executor errors are returned
//! unchanged unless a stale entry can stand in.
//!
//! Concurrent misses for the same key are not coalesced: each runs the
//! executor and the last write wins.

use std::future::Future;
use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{debug, warn};

use super::config::Age;
use super::control::RequestControl;
use super::entry::{self, CachedEntry};
use super::error::CacheError;
use super::freshness::{Verdict, is_valid};
use super::headers::{LAST_VALID, apply_response_headers};
use super::metrics::CacheMetrics;
use super::store::CacheStore;
use crate::http::Request;

/// The request attributes the cache decides on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLookup {
    pub path: String,
    pub query: String,
    pub cache_control: Option<String>,
}

impl CacheLookup {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: String::new(),
            cache_control: None,
        }
    }

    #[must_use]
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    #[must_use]
    pub fn cache_control(mut self, value: impl Into<String>) -> Self {
        self.cache_control = Some(value.into());
        self
    }

    pub fn from_request(request: &Request) -> Self {
        Self {
            path: request.path().to_owned(),
            query: request.query_string().unwrap_or_default().to_owned(),
            cache_control: request.cache_control().map(str::to_owned),
        }
    }

    /// Store key: `path:query`. Other request headers are not part of it.
    pub fn key(&self) -> String {
        format!("{}:{}", self.path, self.query)
    }
}

/// Current wall-clock time in unix seconds.
pub fn unix_now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// Cache for a single route: a store, the route's [`Age`], and a metrics sink.
#[derive(Clone)]
pub struct RouteCache {
    store: Arc<dyn CacheStore>,
    age: Age,
    metrics: Arc<dyn CacheMetrics>,
}

impl RouteCache {
    pub fn new(store: Arc<dyn CacheStore>, age: Age, metrics: Arc<dyn CacheMetrics>) -> Self {
        Self {
            store,
            age,
            metrics,
        }
    }

    pub fn age(&self) -> Age {
        self.age
    }

    /// Answers `lookup` at the current wall-clock time.
    ///
    /// See [`handle_at`](Self::handle_at).
    pub async fn handle<F, Fut, E>(&self, lookup: &CacheLookup, executor: F) -> Result<CachedEntry, E>
    where
        F: FnOnce(i64, String) -> Fut,
        Fut: Future<Output = Result<CachedEntry, E>>,
    {
        self.handle_at(unix_now(), lookup, executor).await
    }

    /// Answers `lookup` as of `now` (unix seconds).
    ///
    /// `executor(now, key)` computes a fresh entry and runs at most once.
    ///
    /// # Errors
    ///
    /// The executor's error, when there is no stored entry to fall back on.
    pub async fn handle_at<F, Fut, E>(
        &self,
        now: i64,
        lookup: &CacheLookup,
        executor: F,
    ) -> Result<CachedEntry, E>
    where
        F: FnOnce(i64, String) -> Fut,
        Fut: Future<Output = Result<CachedEntry, E>>,
    {
        if self.age.is_bypass() {
            return executor(now, lookup.key()).await;
        }

        let control = self.control_for(lookup);
        self.handle_with_control(now, lookup, control, executor)
            .await
    }

    /// Negotiates `lookup`'s `Cache-Control` against this route's [`Age`].
    pub fn control_for(&self, lookup: &CacheLookup) -> RequestControl {
        RequestControl::parse(
            lookup.cache_control.as_deref().unwrap_or_default(),
            self.age.min_secs(),
            self.age.max_fresh_secs(),
        )
    }

    /// Same as [`handle_at`](Self::handle_at) with an already negotiated control.
    pub async fn handle_with_control<F, Fut, E>(
        &self,
        now: i64,
        lookup: &CacheLookup,
        control: RequestControl,
        executor: F,
    ) -> Result<CachedEntry, E>
    where
        F: FnOnce(i64, String) -> Fut,
        Fut: Future<Output = Result<CachedEntry, E>>,
    {
        let key = lookup.key();
        let path = lookup.path.as_str();

        if self.age.is_bypass() {
            return executor(now, key).await;
        }

        let stored = if control.no_cache {
            debug!(path, %key, "lookup skipped by request policy");
            None
        } else {
            self.lookup(path, &key).await
        };

        let result = match stored {
            None => executor(now, key.clone()).await,
            Some(mut cached) => {
                let age = cached.age_at(now);
                match is_valid(age, self.age.max_secs(), control.all_validators()) {
                    Verdict::Fresh => {
                        debug!(path, %key, age, "serving fresh entry");
                        cached.warning = control.warning.clone();
                        self.metrics.hit(path);
                        Ok(cached)
                    }
                    Verdict::Stale(reason) => match executor(now, key.clone()).await {
                        Ok(_) if control.force_cache => {
                            debug!(path, %key, age, %reason, "only-if-cached, keeping stale entry");
                            Ok(self.serve_stale(path, cached))
                        }
                        Err(_) => {
                            warn!(path, %key, age, %reason, "refetch failed, serving stale entry");
                            Ok(self.serve_stale(path, cached))
                        }
                        Ok(fresh) if control.read_only => {
                            debug!(path, %key, age, %reason, "stale entry kept by read-only request");
                            Ok(fresh)
                        }
                        Ok(fresh) => {
                            debug!(path, %key, age, %reason, "evicting stale entry");
                            self.metrics.evict(path, reason, age);
                            Ok(fresh)
                        }
                    },
                }
            }
        };

        let mut served = result?;
        if !served.from_cache && !control.read_only {
            self.persist(path, &key, &served).await;
        }
        apply_response_headers(&mut served, self.age, now);
        Ok(served)
    }

    fn serve_stale(&self, path: &str, mut cached: CachedEntry) -> CachedEntry {
        cached.warning = Some(LAST_VALID.to_owned());
        self.metrics.hit(path);
        cached
    }

    /// Reads and decodes `key`. Failures are recorded and read as a miss.
    async fn lookup(&self, path: &str, key: &str) -> Option<CachedEntry> {
        match self.fetch(key).await {
            Ok(Some(mut cached)) => {
                cached.from_cache = true;
                Some(cached)
            }
            Ok(None) => {
                debug!(path, key, "cache miss");
                self.metrics.miss(path);
                None
            }
            Err(error) => {
                warn!(path, key, %error, "cache read failed, treating as miss");
                self.metrics.err(path);
                None
            }
        }
    }

    async fn fetch(&self, key: &str) -> Result<Option<CachedEntry>, CacheError> {
        match self.store.get(key).await? {
            Some(bytes) => Ok(Some(entry::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Writes a newly computed entry. Failures are recorded, never returned.
    async fn persist(&self, path: &str, key: &str, served: &CachedEntry) {
        match self.store_entry(key, served).await {
            Ok(()) => {
                debug!(path, key, "stored entry");
                self.metrics.add(path);
            }
            Err(error) => {
                warn!(path, key, %error, "cache write failed");
                self.metrics.err(path);
            }
        }
    }

    async fn store_entry(&self, key: &str, served: &CachedEntry) -> Result<(), CacheError> {
        let bytes = entry::encode(served)?;
        self.store.set_ttl(key, bytes, self.age.max()).await?;
        Ok(())
    }
}
