//! HTTP response caching driven by request `Cache-Control`.
//!
//! Each route gets an [`Age`]: `max` bounds how long a computed response may be
//! reused, `min` is the freshness floor a client cannot undercut. Clients can
//! tighten reuse with `max-age`, `min-fresh`, `no-cache`, `no-store` and
//! `only-if-cached`; values outside the route's bounds are clamped and the
//! effective bound is reported in a `Warning` header.
//!
//! The pieces compose bottom-up:
//!
//! - [`RequestControl::parse`] turns the header into [`Validator`]s;
//! - [`is_valid`] checks a stored entry's age against them;
//! - [`RouteCache`] runs the lookup / refetch / persist decision tree over a
//!   [`CacheStore`], reporting to a [`CacheMetrics`] sink;
//! - [`apply_response_headers`] stamps `ETag`, `Cache-Control` and `Warning`;
//! - [`CacheMiddleware`] plugs all of it into a [`crate::middleware`] chain.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use http_freshness::cache::{Age, CacheLookup, CachedEntry, MemoryStore, NoopMetrics, RouteCache};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let cache = RouteCache::new(
//!     Arc::new(MemoryStore::new()),
//!     Age::from_secs(1, 10).unwrap(),
//!     Arc::new(NoopMetrics),
//! );
//! let lookup = CacheLookup::new("/clock");
//!
//! let first = cache
//!     .handle_at(1, &lookup, |now, _key| async move {
//!         Ok::<_, std::convert::Infallible>(CachedEntry::new("tick", now))
//!     })
//!     .await
//!     .unwrap();
//! assert_eq!(first.headers.get("cache-control"), Some("max-age=10"));
//!
//! let second = cache
//!     .handle_at(9, &lookup, |now, _key| async move {
//!         Ok::<_, std::convert::Infallible>(CachedEntry::new("tock", now))
//!     })
//!     .await
//!     .unwrap();
//! assert!(second.from_cache);
//! assert_eq!(second.payload.as_ref(), b"tick");
//! assert_eq!(second.headers.get("cache-control"), Some("max-age=2"));
//! # });
//! ```

pub mod config;
pub mod control;
pub mod entry;
pub mod error;
pub mod freshness;
pub mod headers;
pub mod metrics;
pub mod middleware;
pub mod orchestrator;
pub mod store;

pub use config::{Age, CacheSettings};
pub use control::{RequestControl, ValidationContext, Validator};
pub use entry::{CachedEntry, decode, encode, etag_for};
pub use error::{CacheError, CodecError, ConfigError, StoreError};
pub use freshness::{Verdict, is_valid};
pub use headers::{LAST_VALID, apply_response_headers};
pub use metrics::{CacheMetrics, NoopMetrics, RecorderMetrics};
pub use middleware::{CacheMiddleware, HandlerFailure};
pub use orchestrator::{CacheLookup, RouteCache, unix_now};
pub use store::{CacheStore, MemoryStore};
