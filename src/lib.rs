//! # http-freshness
//!
//! `Cache-Control` aware response caching for async HTTP handlers.
//!
//! A [`cache::CacheMiddleware`] sits in front of a handler chain and decides,
//! per request, whether a previously computed response may be replayed or the
//! handler must run again. Freshness is bounded per route by a server-side
//! [`cache::Age`] and negotiated with the client's `Cache-Control` request
//! header. Responses carry `ETag`, `Cache-Control` and, when a client bound was
//! overridden or a stale entry was served, a `Warning` header.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use http_freshness::cache::{Age, CacheMiddleware, CacheSettings, MemoryStore, RecorderMetrics};
//! use http_freshness::context::Context;
//! use http_freshness::middleware::{Next, from_middleware, handler_fn};
//! use http_freshness::{Request, Response, StatusCode};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let settings = CacheSettings::default()
//!     .route("/clock", Age::new(Duration::from_secs(1), Duration::from_secs(30)).unwrap());
//! let cache = CacheMiddleware::new(settings, Arc::new(MemoryStore::new()), Arc::new(RecorderMetrics));
//!
//! let chain = vec![
//!     from_middleware(Arc::new(cache)),
//!     handler_fn(|_ctx: Context| async { Response::new(StatusCode::Ok).body("tick") }),
//! ];
//!
//! let (request, _) = Request::parse(b"GET /clock HTTP/1.1\r\nHost: localhost\r\n\r\n").unwrap();
//! let response = Next::new(chain).run(Context::new(request)).await;
//! assert!(response.headers().contains("etag"));
//! # });
//! ```

pub mod cache;
pub mod context;
pub mod http;
pub mod middleware;
pub mod telemetry;

pub use http::{Headers, Method, Request, Response, StatusCode};
