//! The route cache as a [`Middleware`] layer.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use super::config::CacheSettings;
use super::entry::CachedEntry;
use super::metrics::CacheMetrics;
use super::orchestrator::{CacheLookup, RouteCache, unix_now};
use super::store::CacheStore;
use crate::context::Context;
use crate::http::{Method, Response};
use crate::middleware::{BoxResponse, Middleware, Next};

/// A downstream response that must not be cached, returned to the client as is.
#[derive(Debug)]
pub struct HandlerFailure(pub Response);

impl fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler answered {}", self.0.status())
    }
}

impl std::error::Error for HandlerFailure {}

/// Serves `GET` and `HEAD` requests through a [`RouteCache`] per path.
///
/// The rest of the chain acts as the executor. Only 2xx responses are stored;
/// anything else is passed back untouched, unless a stored entry can stand in
/// for it. A `HEAD` request may be answered from the `GET` entry, with the body
/// dropped on the way out, but its own response is never stored.
pub struct CacheMiddleware {
    settings: CacheSettings,
    store: Arc<dyn CacheStore>,
    metrics: Arc<dyn CacheMetrics>,
}

impl CacheMiddleware {
    pub fn new(
        settings: CacheSettings,
        store: Arc<dyn CacheStore>,
        metrics: Arc<dyn CacheMetrics>,
    ) -> Self {
        Self {
            settings,
            store,
            metrics,
        }
    }

    /// The cache applied to `path`.
    pub fn route_cache(&self, path: &str) -> RouteCache {
        RouteCache::new(
            self.store.clone(),
            self.settings.age_for(path),
            self.metrics.clone(),
        )
    }
}

impl Middleware for CacheMiddleware {
    fn handle(&self, ctx: Context, next: Next) -> BoxResponse {
        let request = ctx.request();
        if !request.method().is_cacheable() {
            return Box::pin(next.run(ctx));
        }

        let head = *request.method() == Method::Head;
        let lookup = CacheLookup::from_request(request);
        let cache = self.route_cache(&lookup.path);

        let mut control = cache.control_for(&lookup);
        if head {
            control = control.read_only();
        }

        Box::pin(async move {
            let outcome = cache
                .handle_with_control(unix_now(), &lookup, control, move |now, key| async move {
                    let response = next.run(ctx).await;
                    if response.status().is_success() {
                        Ok(CachedEntry::from_response(response, now))
                    } else {
                        debug!(%key, status = %response.status(), "not caching response");
                        Err(HandlerFailure(response))
                    }
                })
                .await;

            let response = match outcome {
                Ok(entry) => entry.into_response(),
                Err(HandlerFailure(response)) => response,
            };
            if head {
                let (status, headers, _) = response.into_parts();
                Response::from_parts(status, headers, Bytes::new())
            } else {
                response
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::cache::config::Age;
    use crate::cache::metrics::NoopMetrics;
    use crate::cache::store::MemoryStore;
    use crate::http::{Request, StatusCode};
    use crate::middleware::{MiddlewareHandler, from_middleware, handler_fn};

    fn ctx(method: &str, target: &str, cache_control: Option<&str>) -> Context {
        let mut raw = format!("{method} {target} HTTP/1.1\r\nHost: localhost\r\n");
        if let Some(value) = cache_control {
            raw.push_str(&format!("Cache-Control: {value}\r\n"));
        }
        raw.push_str("\r\n");
        let (req, _) = Request::parse(raw.as_bytes()).unwrap();
        Context::new(req)
    }

    struct Fixture {
        chain: Vec<MiddlewareHandler>,
        calls: Arc<AtomicUsize>,
        store: Arc<MemoryStore>,
    }

    impl Fixture {
        fn new(status: StatusCode) -> Self {
            let settings = CacheSettings::default()
                .route("/clock", Age::from_secs(0, 60).unwrap());
            let store = Arc::new(MemoryStore::new());
            let cache = CacheMiddleware::new(settings, store.clone(), Arc::new(NoopMetrics));
            let calls = Arc::new(AtomicUsize::new(0));
            let counter = calls.clone();
            let chain = vec![
                from_middleware(Arc::new(cache)),
                handler_fn(move |ctx: Context| {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    let path = ctx.request().path().to_owned();
                    async move {
                        Response::new(status)
                            .header("Content-Type", "text/plain")
                            .body(format!("{path} #{n}"))
                    }
                }),
            ];
            Self { chain, calls, store }
        }

        async fn send(&self, ctx: Context) -> Response {
            Next::new(self.chain.clone()).run(ctx).await
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn second_get_is_served_from_store() {
        let fx = Fixture::new(StatusCode::Ok);

        let first = fx.send(ctx("GET", "/clock?tz=utc", None)).await;
        let second = fx.send(ctx("GET", "/clock?tz=utc", None)).await;

        assert_eq!(fx.calls(), 1);
        assert_eq!(first.payload(), second.payload());
        assert_eq!(second.payload().as_ref(), b"/clock #1");
        assert_eq!(second.headers().get("content-type"), Some("text/plain"));
        assert_eq!(first.headers().get("etag"), second.headers().get("etag"));
        assert!(
            second
                .headers()
                .get("cache-control")
                .is_some_and(|v| v.starts_with("max-age="))
        );
        assert_eq!(fx.store.len(), 1);
    }

    #[tokio::test]
    async fn query_is_part_of_the_key() {
        let fx = Fixture::new(StatusCode::Ok);
        fx.send(ctx("GET", "/clock?tz=utc", None)).await;
        fx.send(ctx("GET", "/clock?tz=cet", None)).await;
        assert_eq!(fx.calls(), 2);
        assert_eq!(fx.store.len(), 2);
    }

    #[tokio::test]
    async fn unsafe_methods_pass_through() {
        let fx = Fixture::new(StatusCode::Ok);
        let resp = fx.send(ctx("POST", "/clock", None)).await;
        fx.send(ctx("POST", "/clock", None)).await;
        assert_eq!(fx.calls(), 2);
        assert!(fx.store.is_empty());
        assert!(!resp.headers().contains("etag"));
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let fx = Fixture::new(StatusCode::BadGateway);
        let resp = fx.send(ctx("GET", "/clock", None)).await;
        fx.send(ctx("GET", "/clock", None)).await;
        assert_eq!(resp.status(), StatusCode::BadGateway);
        assert!(!resp.headers().contains("cache-control"));
        assert_eq!(fx.calls(), 2);
        assert!(fx.store.is_empty());
    }

    #[tokio::test]
    async fn unconfigured_routes_bypass_the_store() {
        let fx = Fixture::new(StatusCode::Ok);
        let resp = fx.send(ctx("GET", "/live", None)).await;
        fx.send(ctx("GET", "/live", None)).await;
        assert_eq!(fx.calls(), 2);
        assert!(fx.store.is_empty());
        assert!(!resp.headers().contains("cache-control"));
    }

    #[tokio::test]
    async fn no_cache_request_refreshes_the_entry() {
        let fx = Fixture::new(StatusCode::Ok);
        // An entry computed this second still satisfies `max-age=0`; backdate it.
        let stale = CachedEntry::new("old", 0);
        fx.store
            .set("/clock:", crate::cache::entry::encode(&stale).unwrap())
            .await
            .unwrap();

        let resp = fx.send(ctx("GET", "/clock", Some("no-cache"))).await;
        assert_eq!(fx.calls(), 1);
        assert_eq!(resp.payload().as_ref(), b"/clock #1");
        assert!(!resp.headers().contains("warning"));
    }

    #[tokio::test]
    async fn head_shares_the_get_entry_without_body() {
        let fx = Fixture::new(StatusCode::Ok);
        fx.send(ctx("GET", "/clock", None)).await;
        let resp = fx.send(ctx("HEAD", "/clock", None)).await;
        assert_eq!(fx.calls(), 1);
        assert!(resp.payload().is_empty());
        assert!(resp.headers().contains("etag"));
    }

    #[tokio::test]
    async fn head_response_never_fills_the_get_entry() {
        let settings = CacheSettings::default().route("/clock", Age::from_secs(0, 60).unwrap());
        let store = Arc::new(MemoryStore::new());
        let cache = CacheMiddleware::new(settings, store.clone(), Arc::new(NoopMetrics));
        let chain = vec![
            from_middleware(Arc::new(cache)),
            handler_fn(|ctx: Context| async move {
                let resp = Response::new(StatusCode::Ok).header("Content-Type", "text/plain");
                if *ctx.request().method() == Method::Head {
                    resp
                } else {
                    resp.body("tick")
                }
            }),
        ];

        let head = Next::new(chain.clone()).run(ctx("HEAD", "/clock", None)).await;
        assert_eq!(head.status(), StatusCode::Ok);
        assert!(store.is_empty());

        let get = Next::new(chain.clone()).run(ctx("GET", "/clock", None)).await;
        assert_eq!(get.payload().as_ref(), b"tick");
        assert_eq!(store.len(), 1);

        let again = Next::new(chain).run(ctx("GET", "/clock", None)).await;
        assert_eq!(again.payload().as_ref(), b"tick");
    }

    #[tokio::test]
    async fn failing_handler_falls_back_to_stale_entry() {
        let fx = Fixture::new(StatusCode::ServiceUnavailable);
        let stale = CachedEntry::new("yesterday", 0);
        fx.store
            .set("/clock:", crate::cache::entry::encode(&stale).unwrap())
            .await
            .unwrap();

        let resp = fx.send(ctx("GET", "/clock", None)).await;
        assert_eq!(fx.calls(), 1);
        assert_eq!(resp.status(), StatusCode::Ok);
        assert_eq!(resp.payload().as_ref(), b"yesterday");
        assert_eq!(resp.headers().get("warning"), Some("last-valid"));
        assert_eq!(resp.headers().get("cache-control"), Some("must-revalidate"));
    }
}
