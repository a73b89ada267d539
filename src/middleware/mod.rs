//! Middleware pipeline: composable before/after request handler logic.
//!
//! Each middleware wraps the next layer, so a layer can answer on its own
//! (a cache hit), delegate (a miss), or decorate what comes back (freshness
//! headers). The last entry of a chain is normally a plain handler wrapped with
//! [`handler_fn`].
//!
//! ## Core types
//!
//! - [`Middleware`]: trait implemented by all middleware.
//! - [`Next`]: cursor into the remaining middleware chain; call [`Next::run`] to
//!   advance to the next layer.
//! - [`MiddlewareHandler`]: type-erased, cheaply-cloneable middleware function.
//! - [`from_middleware`] / [`handler_fn`]: build handlers from a trait object
//!   or from a terminal async function.

use std::{future::Future, pin::Pin, sync::Arc};

use crate::{Response, StatusCode, context::Context};

/// Boxed future returned by every layer of the chain.
pub type BoxResponse = Pin<Box<dyn Future<Output = Response> + Send>>;

/// A type-erased, reference-counted middleware function.
///
/// The [`Arc`] wrapper makes handlers cheap to clone so that [`Next`] can
/// advance through the chain without copying closures.
pub type MiddlewareHandler = Arc<dyn Fn(Context, Next) -> BoxResponse + Send + Sync + 'static>;

/// A cursor into the remaining middleware chain for a single request.
///
/// `Next` is consumed by [`run`](Self::run), so a middleware can forward a
/// request at most once. The cache relies on this: its executor owns the
/// cursor, which is why a handler runs at most once per request.
pub struct Next {
    middlewares: Arc<[MiddlewareHandler]>,
    // Tracks which middleware to invoke on the next `run` call.
    index: usize,
}

impl Next {
    /// Creates a new `Next` positioned at the start of the given middleware stack.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use http_freshness::middleware::Next;
    ///
    /// let next = Next::new(vec![]);
    /// ```
    pub fn new(middlewares: Vec<MiddlewareHandler>) -> Self {
        Self {
            middlewares: middlewares.into(),
            index: 0,
        }
    }

    /// Invokes the next middleware in the chain and returns its response.
    ///
    /// If the chain is exhausted without any layer producing a response, a
    /// `500 Internal Server Error` is returned.
    pub async fn run(mut self, ctx: Context) -> Response {
        match self.middlewares.get(self.index).cloned() {
            Some(handler) => {
                self.index += 1;
                handler(ctx, self).await
            }
            None => Response::new(StatusCode::InternalServerError)
                .body("No response generated by middleware pipeline"),
        }
    }
}

/// The core trait for all middleware.
///
/// Implementors receive a [`Context`] and a [`Next`] cursor. They may pass
/// through, short-circuit with their own [`Response`], or decorate the
/// downstream response.
///
/// Implementations must be `Send + Sync` because middleware is shared across
/// Tokio tasks, and must not hold `&mut` references to shared state across an
/// `.await` point.
pub trait Middleware: Send + Sync {
    /// Handle the request and optionally delegate to the next middleware.
    fn handle(&self, ctx: Context, next: Next) -> BoxResponse;
}

/// Converts a [`Middleware`] implementation into a [`MiddlewareHandler`].
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use http_freshness::cache::{CacheMiddleware, CacheSettings, MemoryStore, NoopMetrics};
/// use http_freshness::middleware::from_middleware;
///
/// let cache = CacheMiddleware::new(
///     CacheSettings::default(),
///     Arc::new(MemoryStore::new()),
///     Arc::new(NoopMetrics),
/// );
/// let handler = from_middleware(Arc::new(cache));
/// ```
pub fn from_middleware<M>(middleware: Arc<M>) -> MiddlewareHandler
where
    M: Middleware + 'static,
{
    Arc::new(move |ctx: Context, next: Next| middleware.handle(ctx, next))
}

/// Wraps a terminal async handler so it can sit at the end of a chain.
///
/// The handler never sees the cursor; anything registered after it is unreachable.
///
/// # Examples
///
/// ```rust
/// use http_freshness::{Response, StatusCode, context::Context, middleware::handler_fn};
///
/// let handler = handler_fn(|_ctx: Context| async { Response::new(StatusCode::Ok).body("tick") });
/// ```
pub fn handler_fn<H, F>(handler: H) -> MiddlewareHandler
where
    H: Fn(Context) -> F + Send + Sync + 'static,
    F: Future<Output = Response> + Send + 'static,
{
    Arc::new(move |ctx: Context, _next: Next| Box::pin(handler(ctx)) as BoxResponse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Request;

    fn ctx(path: &str) -> Context {
        let raw = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n");
        let (req, _) = Request::parse(raw.as_bytes()).unwrap();
        Context::new(req)
    }

    struct Tag(&'static str);

    impl Middleware for Tag {
        fn handle(&self, ctx: Context, next: Next) -> BoxResponse {
            let tag = self.0;
            Box::pin(async move {
                let mut resp = next.run(ctx).await;
                resp.headers_mut().insert("X-Layer", tag);
                resp
            })
        }
    }

    #[tokio::test]
    async fn empty_chain_returns_500() {
        let resp = Next::new(vec![]).run(ctx("/")).await;
        assert_eq!(resp.status(), StatusCode::InternalServerError);
    }

    #[tokio::test]
    async fn layers_run_in_order_and_unwind_in_reverse() {
        let chain = vec![
            from_middleware(Arc::new(Tag("outer"))),
            from_middleware(Arc::new(Tag("inner"))),
            handler_fn(|ctx: Context| async move {
                Response::new(StatusCode::Ok).body(ctx.request().path().to_owned())
            }),
        ];
        let resp = Next::new(chain).run(ctx("/clock")).await;
        let layers: Vec<_> = resp.headers().get_all("x-layer").collect();
        assert_eq!(layers, vec!["inner", "outer"]);
        assert_eq!(resp.payload().as_ref(), b"/clock");
    }

    #[tokio::test]
    async fn handler_fn_terminates_chain() {
        let chain = vec![
            handler_fn(|_ctx: Context| async { Response::new(StatusCode::NoContent) }),
            from_middleware(Arc::new(Tag("unreachable"))),
        ];
        let resp = Next::new(chain).run(ctx("/")).await;
        assert_eq!(resp.status(), StatusCode::NoContent);
        assert!(!resp.headers().contains("x-layer"));
    }
}
