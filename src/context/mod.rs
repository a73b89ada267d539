//! Per-request context threaded through the middleware chain.

use crate::Request;

/// Per-request context.
///
/// Owned by exactly one middleware at a time; [`Next::run`](crate::middleware::Next::run)
/// moves it to the next layer.
#[derive(Debug)]
pub struct Context {
    request: Request,
}

impl Context {
    /// Create a new context from a request
    pub fn new(request: Request) -> Self {
        Self { request }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn into_request(self) -> Request {
        self.request
    }
}

impl From<Request> for Context {
    fn from(request: Request) -> Self {
        Self::new(request)
    }
}
