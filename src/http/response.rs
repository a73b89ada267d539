//! HTTP response builder.
//!
//! Responses flow back up the middleware chain; the cache middleware turns them
//! into stored entries and replays stored entries as responses.

use bytes::Bytes;

use super::{Headers, StatusCode};

/// An HTTP response.
///
/// # Examples
///
/// ```
/// use http_freshness::http::{Response, StatusCode};
///
/// let response = Response::new(StatusCode::Ok)
///     .header("Content-Type", "application/json")
///     .body(r#"{"status":"ok"}"#);
///
/// assert_eq!(response.headers().get("content-type"), Some("application/json"));
/// assert_eq!(response.payload().len(), 15);
/// ```
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    body: Bytes,
}

impl Response {
    /// Creates a new response with the given status and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// Reassembles a response from its parts.
    pub fn from_parts(status: StatusCode, headers: Headers, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Appends a response header. Multiple calls with the same name are additive.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets the response body from a string.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Bytes::from(body.into());
        self
    }

    /// Sets the response body from raw bytes.
    #[must_use]
    pub fn body_bytes(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns the status code of this response.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the response headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the response headers for in-place decoration.
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Returns the response body.
    pub fn payload(&self) -> &Bytes {
        &self.body
    }

    /// Splits the response into status, headers and body.
    pub fn into_parts(self) -> (StatusCode, Headers, Bytes) {
        (self.status, self.headers, self.body)
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts_round_trip() {
        let r = Response::new(StatusCode::Accepted)
            .header("X-Request-Id", "abc-123")
            .body("ok");
        let (status, headers, body) = r.clone().into_parts();
        let back = Response::from_parts(status, headers, body);
        assert_eq!(back.status(), StatusCode::Accepted);
        assert_eq!(back.headers(), r.headers());
        assert_eq!(back.payload(), &Bytes::from_static(b"ok"));
    }

    #[test]
    fn headers_mut_decorates_in_place() {
        let mut r = Response::default();
        r.headers_mut().set("Cache-Control", "max-age=10");
        assert_eq!(r.headers().get("cache-control"), Some("max-age=10"));
    }
}
