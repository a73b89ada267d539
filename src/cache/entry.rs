//! The cached unit and its storage codec.
//!
//! Entries are stored as JSON with the payload base64-encoded, so any store
//! that round-trips UTF-8 strings can hold them.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::CodecError;
use crate::http::{Headers, Response, StatusCode};

/// A computed response together with its freshness bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEntry {
    /// Status code the handler answered with.
    pub status: u16,
    pub payload: Bytes,
    /// Headers produced by the handler.
    pub headers: Headers,
    /// Unix seconds at which the payload was computed.
    pub last_valid: i64,
    pub etag: String,
    /// Client-facing warning; only surfaced for entries served from storage.
    pub warning: Option<String>,
    /// Set on entries decoded from the store. Such entries are never written back.
    pub from_cache: bool,
}

impl CachedEntry {
    /// A `200 OK` entry computed at `now`, with the default ETag.
    pub fn new(payload: impl Into<Bytes>, now: i64) -> Self {
        let payload = payload.into();
        Self {
            status: StatusCode::Ok.as_u16(),
            etag: etag_for(&payload, now),
            payload,
            headers: Headers::new(),
            last_valid: now,
            warning: None,
            from_cache: false,
        }
    }

    /// Captures a handler response computed at `now`.
    ///
    /// A handler-supplied `ETag` is kept as the entry's tag; otherwise one is
    /// derived from the body.
    pub fn from_response(response: Response, now: i64) -> Self {
        let (status, headers, payload) = response.into_parts();
        let etag = headers
            .get("etag")
            .map(str::to_owned)
            .unwrap_or_else(|| etag_for(&payload, now));
        Self {
            status: status.as_u16(),
            payload,
            headers,
            last_valid: now,
            etag,
            warning: None,
            from_cache: false,
        }
    }

    /// Seconds elapsed since the payload was computed.
    pub fn age_at(&self, now: i64) -> i64 {
        now.saturating_sub(self.last_valid)
    }

    /// Replays the entry as a response, headers included.
    pub fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::Ok);
        Response::from_parts(status, self.headers, self.payload)
    }
}

/// Default ETag: the first 8 bytes of the payload's SHA-256 in hex, then the
/// computation time.
///
/// ```
/// use http_freshness::cache::etag_for;
///
/// let tag = etag_for(b"tick", 1_700_000_000);
/// assert!(tag.ends_with("-1700000000"));
/// assert_eq!(tag.len(), 16 + 1 + 10);
/// ```
pub fn etag_for(payload: &[u8], timestamp: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload);
    let digest = hasher.finalize().to_vec();
    format!("{}-{timestamp}", hex::encode(&digest[..8]))
}

#[derive(Serialize)]
struct StoredEntryRef<'a> {
    status: u16,
    payload: String,
    headers: &'a Headers,
    last_valid: i64,
    etag: &'a str,
    warning: Option<&'a str>,
    from_cache: bool,
}

#[derive(Deserialize)]
struct StoredEntry {
    status: u16,
    payload: String,
    #[serde(default)]
    headers: Headers,
    last_valid: i64,
    #[serde(default)]
    etag: String,
    #[serde(default)]
    warning: Option<String>,
    #[serde(default)]
    from_cache: bool,
}

/// Serializes an entry for the backing store.
pub fn encode(entry: &CachedEntry) -> Result<Bytes, CodecError> {
    let stored = StoredEntryRef {
        status: entry.status,
        payload: STANDARD.encode(&entry.payload),
        headers: &entry.headers,
        last_valid: entry.last_valid,
        etag: &entry.etag,
        warning: entry.warning.as_deref(),
        from_cache: entry.from_cache,
    };
    Ok(Bytes::from(serde_json::to_vec(&stored)?))
}

/// Restores an entry exactly as it was encoded.
///
/// The caller decides whether to mark it as coming from the store.
pub fn decode(bytes: &[u8]) -> Result<CachedEntry, CodecError> {
    let stored: StoredEntry = serde_json::from_slice(bytes)?;
    Ok(CachedEntry {
        status: stored.status,
        payload: Bytes::from(STANDARD.decode(stored.payload)?),
        headers: stored.headers,
        last_valid: stored.last_valid,
        etag: stored.etag,
        warning: stored.warning,
        from_cache: stored.from_cache,
    })
}
