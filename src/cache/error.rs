//! Error types for the cache layer.
//!
//! None of these reach the client: the orchestrator turns every store or codec
//! failure into a cache miss plus an `err` metric. They exist so store
//! adapters and configuration loading can report precisely what went wrong.

use thiserror::Error;

/// Failure to turn a [`CachedEntry`](super::CachedEntry) into bytes or back.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed cache entry: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cache entry payload is not valid base64: {0}")]
    Payload(#[from] base64::DecodeError),
}

/// Failure reported by a backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),

    #[error("cache store rejected key `{key}`: {reason}")]
    Rejected { key: String, reason: String },
}

/// Invalid cache configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("min age {min}s exceeds max age {max}s")]
    InvertedAge { min: u64, max: u64 },

    #[error("invalid cache settings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Any error raised by the cache layer.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
