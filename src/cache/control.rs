//! Request `Cache-Control` negotiation.
//!
//! A client may tighten freshness, never loosen the server's floor:
//!
//! | Directive        | Effect                                                         |
//! |------------------|----------------------------------------------------------------|
//! | `max-age=N`      | entry age must be `≤ N`; `N` is raised to the route's `min`     |
//! | `min-fresh=N`    | at least `N` seconds of lifetime left; `N` is capped at `max - min` |
//! | `no-cache`       | same as `max-age=<min>`                                        |
//! | `no-store`       | same as `max-age=<min>`                                        |
//! | `only-if-cached` | serve the stored entry when a refetch would replace it         |
//!
//! Whenever a requested value is clamped, or `no-cache`/`no-store` is seen, the
//! effective bound is echoed back to the client as a `Warning`.
//!
//! `no-store` does not stop the refreshed response from being written to the
//! store. RFC 9111 says it should; this layer only lets clients bound how old
//! a reused response may be.

use std::fmt;

use tracing::warn;

/// Which freshness check rejected an entry. Reported with evictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationContext {
    /// Older than the route's lifetime.
    Ttl,
    /// Older than the client's `max-age` (or `no-cache`).
    MaxAge,
    /// Less lifetime left than the client's `min-fresh`.
    MinFresh,
}

impl ValidationContext {
    /// Metric label for this reason.
    pub fn as_reason(self) -> &'static str {
        match self {
            Self::Ttl => "expired",
            Self::MaxAge => "max_age",
            Self::MinFresh => "min_fresh",
        }
    }
}

impl fmt::Display for ValidationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_reason())
    }
}

/// A freshness predicate over an entry's `age` and the route's `ttl`, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validator {
    /// `age ≤ n`
    MaxAge(i64),
    /// `ttl - age ≥ n`
    MinFresh(i64),
    /// `age ≤ ttl`
    Expiry,
}

impl Validator {
    /// Evaluates the predicate.
    pub fn check(&self, age: i64, ttl: i64) -> bool {
        match *self {
            Self::MaxAge(n) => age <= n,
            Self::MinFresh(n) => ttl.saturating_sub(age) >= n,
            Self::Expiry => age <= ttl,
        }
    }

    pub fn context(&self) -> ValidationContext {
        match self {
            Self::MaxAge(_) => ValidationContext::MaxAge,
            Self::MinFresh(_) => ValidationContext::MinFresh,
            Self::Expiry => ValidationContext::Ttl,
        }
    }
}

/// Per-request cache policy derived from `Cache-Control`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestControl {
    /// Client-requested bounds, in header order.
    pub validators: Vec<Validator>,
    /// Effective bounds that differ from what the client asked for.
    pub warning: Option<String>,
    /// Skip the store lookup entirely. Never set by [`parse`](Self::parse).
    pub no_cache: bool,
    /// Prefer the stored entry over a refetched one (`only-if-cached`).
    pub force_cache: bool,
    /// Never write the computed response back. Never set by [`parse`](Self::parse).
    pub read_only: bool,
    /// Route lifetime check, always evaluated after `validators`.
    pub expiry: Validator,
}

impl Default for RequestControl {
    fn default() -> Self {
        Self {
            validators: Vec::new(),
            warning: None,
            no_cache: false,
            force_cache: false,
            read_only: false,
            expiry: Validator::Expiry,
        }
    }
}

impl RequestControl {
    /// Parses a `Cache-Control` request header.
    ///
    /// `min_age` is the route's floor in seconds and `max_fresh` the widest
    /// `min-fresh` it allows (`max - min`). Malformed numbers count as `0` and
    /// unknown directives are skipped; both are logged, neither fails the request.
    ///
    /// # Examples
    ///
    /// ```
    /// use http_freshness::cache::{RequestControl, Validator};
    ///
    /// let control = RequestControl::parse("max-age=2, only-if-cached", 5, 5);
    /// assert_eq!(control.validators, vec![Validator::MaxAge(5)]);
    /// assert_eq!(control.warning.as_deref(), Some("max-age=5"));
    /// assert!(control.force_cache);
    /// ```
    pub fn parse(header: &str, min_age: i64, max_fresh: i64) -> Self {
        let mut control = Self::default();

        for directive in header.split(',').map(str::trim) {
            if directive.is_empty() {
                continue;
            }
            let (name, value) = match directive.split_once('=') {
                Some((name, value)) => (name.trim(), Some(value.trim())),
                None => (directive, None),
            };

            if name.eq_ignore_ascii_case("max-age") {
                let mut n = seconds(name, value);
                if n < min_age {
                    n = min_age;
                    control.warn(format!("max-age={min_age}"));
                }
                control.validators.push(Validator::MaxAge(n));
            } else if name.eq_ignore_ascii_case("min-fresh") {
                let mut n = seconds(name, value);
                if n > max_fresh {
                    n = max_fresh;
                    control.warn(format!("min-fresh={max_fresh}"));
                }
                control.validators.push(Validator::MinFresh(n));
            } else if name.eq_ignore_ascii_case("no-cache") || name.eq_ignore_ascii_case("no-store")
            {
                control.validators.push(Validator::MaxAge(min_age));
                control.warn(format!("max-age={min_age}"));
            } else if name.eq_ignore_ascii_case("only-if-cached") {
                control.force_cache = true;
            } else {
                warn!(directive, "ignoring unsupported Cache-Control directive");
            }
        }

        control
    }

    /// Replaces the route lifetime check.
    #[must_use]
    pub fn with_expiry(mut self, expiry: Validator) -> Self {
        self.expiry = expiry;
        self
    }

    /// Marks the request as one that must not be answered from the store.
    ///
    /// The computed response is still persisted.
    #[must_use]
    pub fn bypass_lookup(mut self) -> Self {
        self.no_cache = true;
        self
    }

    /// Marks the request as one whose response must not be stored, such as a
    /// `HEAD` that shares its key with `GET`.
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Parsed validators followed by the expiry check.
    pub fn all_validators(&self) -> impl Iterator<Item = &Validator> {
        self.validators.iter().chain(std::iter::once(&self.expiry))
    }

    fn warn(&mut self, warning: String) {
        match &mut self.warning {
            Some(existing) => {
                existing.push_str(", ");
                existing.push_str(&warning);
            }
            None => self.warning = Some(warning),
        }
    }
}

fn seconds(directive: &str, value: Option<&str>) -> i64 {
    match value.map(|v| v.trim_matches('"').parse::<i64>()) {
        Some(Ok(n)) => n,
        _ => {
            warn!(directive, value, "malformed Cache-Control value, using 0");
            0
        }
    }
}
