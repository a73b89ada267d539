//! Per-route freshness bounds.
//!
//! Each cached route carries an [`Age`]: the server floor (`min`) below which a
//! client may not force a refetch, and the lifetime (`max`) after which an
//! entry is expired. Ages are fixed when the route is registered.
//!
//! Settings load from JSON:
//!
//! ```json
//! {
//!   "default": { "min": 0, "max": 0 },
//!   "routes": { "/clock": { "min": 1, "max": 10 } }
//! }
//! ```

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use super::error::ConfigError;

/// Server-side freshness bounds for one route.
///
/// `min == max == 0` disables caching for the route entirely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Age {
    min: Duration,
    max: Duration,
}

#[derive(Deserialize)]
struct RawAge {
    #[serde(default)]
    min: u64,
    #[serde(default)]
    max: u64,
}

impl Age {
    /// Caching disabled.
    pub const BYPASS: Age = Age {
        min: Duration::ZERO,
        max: Duration::ZERO,
    };

    /// Builds an age, rejecting `min > max`.
    pub fn new(min: Duration, max: Duration) -> Result<Self, ConfigError> {
        if min > max {
            return Err(ConfigError::InvertedAge {
                min: min.as_secs(),
                max: max.as_secs(),
            });
        }
        Ok(Self { min, max })
    }

    /// Convenience constructor in whole seconds.
    pub fn from_secs(min: u64, max: u64) -> Result<Self, ConfigError> {
        Self::new(Duration::from_secs(min), Duration::from_secs(max))
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    /// `true` when the route is not cached at all.
    pub fn is_bypass(&self) -> bool {
        self.min.is_zero() && self.max.is_zero()
    }

    pub(crate) fn min_secs(&self) -> i64 {
        secs(self.min)
    }

    pub(crate) fn max_secs(&self) -> i64 {
        secs(self.max)
    }

    /// Widest `min-fresh` a client may ask for: `max - min`.
    pub(crate) fn max_fresh_secs(&self) -> i64 {
        self.max_secs() - self.min_secs()
    }
}

fn secs(d: Duration) -> i64 {
    i64::try_from(d.as_secs()).unwrap_or(i64::MAX)
}

impl<'de> Deserialize<'de> for Age {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawAge::deserialize(deserializer)?;
        Age::from_secs(raw.min, raw.max).map_err(serde::de::Error::custom)
    }
}

/// Cache ages for every route, with a fallback for unlisted paths.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Age applied to paths without an explicit entry. Bypass unless set.
    pub default: Age,
    /// Exact request path → age.
    pub routes: HashMap<String, Age>,
}

impl CacheSettings {
    /// Parses and validates settings from a JSON document.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed JSON or a route whose `min`
    /// exceeds its `max`.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Registers an age for `path`, replacing any previous one.
    #[must_use]
    pub fn route(mut self, path: impl Into<String>, age: Age) -> Self {
        self.routes.insert(path.into(), age);
        self
    }

    /// Age for `path`, falling back to [`default`](Self::default).
    pub fn age_for(&self, path: &str) -> Age {
        self.routes.get(path).copied().unwrap_or(self.default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_age_is_bypass() {
        assert!(Age::BYPASS.is_bypass());
        assert!(Age::default().is_bypass());
        assert!(!Age::from_secs(0, 10).unwrap().is_bypass());
    }

    #[test]
    fn inverted_age_is_rejected() {
        let err = Age::from_secs(10, 5).unwrap_err();
        assert!(matches!(err, ConfigError::InvertedAge { min: 10, max: 5 }));
    }

    #[test]
    fn max_fresh_is_window_between_bounds() {
        let age = Age::from_secs(5, 10).unwrap();
        assert_eq!(age.min_secs(), 5);
        assert_eq!(age.max_secs(), 10);
        assert_eq!(age.max_fresh_secs(), 5);
    }

    #[test]
    fn settings_from_json() {
        let settings = CacheSettings::from_json(
            r#"{"default":{"max":30},"routes":{"/clock":{"min":1,"max":10}}}"#,
        )
        .unwrap();
        assert_eq!(settings.age_for("/clock"), Age::from_secs(1, 10).unwrap());
        assert_eq!(settings.age_for("/other"), Age::from_secs(0, 30).unwrap());
    }

    #[test]
    fn settings_default_to_bypass() {
        let settings = CacheSettings::from_json("{}").unwrap();
        assert!(settings.age_for("/anything").is_bypass());
    }

    #[test]
    fn settings_reject_inverted_route() {
        let err = CacheSettings::from_json(r#"{"routes":{"/x":{"min":9,"max":1}}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("min age 9s exceeds max age 1s"));
    }

    #[test]
    fn builder_registers_routes() {
        let age = Age::from_secs(1, 2).unwrap();
        let settings = CacheSettings::default().route("/a", age);
        assert_eq!(settings.age_for("/a"), age);
        assert!(settings.age_for("/b").is_bypass());
    }
}
