//! Response headers derived from the entry being served.

use super::config::Age;
use super::entry::CachedEntry;

pub const ETAG: &str = "ETag";
pub const CACHE_CONTROL: &str = "Cache-Control";
pub const WARNING: &str = "Warning";

/// Warning attached when a stale entry is served in place of a failed refetch.
pub const LAST_VALID: &str = "last-valid";

/// Writes `ETag`, `Cache-Control` and `Warning` onto the entry's headers.
///
/// `Cache-Control` advertises the lifetime left at `now`, or
/// `must-revalidate` once the entry is past the route's `max`. `Warning` is only
/// sent for entries read from the store; otherwise any existing one is removed.
pub fn apply_response_headers(entry: &mut CachedEntry, age: Age, now: i64) {
    if !entry.etag.is_empty() {
        entry.headers.set(ETAG, entry.etag.clone());
    }

    let remaining = age.max_secs().saturating_sub(entry.age_at(now));
    let cache_control = if remaining >= 0 {
        format!("max-age={remaining}")
    } else {
        "must-revalidate".to_owned()
    };
    entry.headers.set(CACHE_CONTROL, cache_control);

    match entry.warning.as_deref() {
        Some(warning) if !warning.is_empty() && entry.from_cache => {
            entry.headers.set(WARNING, warning.to_owned());
        }
        _ => {
            entry.headers.remove(WARNING);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn age() -> Age {
        Age::from_secs(1, 10).unwrap()
    }

    #[test]
    fn remaining_lifetime_is_advertised() {
        let mut entry = CachedEntry::new("x", 1);
        apply_response_headers(&mut entry, age(), 9);
        assert_eq!(entry.headers.get("cache-control"), Some("max-age=2"));
        assert_eq!(entry.headers.get("etag"), Some(entry.etag.as_str()));
    }

    #[test]
    fn exact_expiry_is_zero_max_age() {
        let mut entry = CachedEntry::new("x", 0);
        apply_response_headers(&mut entry, age(), 10);
        assert_eq!(entry.headers.get("cache-control"), Some("max-age=0"));
    }

    #[test]
    fn past_lifetime_must_revalidate() {
        let mut entry = CachedEntry::new("x", 0);
        apply_response_headers(&mut entry, age(), 11);
        assert_eq!(entry.headers.get("cache-control"), Some("must-revalidate"));
    }

    #[test]
    fn future_timestamps_do_not_overflow() {
        let mut entry = CachedEntry::new("x", i64::MAX);
        apply_response_headers(&mut entry, age(), i64::MIN);
        assert_eq!(entry.headers.get("cache-control"), Some(&*format!("max-age={}", i64::MAX)));
    }

    #[test]
    fn handler_values_are_replaced() {
        let mut entry = CachedEntry::new("x", 0);
        entry.headers.insert("cache-control", "no-store");
        entry.headers.insert("ETag", "\"handler\"");
        entry.etag = "\"entry\"".to_owned();
        apply_response_headers(&mut entry, age(), 0);
        assert_eq!(entry.headers.get_all("cache-control").count(), 1);
        assert_eq!(entry.headers.get("etag"), Some("\"entry\""));
    }

    #[test]
    fn warning_only_for_stored_entries() {
        let mut fresh = CachedEntry::new("x", 0);
        fresh.warning = Some("max-age=5".to_owned());
        fresh.headers.insert("Warning", "left over");
        apply_response_headers(&mut fresh, age(), 0);
        assert!(!fresh.headers.contains("warning"));

        let mut stored = CachedEntry::new("x", 0);
        stored.from_cache = true;
        stored.warning = Some(LAST_VALID.to_owned());
        apply_response_headers(&mut stored, age(), 0);
        assert_eq!(stored.headers.get("warning"), Some("last-valid"));

        let mut silent = CachedEntry::new("x", 0);
        silent.from_cache = true;
        silent.warning = Some(String::new());
        silent.headers.insert("Warning", "stale");
        apply_response_headers(&mut silent, age(), 0);
        assert!(!silent.headers.contains("warning"));
    }
}
