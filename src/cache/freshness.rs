//! Freshness evaluation of a stored entry.

use super::control::{ValidationContext, Validator};

/// Outcome of checking an entry against a set of validators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Fresh,
    /// Rejected by the first failing validator.
    Stale(ValidationContext),
}

impl Verdict {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh)
    }
}

/// Checks an entry of `age` seconds against `validators` in order, where
/// `max_age` is the route lifetime in seconds.
///
/// All validators must pass. An empty set never validates, so the expiry check
/// can't be left out by accident.
///
/// # Examples
///
/// ```
/// use http_freshness::cache::{ValidationContext, Validator, Verdict, is_valid};
///
/// let validators = [Validator::MinFresh(3), Validator::Expiry];
/// assert_eq!(is_valid(6, 10, &validators), Verdict::Fresh);
/// assert_eq!(is_valid(8, 10, &validators), Verdict::Stale(ValidationContext::MinFresh));
/// ```
pub fn is_valid<'a, I>(age: i64, max_age: i64, validators: I) -> Verdict
where
    I: IntoIterator<Item = &'a Validator>,
{
    let mut checked = false;
    for validator in validators {
        if !validator.check(age, max_age) {
            return Verdict::Stale(validator.context());
        }
        checked = true;
    }
    if checked {
        Verdict::Fresh
    } else {
        Verdict::Stale(ValidationContext::Ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_validators_is_never_fresh() {
        assert_eq!(is_valid(0, 10, &[]), Verdict::Stale(ValidationContext::Ttl));
    }

    #[test]
    fn first_failure_wins() {
        let validators = [Validator::MaxAge(2), Validator::MinFresh(9), Validator::Expiry];
        assert_eq!(
            is_valid(20, 10, &validators),
            Verdict::Stale(ValidationContext::MaxAge)
        );
        assert_eq!(
            is_valid(2, 10, &validators),
            Verdict::Stale(ValidationContext::MinFresh)
        );
    }

    #[test]
    fn expiry_alone_tracks_lifetime() {
        assert!(is_valid(10, 10, &[Validator::Expiry]).is_fresh());
        assert_eq!(
            is_valid(11, 10, &[Validator::Expiry]),
            Verdict::Stale(ValidationContext::Ttl)
        );
    }

    #[test]
    fn evaluation_is_repeatable() {
        let validators = [Validator::MaxAge(4), Validator::Expiry];
        for age in -2..15 {
            let first = is_valid(age, 10, &validators);
            for _ in 0..3 {
                assert_eq!(is_valid(age, 10, &validators), first);
            }
        }
    }
}
