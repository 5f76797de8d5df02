//! Immutable, validated configuration records.
//!
//! Both [`crate::Semaphore`] and [`crate::TokenBucket`] are constructed
//! through a builder that validates every numeric constraint from the
//! option table eagerly, before any I/O, and produces a configuration
//! record whose fields are readable via accessor methods but have no
//! setter surface once built — there is no way to mutate a limiter's
//! identity after construction, and no way to pass an option the builder
//! doesn't expose a method for.

use std::time::Duration;

pub(crate) const DEFAULT_CONNECTION_POOL_SIZE: usize = 10;
pub(crate) const KEY_PREFIX: &str = "__self-limiters";

/// `max_sleep` of zero means "wait indefinitely".
pub(crate) fn is_unbounded(max_sleep: Duration) -> bool {
    max_sleep.is_zero()
}

pub(crate) fn validate_capacity(capacity: u32) -> Result<(), crate::Error> {
    if capacity < 1 {
        return Err(crate::Error::validation("capacity must be >= 1"));
    }
    Ok(())
}

pub(crate) fn validate_pool_size(size: usize) -> Result<(), crate::Error> {
    if size < 1 {
        return Err(crate::Error::validation("connection_pool_size must be >= 1"));
    }
    Ok(())
}

pub(crate) fn queue_key(name: &str) -> String {
    format!("{KEY_PREFIX}:{name}")
}

pub(crate) fn sentinel_key(name: &str) -> String {
    format!("{KEY_PREFIX}:{name}-exists")
}

pub(crate) fn schedule_key(name: &str) -> String {
    format!("{KEY_PREFIX}:{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_capacity() {
        assert!(validate_capacity(0).is_err());
    }

    #[test]
    fn accepts_capacity_one() {
        assert!(validate_capacity(1).is_ok());
    }

    #[test]
    fn empty_name_is_a_valid_key_component() {
        // The original ground truth explicitly permits an empty name
        // (`test_init_types` in the Python test suite lists `{'name': ''}`
        // as a non-raising case); this crate places no constraint on it.
        assert_eq!(queue_key(""), "__self-limiters:");
    }

    #[test]
    fn key_layout_matches_spec() {
        assert_eq!(queue_key("x"), "__self-limiters:x");
        assert_eq!(sentinel_key("x"), "__self-limiters:x-exists");
        assert_eq!(schedule_key("x"), "__self-limiters:x");
    }

    #[test]
    fn zero_max_sleep_is_unbounded() {
        assert!(is_unbounded(Duration::ZERO));
        assert!(!is_unbounded(Duration::from_secs(1)));
    }
}
