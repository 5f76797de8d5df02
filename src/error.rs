//! The crate's single error surface.

use std::time::Duration;

/// Errors returned by [`crate::Semaphore`] and [`crate::TokenBucket`].
///
/// There are exactly four kinds, matching the four ways acquisition can
/// fail: a bad constructor argument, a failure talking to the store, a
/// wait that ran past its bound, or cancellation by the caller's own
/// executor. No other error escapes the core.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A constructor argument failed its constraint. Raised before any I/O.
    #[error("invalid parameter: {0}")]
    Validation(String),

    /// A transport, protocol, wrong-type, or script-execution failure from
    /// the store. Never retried by the core; callers decide.
    #[error("store error: {0}")]
    Store(#[from] redis::RedisError),

    /// The wait bound was exceeded: the blocking pop timed out (Semaphore)
    /// or the scheduled wake-up was too far in the future (TokenBucket).
    #[error(
        "Received wake up time in {wait_secs} seconds, which is greater or equal to the specified max sleep of {max_sleep_secs} seconds",
        wait_secs = wait.as_secs_f64(),
        max_sleep_secs = max_sleep.as_secs_f64()
    )]
    MaxSleepExceeded {
        /// How long the caller would have had to wait.
        wait: Duration,
        /// The configured bound that was exceeded.
        max_sleep: Duration,
    },

    /// The caller's own executor cancelled the waiter while a permit was
    /// still outstanding. The release protocol still runs; the crate does
    /// not suppress or retry this on the caller's behalf.
    #[error("acquisition was cancelled")]
    Cancelled,
}

impl Error {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub(crate) fn max_sleep_exceeded(wait: Duration, max_sleep: Duration) -> Self {
        Self::MaxSleepExceeded { wait, max_sleep }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_sleep_message_matches_original_wording() {
        let err = Error::max_sleep_exceeded(Duration::from_secs(3), Duration::from_secs(1));
        assert_eq!(
            err.to_string(),
            "Received wake up time in 3 seconds, which is greater or equal to \
             the specified max sleep of 1 seconds"
        );
    }

    #[test]
    fn validation_carries_message() {
        let err = Error::validation("capacity must be >= 1");
        assert_eq!(err.to_string(), "invalid parameter: capacity must be >= 1");
    }
}
