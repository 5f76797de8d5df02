//! A Redis-backed token bucket rate limiter with scheduled, paced acquisition.
//!
//! ## Algorithm
//!
//! Rather than tracking a token count directly, the limiter tracks a single
//! value: the Redis-clock timestamp at which the *next* slot becomes
//! available, `Sched(B)`. Each `acquire()` atomically reads and advances
//! that timestamp by one refill step (`refill_frequency / refill_amount`),
//! then the caller sleeps, client-side, until the slot it was assigned
//! arrives. This reproduces a token bucket's throughput without ever
//! materializing a counter that multiple clients would need to decrement
//! under contention — the only shared mutable state is the single
//! timestamp, advanced by one Lua script.
//!
//! Because every caller computes its own slot up front and then sleeps
//! locally, throughput is paced smoothly rather than admitting a burst
//! whenever a fixed window rolls over.
//!
//! ## Example
//!
//! ```no_run
//! use redis_limiters::TokenBucketBuilder;
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), redis_limiters::Error> {
//! let bucket = TokenBucketBuilder::new(
//!     "my-api",
//!     10,
//!     Duration::from_secs(1),
//!     10,
//!     "redis://127.0.0.1:6379",
//! )
//! .build()?;
//!
//! let _guard = bucket.acquire().await?;
//! // ... rate-limited call ...
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::config::{self, DEFAULT_CONNECTION_POOL_SIZE};
use crate::error::Error;
use crate::pool::{Pool, ScriptHandle};

mod guard;
pub use guard::TokenBucketGuard;

const SCHEDULE_SCRIPT: &str = include_str!("../lua/token_bucket_schedule.lua");

/// Builds a [`TokenBucket`], validating every option eagerly.
pub struct TokenBucketBuilder {
    name: String,
    capacity: u32,
    refill_frequency: Duration,
    refill_amount: u32,
    redis_url: String,
    max_sleep: Duration,
    connection_pool_size: usize,
}

impl TokenBucketBuilder {
    /// `capacity` bounds how far a slot can be scheduled beyond "now" before
    /// the grace window on the schedule key's TTL is exceeded; it does not
    /// bound concurrency the way [`crate::Semaphore`]'s capacity does.
    /// `refill_amount` tokens become available every `refill_frequency`.
    pub fn new(
        name: impl Into<String>,
        capacity: u32,
        refill_frequency: Duration,
        refill_amount: u32,
        redis_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            capacity,
            refill_frequency,
            refill_amount,
            redis_url: redis_url.into(),
            max_sleep: Duration::ZERO,
            connection_pool_size: DEFAULT_CONNECTION_POOL_SIZE,
        }
    }

    /// Upper bound on how long a single `acquire()` will wait for its
    /// scheduled slot. Zero (the default) means wait indefinitely.
    pub fn max_sleep(mut self, max_sleep: Duration) -> Self {
        self.max_sleep = max_sleep;
        self
    }

    /// Size of the underlying bounded connection pool.
    pub fn connection_pool_size(mut self, size: usize) -> Self {
        self.connection_pool_size = size;
        self
    }

    /// Validates the configuration and returns a ready-to-use [`TokenBucket`].
    pub fn build(self) -> Result<TokenBucket, Error> {
        config::validate_capacity(self.capacity)?;
        config::validate_pool_size(self.connection_pool_size)?;
        if self.refill_frequency.is_zero() {
            return Err(Error::validation("refill_frequency must be > 0"));
        }
        if self.refill_amount < 1 {
            return Err(Error::validation("refill_amount must be >= 1"));
        }

        let schedule_key = config::schedule_key(&self.name);

        Ok(TokenBucket {
            name: self.name,
            capacity: self.capacity,
            refill_frequency: self.refill_frequency,
            refill_amount: self.refill_amount,
            max_sleep: self.max_sleep,
            schedule_key,
            pool: Pool::new(self.redis_url, self.connection_pool_size),
            schedule_script: ScriptHandle::new(SCHEDULE_SCRIPT),
        })
    }
}

/// A Redis-backed token bucket rate limiter.
pub struct TokenBucket {
    name: String,
    capacity: u32,
    refill_frequency: Duration,
    refill_amount: u32,
    max_sleep: Duration,
    schedule_key: String,
    pool: Pool,
    schedule_script: ScriptHandle,
}

impl TokenBucket {
    /// The bucket's name, as given to [`TokenBucketBuilder::new`].
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The configured wait bound. Zero means unbounded.
    pub fn max_sleep(&self) -> Duration {
        self.max_sleep
    }

    /// The configured capacity: tokens produced per refill tick.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// The configured refill tick period.
    pub fn refill_frequency(&self) -> Duration {
        self.refill_frequency
    }

    /// The configured tokens produced per refill tick.
    pub fn refill_amount(&self) -> u32 {
        self.refill_amount
    }

    /// The fully-qualified Redis key backing the scheduled-slot timestamp.
    pub fn schedule_key(&self) -> &str {
        &self.schedule_key
    }

    /// Reserves the next available slot, sleeps until it arrives, and
    /// returns a guard representing the spent token. Unlike
    /// [`crate::Semaphore::acquire`], the returned guard has nothing to
    /// release: the rate limit is enforced entirely by the pacing delay.
    #[instrument(skip(self), fields(bucket = %self.name))]
    pub async fn acquire(&self) -> Result<TokenBucketGuard, Error> {
        let wait = self.reserve_slot().await?;

        if !config::is_unbounded(self.max_sleep) && wait >= self.max_sleep {
            warn!(?wait, max_sleep = ?self.max_sleep, "token bucket wait exceeds max_sleep");
            return Err(Error::max_sleep_exceeded(wait, self.max_sleep));
        }

        if !wait.is_zero() {
            debug!(?wait, "sleeping for scheduled token bucket slot");
            tokio::time::sleep(wait).await;
        }

        Ok(TokenBucketGuard::new())
    }

    /// Atomically advances `Sched(B)` and returns how long the caller must
    /// sleep before its slot arrives, per the Redis server clock.
    async fn reserve_slot(&self) -> Result<Duration, Error> {
        let mut conn = self.pool.checkout().await?;

        let freq_ms = self.refill_frequency.as_millis().max(1) as u64;
        let step = step_ms(self.refill_frequency, self.refill_amount);
        let grace_ms = step.saturating_mul(self.capacity.max(1) as u64);
        let args = [
            freq_ms.to_string(),
            self.refill_amount.to_string(),
            grace_ms.to_string(),
        ];

        let slot_ms: i64 = self
            .schedule_script
            .invoke(&mut *conn, &[&self.schedule_key], &args)
            .await?;

        let now_ms: i64 = now_ms(&mut *conn).await?;
        let remaining = (slot_ms - now_ms).max(0) as u64;
        Ok(Duration::from_millis(remaining))
    }
}

impl fmt::Display for TokenBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token bucket instance for queue {}", self.schedule_key)
    }
}

async fn now_ms<C>(conn: &mut C) -> Result<i64, Error>
where
    C: redis::aio::ConnectionLike + Send,
{
    let (secs, micros): (i64, i64) = redis::cmd("TIME").query_async(conn).await?;
    Ok(secs * 1000 + micros / 1000)
}

/// Mirrors the Lua script's own `ceil(freq_ms / amount)`, for tests and
/// for deriving the TTL grace period client-side.
fn step_ms(refill_frequency: Duration, refill_amount: u32) -> u64 {
    let freq_ms = refill_frequency.as_millis().max(1) as u64;
    let amount = refill_amount.max(1) as u64;
    freq_ms.div_ceil(amount)
}
