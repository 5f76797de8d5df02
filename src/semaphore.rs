//! A fair, FIFO, Redis-backed counting semaphore.
//!
//! ## Algorithm
//!
//! Capacity `C` permits live as entries in a Redis list, `Q(S)`. Acquiring
//! a permit is a blocking pop (`BLPOP`) from the head of that list; the
//! popped value *is* the permit, and it is pushed back to the tail on
//! release. Because `BLPOP` serves blocked callers in the order they
//! started blocking, acquisition is FIFO across every client that reaches
//! the pop on a given Redis node, with no additional queue discipline
//! needed client-side.
//!
//! A second key, the sentinel `E(S)`, guards one-time initialization: the
//! first client to observe it transition from absent to present is the
//! sole creator of the `C` permits in `Q(S)`. Every `acquire()` call runs
//! this initialization script first; it is a no-op once the sentinel
//! exists, so the cost of running it on every acquisition is one cheap
//! `SETNX`.
//!
//! ## Example
//!
//! ```no_run
//! use redis_limiters::SemaphoreBuilder;
//!
//! # async fn run() -> Result<(), redis_limiters::Error> {
//! let semaphore = SemaphoreBuilder::new("my-resource", 2, "redis://127.0.0.1:6379")
//!     .build()?;
//!
//! let guard = semaphore.acquire().await?;
//! // ... critical section ...
//! guard.release().await?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::config::{self, DEFAULT_CONNECTION_POOL_SIZE};
use crate::error::Error;
use crate::pool::{Pool, ScriptHandle};

mod guard;
pub use guard::SemaphoreGuard;

const INIT_SCRIPT: &str = include_str!("../lua/semaphore_init.lua");
const RELEASE_SCRIPT: &str = include_str!("../lua/semaphore_release.lua");

/// Builds a [`Semaphore`], validating every option eagerly.
///
/// Construction never touches the network: a malformed `redis_url` is
/// only surfaced by [`Semaphore::acquire`], on the first attempt to use it
/// (§7, §8 scenario 8 in the design notes).
pub struct SemaphoreBuilder {
    name: String,
    capacity: u32,
    redis_url: String,
    max_sleep: Duration,
    expiry: Option<Duration>,
    connection_pool_size: usize,
}

impl SemaphoreBuilder {
    /// Starts a builder with the required fields and documented defaults:
    /// `max_sleep` unbounded, no `expiry`, a pool size of
    /// [`DEFAULT_CONNECTION_POOL_SIZE`].
    pub fn new(name: impl Into<String>, capacity: u32, redis_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capacity,
            redis_url: redis_url.into(),
            max_sleep: Duration::ZERO,
            expiry: None,
            connection_pool_size: DEFAULT_CONNECTION_POOL_SIZE,
        }
    }

    /// Upper bound on how long a single `acquire()` will wait for a permit.
    /// Zero (the default) means wait indefinitely.
    pub fn max_sleep(mut self, max_sleep: Duration) -> Self {
        self.max_sleep = max_sleep;
        self
    }

    /// TTL refreshed on the queue and sentinel keys on every acquisition
    /// and release. Bounds how long a dead holder can strand a permit.
    pub fn expiry(mut self, expiry: Duration) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Size of the underlying bounded connection pool.
    pub fn connection_pool_size(mut self, size: usize) -> Self {
        self.connection_pool_size = size;
        self
    }

    /// Validates the configuration and returns a ready-to-use [`Semaphore`].
    pub fn build(self) -> Result<Semaphore, Error> {
        config::validate_capacity(self.capacity)?;
        config::validate_pool_size(self.connection_pool_size)?;

        let queue_key = config::queue_key(&self.name);
        let exists_key = config::sentinel_key(&self.name);

        Ok(Semaphore(Arc::new(Inner {
            name: self.name,
            capacity: self.capacity,
            max_sleep: self.max_sleep,
            expiry: self.expiry,
            queue_key,
            exists_key,
            run_id: Uuid::new_v4().to_string(),
            pool: Pool::new(self.redis_url, self.connection_pool_size),
            init_script: ScriptHandle::new(INIT_SCRIPT),
            release_script: ScriptHandle::new(RELEASE_SCRIPT),
        })))
    }
}

struct Inner {
    name: String,
    capacity: u32,
    max_sleep: Duration,
    expiry: Option<Duration>,
    queue_key: String,
    exists_key: String,
    run_id: String,
    pool: Pool,
    init_script: ScriptHandle,
    release_script: ScriptHandle,
}

/// A fair, FIFO, Redis-backed counting semaphore.
///
/// Cheap to clone: cloning shares the same underlying connection pool and
/// Redis keys, it does not create a second independent semaphore.
#[derive(Clone)]
pub struct Semaphore(Arc<Inner>);

impl Semaphore {
    /// The semaphore's name, as given to [`SemaphoreBuilder::new`].
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// The configured capacity.
    pub fn capacity(&self) -> u32 {
        self.0.capacity
    }

    /// The configured wait bound. Zero means unbounded.
    pub fn max_sleep(&self) -> Duration {
        self.0.max_sleep
    }

    /// The fully-qualified Redis key backing the permit queue.
    pub fn queue_key(&self) -> &str {
        &self.0.queue_key
    }

    /// Runs the 3-step acquisition protocol: idempotent initialization,
    /// then a blocking pop bounded by `max_sleep`, returning a guard that
    /// owns the popped permit until released.
    #[instrument(skip(self), fields(semaphore = %self.0.name))]
    pub async fn acquire(&self) -> Result<SemaphoreGuard, Error> {
        self.initialize().await?;
        let token = self.wait_for_permit().await?;
        debug!(token = %token, "semaphore permit acquired");
        Ok(SemaphoreGuard::new(self.0.clone(), token))
    }

    async fn initialize(&self) -> Result<(), Error> {
        let inner = &self.0;
        let mut conn = inner.pool.checkout().await?;
        let expiry_secs = expiry_secs(inner.expiry);
        let args = [
            inner.capacity.to_string(),
            expiry_secs.to_string(),
            inner.run_id.clone(),
        ];
        let _: i64 = inner
            .init_script
            .invoke(&mut *conn, &[&inner.exists_key, &inner.queue_key], &args)
            .await?;
        Ok(())
    }

    async fn wait_for_permit(&self) -> Result<String, Error> {
        use redis::AsyncCommands;

        let inner = &self.0;
        let mut conn = inner.pool.checkout().await?;
        let timeout_secs = if config::is_unbounded(inner.max_sleep) {
            0.0
        } else {
            inner.max_sleep.as_secs_f64()
        };

        let popped: Option<(String, String)> = conn.blpop(&inner.queue_key, timeout_secs).await?;
        match popped {
            Some((_, token)) => Ok(token),
            None => {
                warn!(max_sleep = ?inner.max_sleep, "semaphore wait exceeded max_sleep");
                Err(Error::max_sleep_exceeded(inner.max_sleep, inner.max_sleep))
            }
        }
    }

    pub(crate) async fn release(&self, token: &str) -> Result<(), Error> {
        let inner = &self.0;
        let mut conn = inner.pool.checkout().await?;
        let expiry_secs = expiry_secs(inner.expiry);
        let args = [token.to_string(), expiry_secs.to_string()];
        let _: i64 = inner
            .release_script
            .invoke(&mut *conn, &[&inner.queue_key, &inner.exists_key], &args)
            .await?;
        Ok(())
    }

    pub(crate) fn inner(&self) -> Arc<Inner> {
        self.0.clone()
    }
}

impl fmt::Display for Semaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Semaphore instance for queue {}", self.0.queue_key)
    }
}

fn expiry_secs(expiry: Option<Duration>) -> u64 {
    expiry.map(|d| d.as_secs()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_capacity() {
        let err = SemaphoreBuilder::new("x", 0, "redis://127.0.0.1:6379")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn empty_name_is_accepted() {
        // Matches the original ground truth: an empty `name` is a valid,
        // if unusual, key component, not a validation failure.
        let semaphore = SemaphoreBuilder::new("", 1, "redis://127.0.0.1:6379")
            .build()
            .unwrap();
        assert_eq!(semaphore.queue_key(), "__self-limiters:");
    }

    #[test]
    fn rejects_zero_pool_size() {
        let err = SemaphoreBuilder::new("x", 1, "redis://127.0.0.1:6379")
            .connection_pool_size(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn accepts_minimal_config_without_connecting() {
        let semaphore = SemaphoreBuilder::new("test", 1, "redis://127.0.0.1:6379")
            .build()
            .expect("valid config");
        assert_eq!(semaphore.capacity(), 1);
        assert_eq!(semaphore.name(), "test");
        assert!(semaphore.max_sleep().is_zero());
    }

    #[test]
    fn display_matches_repr_convention() {
        let semaphore = SemaphoreBuilder::new("test", 1, "redis://127.0.0.1:6379")
            .build()
            .unwrap();
        assert_eq!(
            semaphore.to_string(),
            "Semaphore instance for queue __self-limiters:test"
        );
    }

    #[test]
    fn clone_shares_the_same_queue_key() {
        let semaphore = SemaphoreBuilder::new("test", 1, "redis://127.0.0.1:6379")
            .build()
            .unwrap();
        let cloned = semaphore.clone();
        assert_eq!(semaphore.queue_key(), cloned.queue_key());
    }
}
