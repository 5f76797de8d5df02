//! The substrate adapter: a bounded connection pool plus script caching.
//!
//! Every command either [`Semaphore`](crate::Semaphore) or
//! [`TokenBucket`](crate::TokenBucket) issues against Redis funnels through
//! a [`Pool`]. The pool never holds the caller's OS thread: acquiring a
//! connection and every subsequent I/O call is a regular `.await` point.
//!
//! Connections are handed out for the exclusive duration of one script
//! evaluation or one blocking pop, then returned to the idle set. Because a
//! checked-out connection is never shared with another concurrent task,
//! issuing a blocking command such as `BLPOP` on it cannot stall unrelated
//! callers, which is the usual hazard of blocking commands on a connection
//! multiplexed across many callers.

use parking_lot::Mutex;
use redis::aio::MultiplexedConnection;
use redis::Client;
use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use tokio::sync::{Semaphore as TokioSemaphore, SemaphorePermit};
use tracing::debug;

use crate::error::Error;

pub(crate) mod script;
pub(crate) use script::ScriptHandle;

/// A bounded pool of Redis connections shared by one limiter instance.
///
/// Construction never touches the network or even parses the connection
/// string: both the URL and the server itself are only validated the first
/// time a connection is actually needed, so a limiter can be constructed
/// with a bad `redis_url` and only fail later, on the first `acquire()`
/// (§7, §8 scenario 8).
pub(crate) struct Pool {
    redis_url: String,
    idle: Mutex<VecDeque<MultiplexedConnection>>,
    permits: TokioSemaphore,
}

impl Pool {
    pub(crate) fn new(redis_url: impl Into<String>, size: usize) -> Self {
        Self {
            redis_url: redis_url.into(),
            idle: Mutex::new(VecDeque::with_capacity(size)),
            permits: TokioSemaphore::new(size),
        }
    }

    /// Checks out a connection, creating a new one if the idle set is empty.
    ///
    /// Suspends (without blocking an OS thread) until a pool slot is free.
    /// The first checkout is where a malformed `redis_url` or an
    /// unreachable server surfaces as a [`Error::Store`].
    pub(crate) async fn checkout(&self) -> Result<PooledConnection<'_>, Error> {
        let permit = self
            .permits
            .acquire()
            .await
            .expect("pool semaphore is never closed");

        let existing = self.idle.lock().pop_front();
        let conn = match existing {
            Some(conn) => conn,
            None => {
                debug!(url = %self.redis_url, "opening new pooled redis connection");
                let client = Client::open(self.redis_url.as_str())?;
                client.get_multiplexed_async_connection().await?
            }
        };

        Ok(PooledConnection {
            pool: self,
            conn: Some(conn),
            _permit: permit,
        })
    }

    fn checkin(&self, conn: MultiplexedConnection) {
        self.idle.lock().push_back(conn);
    }
}

/// A connection checked out from a [`Pool`].
///
/// Returned to the pool's idle set on drop so the next checkout can reuse
/// the underlying socket instead of opening a new one.
pub(crate) struct PooledConnection<'a> {
    pool: &'a Pool,
    conn: Option<MultiplexedConnection>,
    _permit: SemaphorePermit<'a>,
}

impl Deref for PooledConnection<'_> {
    type Target = MultiplexedConnection;

    fn deref(&self) -> &Self::Target {
        self.conn.as_ref().expect("connection taken before drop")
    }
}

impl DerefMut for PooledConnection<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_mut().expect("connection taken before drop")
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.checkin(conn);
        }
    }
}
