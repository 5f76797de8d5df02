//! Distributed coordination primitives backed by Redis.
//!
//! This crate provides two building blocks for coordinating work across
//! processes that share a Redis instance:
//!
//! - [`Semaphore`]: a fair, FIFO counting semaphore. Acquiring blocks
//!   (without holding an OS thread) until a permit is available, and
//!   returns an RAII [`SemaphoreGuard`] that returns the permit on release
//!   or on drop.
//! - [`TokenBucket`]: a paced rate limiter. Acquiring schedules the
//!   caller's next admissible slot and sleeps until it arrives, returning
//!   a [`TokenBucketGuard`] that has nothing further to release.
//!
//! Both are built through a validating builder
//! ([`SemaphoreBuilder`], [`TokenBucketBuilder`]) and share the same
//! [`Error`] type and the same underlying connection pool design: a
//! bounded set of exclusively-checked-out connections, so blocking
//! commands never stall unrelated callers.
//!
//! ## Clock
//!
//! Every time-based decision — permit-queue TTLs, scheduled slots — is
//! computed from the Redis server's own `TIME` command, never the local
//! clock, so behavior is consistent across clients with skewed clocks.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod pool;
mod semaphore;
mod token_bucket;

pub use error::Error;
pub use semaphore::{Semaphore, SemaphoreBuilder, SemaphoreGuard};
pub use token_bucket::{TokenBucket, TokenBucketBuilder, TokenBucketGuard};
