//! Error-surface tests that don't require a live Redis instance: every
//! case here is rejected by validation before any I/O happens.

use redis_limiters::{Error, SemaphoreBuilder, TokenBucketBuilder};
use std::time::Duration;

#[test]
fn semaphore_rejects_zero_capacity() {
    let err = SemaphoreBuilder::new("x", 0, "redis://127.0.0.1:6379")
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(err.to_string(), "invalid parameter: capacity must be >= 1");
}

#[test]
fn semaphore_accepts_empty_name() {
    // An empty `name` is a valid, if unusual, key component — not rejected.
    SemaphoreBuilder::new("", 1, "redis://127.0.0.1:6379")
        .build()
        .unwrap();
}

#[test]
fn semaphore_rejects_zero_pool_size() {
    let err = SemaphoreBuilder::new("x", 1, "redis://127.0.0.1:6379")
        .connection_pool_size(0)
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[test]
fn token_bucket_rejects_zero_refill_frequency() {
    let err = TokenBucketBuilder::new("x", 1, Duration::ZERO, 1, "redis://127.0.0.1:6379")
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[test]
fn token_bucket_rejects_zero_refill_amount() {
    let err = TokenBucketBuilder::new(
        "x",
        1,
        Duration::from_secs(1),
        0,
        "redis://127.0.0.1:6379",
    )
    .build()
    .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[test]
fn token_bucket_rejects_zero_capacity() {
    let err = TokenBucketBuilder::new(
        "x",
        0,
        Duration::from_secs(1),
        1,
        "redis://127.0.0.1:6379",
    )
    .build()
    .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
#[ignore]
async fn semaphore_wait_past_max_sleep_surfaces_max_sleep_exceeded() {
    // Requires a live Redis instance: hold the only permit, then confirm
    // a second, tightly-bounded acquisition is rejected with the right
    // variant rather than hanging.
    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let name = format!("errors-test-{}", uuid::Uuid::new_v4());

    let semaphore = SemaphoreBuilder::new(&name, 1, &redis_url).build().unwrap();
    let _held = semaphore.acquire().await.unwrap();

    let bounded = SemaphoreBuilder::new(&name, 1, &redis_url)
        .max_sleep(Duration::from_millis(100))
        .build()
        .unwrap();
    let err = bounded.acquire().await.unwrap_err();
    assert!(matches!(err, Error::MaxSleepExceeded { .. }));
}
