//! Run with: `cargo run --bin token_bucket_demo -- redis://127.0.0.1:6379`
//!
//! Issues a burst of acquisitions against a bucket refilling 5 tokens per
//! second and logs the pacing between them.

use redis_limiters::TokenBucketBuilder;
use std::time::{Duration, Instant};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let redis_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "redis://127.0.0.1:6379".to_string());

    let bucket = TokenBucketBuilder::new(
        "demo-api",
        5,
        Duration::from_secs(1),
        5,
        redis_url,
    )
    .max_sleep(Duration::from_secs(5))
    .build()?;

    let start = Instant::now();
    for i in 0..10 {
        bucket.acquire().await?;
        tracing::info!(call = i, elapsed = ?start.elapsed(), "token spent");
    }

    Ok(())
}
