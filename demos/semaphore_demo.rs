//! Run with: `cargo run --bin semaphore_demo -- redis://127.0.0.1:6379`
//!
//! Spawns more workers than permits and logs the order in which each one
//! acquires and releases, demonstrating the FIFO ordering guarantee.

use redis_limiters::SemaphoreBuilder;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let redis_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "redis://127.0.0.1:6379".to_string());

    let semaphore = SemaphoreBuilder::new("demo-resource", 2, redis_url)
        .max_sleep(Duration::from_secs(5))
        .expiry(Duration::from_secs(30))
        .build()?;

    let mut workers = Vec::new();
    for id in 0..5 {
        let semaphore = semaphore.clone();
        workers.push(tokio::spawn(async move {
            let guard = semaphore.acquire().await?;
            tracing::info!(worker = id, token = guard.token(), "holding permit");
            tokio::time::sleep(Duration::from_millis(200)).await;
            guard.release().await?;
            tracing::info!(worker = id, "released permit");
            Ok::<_, redis_limiters::Error>(())
        }));
    }

    for worker in workers {
        worker.await??;
    }

    Ok(())
}
