//! Simple pool example showing concurrent batching.
//!
//! Run with: cargo run --example simple_pool

use async_trait::async_trait;
use bucket_pool::pool::{Callback, ConfigBuilder, Pool};
use std::sync::Arc;
use std::time::Duration;

/// Simple callback that prints batch information
struct PrintingCallback;

#[async_trait]
impl Callback<i32> for PrintingCallback {
    async fn call(&self, batch: Vec<i32>) {
        println!("Flushing batch of {} items: {:?}", batch.len(), batch);
        // Simulate a bulk write
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    // Create pool configuration using builder
    let config = Arc::new(
        ConfigBuilder::default()
            .bucket_count(2usize)
            .bucket_capacity(10usize)
            .flush_interval(Duration::from_secs(1))
            .build()?,
    );

    let pool = Pool::new(config, PrintingCallback)?;
    pool.start().await?;

    println!("Starting pool...");
    println!("- Buckets: 2");
    println!("- Bucket capacity: 10");
    println!("- Submitting 55 items\n");

    // Producer: submit items
    let producer = {
        let pool = pool.clone();
        tokio::spawn(async move {
            for i in 0..55 {
                if let Err(e) = pool.submit(i).await {
                    eprintln!("Failed to submit item {}: {}", i, e);
                    break;
                }
            }
        })
    };

    producer.await?;
    println!("Fill levels before shutdown: {:?}", pool.snapshot().await);

    // Remaining partial batches are flushed on shutdown
    pool.stop_and_wait().await?;

    println!("\nPool stopped, all items flushed!");
    Ok(())
}
