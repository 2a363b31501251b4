//! # bucket-pool
//!
//! A concurrent batching pool built on Tokio.
//!
//! ## Features
//!
//! - **Bounded-size batches**: each bucket is flushed as soon as it fills up
//! - **Bounded latency**: a periodic forced flush empties partially filled buckets
//! - **Backpressure** via a zero-capacity handoff between producers and workers
//! - **Graceful shutdown** that drains every accepted item before returning
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bucket_pool::pool::{ConfigBuilder, Pool};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let config = Arc::new(
//!     ConfigBuilder::default()
//!         .bucket_count(4usize)
//!         .bucket_capacity(100usize)
//!         .flush_interval(Duration::from_secs(1))
//!         .build()?,
//! );
//!
//! let pool = Pool::new(config, |batch: Vec<u64>| async move {
//!     println!("writing {} rows", batch.len());
//! })?;
//! pool.start().await?;
//! pool.submit(42).await?;
//! pool.stop_and_wait().await?;
//! ```
//!
//! ## Modules
//!
//! - [`pool`] - Buckets, the handoff queue, and the pool lifecycle

pub mod pool;
