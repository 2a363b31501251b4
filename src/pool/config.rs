// src/pool/config.rs

use derive_builder::Builder;
use std::time::Duration;

use super::types::PoolError;

#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct Config {
    /// Number of buckets, each served by its own worker task
    #[builder(default = "1")]
    pub(crate) bucket_count: usize,

    /// Maximum number of items a bucket holds before it is flushed
    #[builder(default = "1")]
    pub(crate) bucket_capacity: usize,

    /// Period of the forced flush over every bucket
    #[builder(default = "Duration::from_secs(5)")]
    pub(crate) flush_interval: Duration,

    /// Whether forced flushes call the callback for empty buckets
    #[builder(default = "false")]
    pub(crate) flush_empty: bool,
}

impl Config {
    /// Creates a config with the given sizes and empty flushes skipped
    pub fn new(bucket_count: usize, bucket_capacity: usize, flush_interval: Duration) -> Self {
        Config {
            bucket_count,
            bucket_capacity,
            flush_interval,
            flush_empty: false,
        }
    }

    /// Returns the number of buckets
    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.bucket_count
    }

    /// Returns the capacity of every bucket
    #[inline]
    pub fn bucket_capacity(&self) -> usize {
        self.bucket_capacity
    }

    /// Returns the forced flush period
    #[inline]
    pub fn flush_interval(&self) -> Duration {
        self.flush_interval
    }

    /// Returns whether forced flushes call back with empty batches
    #[inline]
    pub fn flush_empty(&self) -> bool {
        self.flush_empty
    }

    /// Rejects zero bucket count, zero capacity or a zero interval
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.bucket_count == 0 {
            return Err(PoolError::InvalidConfig(
                "bucket_count must be at least 1".to_string(),
            ));
        }
        if self.bucket_capacity == 0 {
            return Err(PoolError::InvalidConfig(
                "bucket_capacity must be at least 1".to_string(),
            ));
        }
        if self.flush_interval.is_zero() {
            return Err(PoolError::InvalidConfig(
                "flush_interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
