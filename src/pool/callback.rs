// src/pool/callback.rs

use async_trait::async_trait;

/// Receives every batch flushed out of a bucket.
///
/// The callback runs on the task that triggered the flush (a bucket worker or
/// the timer task) while that bucket's write lock is held, so a slow callback
/// stalls its bucket. It must not submit to or stop the pool that calls it.
/// The batch is an owned `Vec` the pool never touches again.
#[async_trait]
pub trait Callback<T>: Send + Sync {
    async fn call(&self, batch: Vec<T>);
}

#[async_trait]
impl<T, F, Fut> Callback<T> for F
where
    F: Fn(Vec<T>) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = ()> + Send,
    T: Send + 'static,
{
    async fn call(&self, batch: Vec<T>) {
        self(batch).await
    }
}
