use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::bucket::Bucket;
use super::callback::Callback;
use super::config::Config;
use super::queue::HandoffQueue;
use super::types::{PoolError, State, SubmitError};

/// Spreads submitted items over a fixed set of buckets and flushes each one
/// to the callback when it fills up or when the flush interval elapses.
///
/// Items go to whichever bucket worker is free first. `submit` waits while
/// every worker is busy, which is how a slow callback throttles producers.
///
/// `Pool` is a cheap handle: clones share the same buckets. Dropping the last
/// handle without stopping closes the pool in the background.
///
/// Items must be `Sync` as well as `Send`: each bucket buffer lives in a
/// `tokio::sync::RwLock<Vec<T>>` shared between tasks, and that lock is only
/// `Sync` when `T` is.
pub struct Pool<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    config: Arc<Config>,
    buckets: Vec<Arc<Bucket<T>>>,
    queue: Arc<HandoffQueue<T>>,
    stop: CancellationToken,
    state: AtomicU8,
    timer: Mutex<Option<JoinHandle<Result<(), PoolError>>>>,
}

impl<T> Clone for Pool<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Pool<T>
where
    T: Send + Sync + 'static,
{
    pub fn new<C>(config: Arc<Config>, callback: C) -> Result<Self, PoolError>
    where
        C: Callback<T> + 'static,
    {
        config.validate()?;

        let queue = Arc::new(HandoffQueue::new(config.bucket_count));
        let callback: Arc<dyn Callback<T>> = Arc::new(callback);
        let buckets = (1..=config.bucket_count)
            .map(|id| {
                Arc::new(Bucket::new(
                    id,
                    config.bucket_capacity,
                    config.flush_empty,
                    queue.clone(),
                    callback.clone(),
                ))
            })
            .collect();

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                buckets,
                queue,
                stop: CancellationToken::new(),
                state: AtomicU8::new(State::Created as u8),
                timer: Mutex::new(None),
            }),
        })
    }

    /// Hands `item` to the first free bucket worker.
    ///
    /// Waits while all workers are busy. Fails, giving the item back, once
    /// the pool is stopping or stopped.
    pub async fn submit(&self, item: T) -> Result<(), SubmitError<T>> {
        self.inner.queue.push(item).await.map_err(SubmitError)
    }

    /// Returns the number of items currently held by each bucket, keyed by
    /// bucket id. Buckets are read one after another, not atomically.
    pub async fn snapshot(&self) -> BTreeMap<usize, usize> {
        let mut data = BTreeMap::new();
        for bucket in &self.inner.buckets {
            data.insert(bucket.id(), bucket.snapshot().await);
        }
        data
    }

    /// Spawns one worker per bucket plus the periodic flush task.
    ///
    /// Must be called from within a Tokio runtime, and only once.
    pub async fn start(&self) -> Result<(), PoolError> {
        let mut timer = self.inner.timer.lock().await;
        self.transition(State::Created, State::Running, "start")?;

        let workers: Vec<(usize, JoinHandle<()>)> = self
            .inner
            .buckets
            .iter()
            .map(|bucket| {
                let bucket = bucket.clone();
                (bucket.id(), tokio::spawn(async move { bucket.run().await }))
            })
            .collect();

        *timer = Some(tokio::spawn(Self::timed_flushes(
            self.inner.buckets.clone(),
            self.inner.config.flush_interval,
            self.inner.stop.clone(),
            workers,
        )));

        info!(
            bucket_count = self.inner.config.bucket_count,
            bucket_capacity = self.inner.config.bucket_capacity,
            flush_interval = ?self.inner.config.flush_interval,
            "pool started"
        );
        Ok(())
    }

    /// Stops accepting items and returns immediately.
    ///
    /// Workers finish the items already handed to them, then the flush task
    /// runs a last pass over every bucket. Calling it again is a no-op.
    pub fn stop(&self) {
        if self.advance(State::Stopping) {
            info!("pool stopping");
        }
        self.inner.queue.close();
        self.inner.stop.cancel();
    }

    /// Stops the pool and waits until every accepted item has been flushed.
    ///
    /// Reports worker or flush tasks that panicked, typically because the
    /// callback did. There is no timeout: a callback that never returns
    /// blocks this forever.
    pub async fn stop_and_wait(&self) -> Result<(), PoolError> {
        self.stop();

        let mut timer = self.inner.timer.lock().await;
        let result = match timer.take() {
            Some(handle) => handle.await.unwrap_or_else(|e| Err(PoolError::TimerFailed(e))),
            None => Ok(()),
        };

        if self.advance(State::Stopped) {
            info!("pool stopped");
        }
        result
    }

    pub fn state(&self) -> State {
        State::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    /// True once the pool no longer accepts items.
    pub fn is_closed(&self) -> bool {
        self.inner.queue.is_closed()
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn bucket_count(&self) -> usize {
        self.inner.buckets.len()
    }

    fn transition(&self, from: State, to: State, op: &'static str) -> Result<(), PoolError> {
        self.inner
            .state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|actual| PoolError::InvalidState {
                op,
                state: State::from_u8(actual),
            })
    }

    /// Moves the state forward to `to`; returns false if it was already there
    /// or beyond.
    fn advance(&self, to: State) -> bool {
        self.inner
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < to as u8).then_some(to as u8)
            })
            .is_ok()
    }

    async fn timed_flushes(
        buckets: Vec<Arc<Bucket<T>>>,
        period: Duration,
        stop: CancellationToken,
        workers: Vec<(usize, JoinHandle<()>)>,
    ) -> Result<(), PoolError> {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut errors = Vec::new();
        // One forced flush per bucket at most; a slow callback only holds back its own bucket.
        let mut in_flight: Vec<Option<JoinHandle<()>>> = buckets.iter().map(|_| None).collect();

        loop {
            tokio::select! {
                biased;

                _ = stop.cancelled() => break,

                _ = ticker.tick() => {
                    debug!("periodic flush");
                    for (bucket, slot) in buckets.iter().zip(in_flight.iter_mut()) {
                        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
                            debug!(bucket_id = bucket.id(), "previous flush still running, skipping");
                            continue;
                        }
                        if let Some(handle) = slot.take() {
                            errors.extend(Self::join_flush(bucket.id(), handle).await);
                        }
                        let bucket = bucket.clone();
                        *slot = Some(tokio::spawn(async move { bucket.force_flush().await }));
                    }
                }
            }
        }

        for (bucket, slot) in buckets.iter().zip(in_flight) {
            if let Some(handle) = slot {
                errors.extend(Self::join_flush(bucket.id(), handle).await);
            }
        }

        // Let workers append what they already hold before the last pass.
        for (bucket_id, handle) in workers {
            if let Err(e) = handle.await {
                error!(bucket_id, error = %e, "bucket worker failed");
                errors.push(PoolError::WorkerPanicked { bucket_id });
            }
        }

        debug!("final flush");
        errors.extend(Self::flush_all(&buckets).await);
        PoolError::from_errors(errors)
    }

    /// Force-flushes every bucket concurrently, then joins them all.
    async fn flush_all(buckets: &[Arc<Bucket<T>>]) -> Vec<PoolError> {
        let handles: Vec<(usize, JoinHandle<()>)> = buckets
            .iter()
            .map(|bucket| {
                let bucket = bucket.clone();
                (bucket.id(), tokio::spawn(async move { bucket.force_flush().await }))
            })
            .collect();

        let mut errors = Vec::new();
        for (bucket_id, handle) in handles {
            errors.extend(Self::join_flush(bucket_id, handle).await);
        }
        errors
    }

    async fn join_flush(bucket_id: usize, handle: JoinHandle<()>) -> Option<PoolError> {
        handle.await.err().map(|e| {
            error!(bucket_id, error = %e, "flush failed");
            PoolError::WorkerPanicked { bucket_id }
        })
    }
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        self.queue.close();
        self.stop.cancel();
    }
}
