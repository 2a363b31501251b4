use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use super::callback::Callback;
use super::queue::HandoffQueue;

/// A fixed-capacity buffer served by exactly one worker task.
///
/// The buffer sits behind a reader/writer lock: appends and flushes take the
/// write side, snapshots the read side.
pub(crate) struct Bucket<T> {
    id: usize,
    capacity: usize,
    flush_empty: bool,
    buffer: RwLock<Vec<T>>,
    queue: Arc<HandoffQueue<T>>,
    callback: Arc<dyn Callback<T>>,
}

impl<T> Bucket<T>
where
    T: Send + Sync + 'static,
{
    pub(crate) fn new(
        id: usize,
        capacity: usize,
        flush_empty: bool,
        queue: Arc<HandoffQueue<T>>,
        callback: Arc<dyn Callback<T>>,
    ) -> Self {
        Self {
            id,
            capacity,
            flush_empty,
            buffer: RwLock::new(Vec::with_capacity(capacity)),
            queue,
            callback,
        }
    }

    pub(crate) fn id(&self) -> usize {
        self.id
    }

    /// Worker loop: pull items until the queue is closed and drained,
    /// flushing whenever the buffer fills up.
    pub(crate) async fn run(&self) {
        debug!(bucket_id = self.id, "bucket worker started");

        while let Some(item) = self.queue.pop().await {
            let mut buffer = self.buffer.write().await;
            buffer.push(item);
            if buffer.len() >= self.capacity {
                self.flush(&mut buffer).await;
            }
        }

        debug!(bucket_id = self.id, "bucket worker stopped");
    }

    /// Flushes whatever the bucket holds, regardless of fill level.
    pub(crate) async fn force_flush(&self) {
        let mut buffer = self.buffer.write().await;
        if buffer.is_empty() && !self.flush_empty {
            return;
        }
        self.flush(&mut buffer).await;
    }

    /// Current number of buffered items.
    pub(crate) async fn snapshot(&self) -> usize {
        self.buffer.read().await.len()
    }

    // Takes the buffer by `&mut` so it can only be reached through a held
    // write guard.
    async fn flush(&self, buffer: &mut Vec<T>) {
        let batch = std::mem::replace(buffer, Vec::with_capacity(self.capacity));
        trace!(bucket_id = self.id, batch_size = batch.len(), "flushing bucket");
        self.callback.call(batch).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::sleep;

    type Batches = Arc<Mutex<Vec<Vec<i32>>>>;

    fn recorder() -> (Batches, Arc<dyn Callback<i32>>) {
        let batches: Batches = Arc::new(Mutex::new(Vec::new()));
        let sink = batches.clone();
        let callback = move |batch: Vec<i32>| {
            let sink = sink.clone();
            async move {
                sink.lock().unwrap().push(batch);
            }
        };
        let callback: Arc<dyn Callback<i32>> = Arc::new(callback);
        (batches, callback)
    }

    fn bucket(
        capacity: usize,
        flush_empty: bool,
    ) -> (Arc<Bucket<i32>>, Arc<HandoffQueue<i32>>, Batches) {
        let queue = Arc::new(HandoffQueue::new(1));
        let (batches, callback) = recorder();
        let bucket = Arc::new(Bucket::new(1, capacity, flush_empty, queue.clone(), callback));
        (bucket, queue, batches)
    }

    #[tokio::test]
    async fn test_run_flushes_full_buffers_in_order() {
        let (bucket, queue, batches) = bucket(3, false);

        let worker = {
            let bucket = bucket.clone();
            tokio::spawn(async move { bucket.run().await })
        };

        for i in 0..7 {
            queue.push(i).await.unwrap();
        }
        queue.close();
        worker.await.unwrap();

        assert_eq!(*batches.lock().unwrap(), vec![vec![0, 1, 2], vec![3, 4, 5]]);
        // The trailing item stays buffered until a forced flush.
        assert_eq!(bucket.snapshot().await, 1);

        bucket.force_flush().await;
        assert_eq!(bucket.snapshot().await, 0);
        assert_eq!(batches.lock().unwrap().last(), Some(&vec![6]));
    }

    #[tokio::test]
    async fn test_force_flush_skips_empty_buffer_by_default() {
        let (bucket, _queue, batches) = bucket(4, false);

        bucket.force_flush().await;

        assert!(batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_force_flush_empty_when_enabled() {
        let (bucket, _queue, batches) = bucket(4, true);

        bucket.force_flush().await;
        bucket.force_flush().await;

        assert_eq!(*batches.lock().unwrap(), vec![Vec::<i32>::new(), Vec::new()]);
    }

    #[tokio::test]
    async fn test_snapshot_tracks_fill_level() {
        let (bucket, queue, batches) = bucket(5, false);
        let worker = {
            let bucket = bucket.clone();
            tokio::spawn(async move { bucket.run().await })
        };

        for i in 0..3 {
            queue.push(i).await.unwrap();
        }
        // The last push only guarantees hand-off, give the worker a moment to append.
        sleep(Duration::from_millis(20)).await;
        assert_eq!(bucket.snapshot().await, 3);

        bucket.force_flush().await;
        assert_eq!(bucket.snapshot().await, 0);
        assert_eq!(*batches.lock().unwrap(), vec![vec![0, 1, 2]]);

        queue.close();
        worker.await.unwrap();
        assert_eq!(bucket.id(), 1);
    }

    #[tokio::test]
    async fn test_callback_owns_its_batch() {
        let (bucket, queue, batches) = bucket(2, false);
        let worker = {
            let bucket = bucket.clone();
            tokio::spawn(async move { bucket.run().await })
        };

        for i in 0..4 {
            queue.push(i).await.unwrap();
        }
        queue.close();
        worker.await.unwrap();

        // Later flushes must not disturb batches already handed out.
        let recorded = batches.lock().unwrap().clone();
        assert_eq!(recorded, vec![vec![0, 1], vec![2, 3]]);
    }
}
