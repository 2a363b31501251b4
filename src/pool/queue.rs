// src/pool/queue.rs

use tokio::sync::{Mutex, mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// A one-shot slot a waiting worker offers to producers.
type Slot<T> = oneshot::Sender<T>;

/// Zero-capacity rendezvous between producers and bucket workers.
///
/// A worker calling [`pop`](Self::pop) offers a fresh slot on the `ready`
/// channel; a producer calling [`push`](Self::push) takes the first slot on
/// offer and hands its item straight into it. Nothing is stored in between,
/// so a producer waits exactly as long as no worker is free.
///
/// Closing races with pushing as follows. On close, a waiting worker seals its
/// slot and keeps whatever was already handed over. A push that reached the
/// slot first is accepted and drained by that worker; a push arriving after
/// the seal gets its item bounced back and returns it to the caller.
pub(crate) struct HandoffQueue<T> {
    ready_tx: mpsc::Sender<Slot<T>>,
    ready_rx: Mutex<mpsc::Receiver<Slot<T>>>,
    closed: CancellationToken,
}

impl<T> HandoffQueue<T> {
    /// `workers` bounds the number of slots that can be on offer at once.
    pub(crate) fn new(workers: usize) -> Self {
        let (ready_tx, ready_rx) = mpsc::channel(workers.max(1));

        Self {
            ready_tx,
            ready_rx: Mutex::new(ready_rx),
            closed: CancellationToken::new(),
        }
    }

    /// Hands `item` to a waiting worker.
    ///
    /// Returns `Err(item)` without waiting if the queue is already closed, or
    /// as soon as it closes while this push is still waiting for a worker.
    pub(crate) async fn push(&self, mut item: T) -> Result<(), T> {
        loop {
            if self.closed.is_cancelled() {
                return Err(item);
            }

            let slot = {
                let mut ready = self.ready_rx.lock().await;
                tokio::select! {
                    biased;
                    _ = self.closed.cancelled() => None,
                    slot = ready.recv() => slot,
                }
            };

            let Some(slot) = slot else {
                return Err(item);
            };

            // A sealed or abandoned slot gives the item back; try the next one.
            match slot.send(item) {
                Ok(()) => return Ok(()),
                Err(back) => item = back,
            }
        }
    }

    /// Waits for the next item.
    ///
    /// Returns `None` once the queue is closed and nothing was handed to this
    /// worker before it sealed its slot.
    pub(crate) async fn pop(&self) -> Option<T> {
        loop {
            if self.closed.is_cancelled() {
                return None;
            }

            let (slot, mut rx) = oneshot::channel();
            // Each worker has at most one slot on offer, so this never waits.
            if self.ready_tx.send(slot).await.is_err() {
                return None;
            }

            tokio::select! {
                biased;
                item = &mut rx => {
                    if let Ok(item) = item {
                        return Some(item);
                    }
                }
                _ = self.closed.cancelled() => {
                    rx.close();
                    return rx.try_recv().ok();
                }
            }
        }
    }

    /// Closes the queue. Waiting pushes and pops wake up immediately.
    ///
    /// Closing an already closed queue is a no-op.
    pub(crate) fn close(&self) {
        self.closed.cancel();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}
