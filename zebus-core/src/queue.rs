//! Dispatch Queue — a named, single-consumer, serial task executor.
//!
//! Modeled on the hub/actor loop shape used elsewhere in this codebase
//! (`RouterHub`, `PubSubHub`): a `flume` channel feeding a single
//! `compio`-spawned consumer task. Tasks of one queue run strictly one
//! after another, in arrival order; tasks of different queues run
//! independently.

use flume::{Receiver, Sender};
use futures::future::BoxFuture;

/// One unit of work submitted to a [`DispatchQueue`].
///
/// Boxed as a `FnOnce` producing a future so both sync and async
/// handlers can be represented uniformly: a sync handler's thunk
/// returns an already-ready future.
pub type QueueTask = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

enum QueueMessage {
    Task(QueueTask),
    Stop,
}

/// A named cooperative executor.
///
/// `DispatchQueue` does not own a dedicated OS thread or executor: its
/// consumer loop is a single task on the shared `compio` runtime, so
/// continuations a handler schedules with `compio::runtime::spawn`
/// always resume on the ambient runtime, never something special to
/// this queue (spec §4.H, "task scheduler isolation").
pub struct DispatchQueue {
    name: String,
    sender: Sender<QueueMessage>,
    // Kept alongside the consumer's own clone so `purge_tasks` can race
    // the consumer for not-yet-started tasks and discard them instead.
    drain: Receiver<QueueMessage>,
}

impl DispatchQueue {
    /// Create a new dispatch queue and spawn its consumer loop.
    #[must_use]
    pub fn start(name: impl Into<String>) -> Self {
        let (sender, receiver) = flume::unbounded();
        let name = name.into();
        let consumer_rx = receiver.clone();
        compio::runtime::spawn(Self::run(consumer_rx)).detach();
        Self {
            name,
            sender,
            drain: receiver,
        }
    }

    /// Name this queue was created with.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    async fn run(receiver: Receiver<QueueMessage>) {
        while let Ok(message) = receiver.recv_async().await {
            match message {
                QueueMessage::Task(task) => {
                    task().await;
                }
                QueueMessage::Stop => break,
            }
        }
    }

    /// Append a unit of work; returns immediately.
    pub fn enqueue(&self, task: QueueTask) {
        let _ = self.sender.send(QueueMessage::Task(task));
    }

    /// Atomically remove and discard all pending (not-yet-started)
    /// tasks; return the number discarded.
    ///
    /// A task already handed to the consumer loop is unaffected; this
    /// only reclaims messages still sitting in the channel buffer.
    #[must_use]
    pub fn purge_tasks(&self) -> usize {
        let mut purged = 0usize;
        while let Ok(message) = self.drain.try_recv() {
            if let QueueMessage::Task(_) = message {
                purged += 1;
            }
        }
        purged
    }

    /// Stop dequeuing; pending tasks are abandoned.
    pub fn stop(&self) {
        let _ = self.sender.send(QueueMessage::Stop);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[compio::test]
    async fn tasks_run_serially_in_arrival_order() {
        let queue = DispatchQueue::start("test-queue");
        let order = Arc::new(parking_lot_free_mutex());
        for i in 0..5u32 {
            let order = order.clone();
            queue.enqueue(Box::new(move || {
                Box::pin(async move {
                    order.lock_and_push(i);
                })
            }));
        }
        // Give the consumer loop a chance to drain.
        compio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(order.snapshot(), vec![0, 1, 2, 3, 4]);
    }

    #[compio::test]
    async fn no_two_tasks_of_one_queue_run_concurrently() {
        let queue = DispatchQueue::start("concurrency-check");
        let concurrent = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        for _ in 0..10u32 {
            let concurrent = concurrent.clone();
            let max_seen = max_seen.clone();
            queue.enqueue(Box::new(move || {
                Box::pin(async move {
                    let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    compio::time::sleep(std::time::Duration::from_millis(5)).await;
                    concurrent.fetch_sub(1, Ordering::SeqCst);
                })
            }));
        }
        compio::time::sleep(std::time::Duration::from_millis(200)).await;
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[compio::test]
    async fn purge_returns_pending_count_and_drops_them() {
        let queue = DispatchQueue::start("purge-check");
        let ran = Arc::new(AtomicUsize::new(0));
        // Stop the consumer first so tasks stay buffered for purge to see.
        queue.stop();
        compio::time::sleep(std::time::Duration::from_millis(10)).await;
        for _ in 0..3u32 {
            let ran = ran.clone();
            queue.enqueue(Box::new(move || {
                Box::pin(async move {
                    ran.fetch_add(1, Ordering::SeqCst);
                })
            }));
        }
        let purged = queue.purge_tasks();
        assert_eq!(purged, 3);
        compio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    // Minimal ordered-log helper kept local to tests: avoids pulling in
    // parking_lot just for a push-and-snapshot vec in test code.
    fn parking_lot_free_mutex() -> OrderLog {
        OrderLog::default()
    }

    #[derive(Default)]
    struct OrderLog(std::sync::Mutex<Vec<u32>>);

    impl OrderLog {
        fn lock_and_push(&self, value: u32) {
            self.0.lock().unwrap().push(value);
        }

        fn snapshot(&self) -> Vec<u32> {
            self.0.lock().unwrap().clone()
        }
    }
}
