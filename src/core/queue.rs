//! Multi-consumer FIFO queue shared by workers.

use crate::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

/// Unbounded FIFO queue with many producers and many consumers.
///
/// Pushing never blocks. Consumers take turns on the receiving end, so each
/// item is handed to exactly one consumer.
pub struct WorkQueue<T> {
    sender: mpsc::UnboundedSender<T>,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<T>>>,
    unfinished: Arc<AtomicUsize>,
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            receiver: Arc::clone(&self.receiver),
            unfinished: Arc::clone(&self.unfinished),
        }
    }
}

impl<T: Send> WorkQueue<T> {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            unfinished: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Enqueue an item.
    pub fn push(&self, item: T) -> Result<()> {
        // Count first so a fast consumer's `task_done` never runs ahead of it.
        self.unfinished.fetch_add(1, Ordering::AcqRel);
        self.sender.send(item).map_err(|_| {
            self.unfinished.fetch_sub(1, Ordering::AcqRel);
            crate::Error::other("work queue receiver dropped")
        })
    }

    /// Take an item only if one is ready right now.
    ///
    /// Returns `None` if another consumer currently holds the receiving end.
    pub fn try_pop(&self) -> Option<T> {
        let mut receiver = self.receiver.try_lock().ok()?;
        receiver.try_recv().ok()
    }

    /// Wait at most `timeout` for an item.
    pub async fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let receive = async { self.receiver.lock().await.recv().await };
        tokio::time::timeout(timeout, receive).await.ok().flatten()
    }

    /// Mark one dequeued item as fully processed.
    pub fn task_done(&self) {
        let _ = self
            .unfinished
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    /// Items pushed but not yet marked done.
    pub fn unfinished(&self) -> usize {
        self.unfinished.load(Ordering::Acquire)
    }

    /// Remove every item that is ready right now.
    pub fn drain_ready(&self) -> Vec<T> {
        let mut items = Vec::new();
        while let Some(item) = self.try_pop() {
            items.push(item);
        }
        items
    }
}

impl<T: Send> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = WorkQueue::new();
        for i in 0..3 {
            queue.push(i).unwrap();
        }
        assert_eq!(queue.try_pop(), Some(0));
        assert_eq!(queue.pop_timeout(Duration::from_millis(10)).await, Some(1));
        assert_eq!(queue.drain_ready(), vec![2]);
        assert_eq!(queue.try_pop(), None);
    }

    #[tokio::test]
    async fn test_pop_timeout_on_empty_queue() {
        let queue: WorkQueue<u8> = WorkQueue::new();
        assert_eq!(queue.pop_timeout(Duration::from_millis(10)).await, None);
    }

    #[test]
    fn test_task_done_tracks_unfinished() {
        let queue = WorkQueue::new();
        queue.push('a').unwrap();
        queue.push('b').unwrap();
        assert_eq!(queue.unfinished(), 2);
        queue.try_pop();
        queue.task_done();
        assert_eq!(queue.unfinished(), 1);
        queue.task_done();
        queue.task_done();
        assert_eq!(queue.unfinished(), 0);
    }
}
