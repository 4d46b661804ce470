//! Cooperative cancellation.
//!
//! Workers block on a queue that has no natural "stop" wakeup, so they wait
//! in bounded slices and also race each wait against the token. Shutdown
//! latency is therefore at most one polling interval.
//!
//! Tokens come from `tokio_util`. A phase never resets a token: it takes a
//! fresh child of its host token at `Idle`, so a parent cancel still reaches
//! the running phase while a finished phase cannot leak into the next one.

use super::queue::WorkQueue;
use std::time::Duration;

pub use tokio_util::sync::CancellationToken;

/// Result of a cancellation-aware dequeue.
#[derive(Debug, PartialEq, Eq)]
pub enum Dequeued<T> {
    Item(T),
    Cancelled,
}

impl<T> Dequeued<T> {
    pub fn into_item(self) -> Option<T> {
        match self {
            Dequeued::Item(item) => Some(item),
            Dequeued::Cancelled => None,
        }
    }
}

/// Wait for the next queue item, giving up once `token` is cancelled.
///
/// Once cancelled, an item that is already waiting is still handed out; the
/// call only reports `Cancelled` when nothing is immediately available.
pub async fn poll_dequeue<T: Send>(
    queue: &WorkQueue<T>,
    token: &CancellationToken,
    interval: Duration,
) -> Dequeued<T> {
    loop {
        if token.is_cancelled() {
            return match queue.try_pop() {
                Some(item) => Dequeued::Item(item),
                None => Dequeued::Cancelled,
            };
        }
        tokio::select! {
            item = queue.pop_timeout(interval) => {
                if let Some(item) = item {
                    return Dequeued::Item(item);
                }
            }
            _ = token.cancelled() => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_child_follows_parent() {
        let parent = CancellationToken::new();
        let first = parent.child_token();

        first.cancel();
        assert!(!parent.is_cancelled());

        // A fresh child of an uncancelled parent starts clear.
        let second = parent.child_token();
        assert!(!second.is_cancelled());

        parent.cancel();
        assert!(second.is_cancelled());
        assert!(parent.child_token().is_cancelled());
    }

    #[tokio::test]
    async fn test_poll_dequeue_returns_item() {
        let queue = WorkQueue::new();
        let token = CancellationToken::new();
        queue.push(7).unwrap();

        let got = poll_dequeue(&queue, &token, Duration::from_millis(10)).await;
        assert_eq!(got, Dequeued::Item(7));
    }

    #[tokio::test]
    async fn test_poll_dequeue_hands_out_ready_item_after_cancel() {
        let queue = WorkQueue::new();
        let token = CancellationToken::new();
        queue.push("late").unwrap();
        token.cancel();

        let got = poll_dequeue(&queue, &token, Duration::from_millis(10)).await;
        assert_eq!(got, Dequeued::Item("late"));
        let got = poll_dequeue(&queue, &token, Duration::from_millis(10)).await;
        assert_eq!(got, Dequeued::Cancelled);
    }

    #[tokio::test]
    async fn test_poll_dequeue_observes_cancel_within_interval() {
        let queue: WorkQueue<u32> = WorkQueue::new();
        let token = CancellationToken::new();
        let interval = Duration::from_millis(20);

        let waiter = {
            let queue = queue.clone();
            let token = token.clone();
            tokio::spawn(async move { poll_dequeue(&queue, &token, interval).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        let cancelled_at = Instant::now();
        token.cancel();

        let got = waiter.await.unwrap();
        assert_eq!(got, Dequeued::Cancelled);
        assert!(cancelled_at.elapsed() < interval * 5);
    }
}
