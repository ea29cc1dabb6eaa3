//! Tests for the work queue
//!
//! These tests run under tokio paused time so the delayed-requeue timing is
//! deterministic.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::{timeout, Instant};

    use super::super::queue::{ResourceKey, WorkQueue};

    fn key(name: &str) -> ResourceKey {
        ResourceKey::new("default", name)
    }

    #[tokio::test(start_paused = true)]
    async fn enqueue_is_idempotent_while_pending() {
        let queue = WorkQueue::new();
        queue.enqueue(key("a"));
        queue.enqueue(key("a"));
        assert_eq!(queue.len(), 1);

        let (delivered, attempt) = queue.dequeue().await;
        assert_eq!(delivered, key("a"));
        assert_eq!(attempt, 1);

        // The second enqueue was deduplicated, so nothing else comes out.
        assert!(timeout(Duration::from_millis(100), queue.dequeue())
            .await
            .is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_key_is_not_delivered_to_a_second_worker() {
        let queue = WorkQueue::new();
        queue.enqueue(key("a"));
        let (delivered, _) = queue.dequeue().await;

        // Re-enqueuing while the key is in flight is a no-op.
        queue.enqueue(key("a"));
        assert!(timeout(Duration::from_millis(100), queue.dequeue())
            .await
            .is_err());

        // After done, the key can be enqueued and dispatched afresh.
        queue.done(&delivered);
        queue.enqueue(key("a"));
        let (again, attempt) = queue.dequeue().await;
        assert_eq!(again, key("a"));
        assert_eq!(attempt, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn requeued_key_is_not_delivered_before_its_delay() {
        let queue = WorkQueue::new();
        queue.enqueue(key("a"));
        let (delivered, _) = queue.dequeue().await;

        queue.requeue(delivered.clone(), Duration::from_secs(10));
        queue.done(&delivered);

        let waited_from = Instant::now();
        let (again, attempt) = queue.dequeue().await;
        assert_eq!(again, delivered);
        assert_eq!(attempt, 2);
        assert!(waited_from.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn requeue_with_zero_delay_still_waits_for_done() {
        let queue = WorkQueue::new();
        queue.enqueue(key("a"));
        let (delivered, _) = queue.dequeue().await;

        queue.requeue(delivered.clone(), Duration::ZERO);
        assert!(timeout(Duration::from_millis(100), queue.dequeue())
            .await
            .is_err());

        queue.done(&delivered);
        let (again, _) = queue.dequeue().await;
        assert_eq!(again, delivered);
    }

    #[tokio::test(start_paused = true)]
    async fn independent_keys_are_delivered_independently() {
        let queue = WorkQueue::new();
        queue.enqueue(key("a"));
        queue.enqueue(key("b"));

        let (first, _) = queue.dequeue().await;
        let (second, _) = queue.dequeue().await;
        assert_ne!(first, second);
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_count_resets_after_terminal_done() {
        let queue = WorkQueue::new();
        queue.enqueue(key("a"));
        let (delivered, first) = queue.dequeue().await;
        assert_eq!(first, 1);
        queue.requeue(delivered.clone(), Duration::from_secs(1));
        queue.done(&delivered);

        let (_, second) = queue.dequeue().await;
        assert_eq!(second, 2);
        // Success this time: done with nothing pending drops the counter.
        queue.done(&delivered);

        queue.enqueue(key("a"));
        let (_, fresh) = queue.dequeue().await;
        assert_eq!(fresh, 1);
    }
}
