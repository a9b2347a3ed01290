//! Download queue.
//!
//! A pure state machine over pending download tasks. No locking and no
//! I/O; the orchestrator owns it and performs side effects.
//!
//! # Semantics
//!
//! - FIFO by enqueue sequence
//! - Enqueueing an id that is already waiting is a no-op and keeps its place
//! - Removing an id that is not waiting is a no-op
//! - Unbounded; the catalog's leaf count is the natural limit
//! - Positions are 1-based among waiting tasks (the active transfer is not
//!   in the queue)

mod types;

use std::collections::VecDeque;
use std::time::Instant;

use mapfetch_core::NodeId;

pub use types::{DownloadTask, EnqueueResult, EnqueuedAt, QueueEntry};

/// Ordered sequence of pending per-node downloads.
#[derive(Debug, Default)]
pub struct DownloadQueue {
    pending: VecDeque<DownloadTask>,
    next_seq: u64,
}

impl DownloadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a task for `id` unless one is already waiting.
    pub fn enqueue(&mut self, id: NodeId) -> EnqueueResult {
        self.enqueue_attempt(id, 0)
    }

    /// Append a task carrying the node's retry counter.
    pub fn enqueue_attempt(&mut self, id: NodeId, attempt: u32) -> EnqueueResult {
        if let Some(position) = self.position(&id) {
            return EnqueueResult::AlreadyQueued { position };
        }

        let enqueued_at = self.next_stamp();
        self.pending.push_back(DownloadTask {
            node_id: id,
            enqueued_at,
            attempt,
        });
        EnqueueResult::Added {
            position: self.pending.len(),
        }
    }

    /// Pop the head of the queue.
    pub fn dequeue(&mut self) -> Option<DownloadTask> {
        self.pending.pop_front()
    }

    /// Put a task back at the head, keeping its original stamp.
    ///
    /// Used when the active transfer is paused or suspended so it resumes
    /// before anything enqueued after it. A task for an id that is already
    /// waiting is dropped.
    pub fn push_front(&mut self, task: DownloadTask) {
        if self.contains(&task.node_id) {
            return;
        }
        self.pending.push_front(task);
    }

    /// Drop the waiting task for `id`. Returns whether one was removed.
    pub fn remove(&mut self, id: &NodeId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|task| &task.node_id != id);
        self.pending.len() < before
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.pending.iter().any(|task| &task.node_id == id)
    }

    /// 1-based position of the waiting task for `id`.
    pub fn position(&self, id: &NodeId) -> Option<usize> {
        self.pending
            .iter()
            .position(|task| &task.node_id == id)
            .map(|idx| idx + 1)
    }

    /// Waiting ids in order.
    pub fn ids(&self) -> Vec<NodeId> {
        self.pending.iter().map(|task| task.node_id.clone()).collect()
    }

    /// Serializable view of the queue.
    pub fn snapshot(&self) -> Vec<QueueEntry> {
        self.pending
            .iter()
            .enumerate()
            .map(|(idx, task)| QueueEntry {
                id: task.node_id.clone(),
                position: idx + 1,
                attempt: task.attempt,
            })
            .collect()
    }

    fn next_stamp(&mut self) -> EnqueuedAt {
        let seq = self.next_seq;
        self.next_seq += 1;
        EnqueuedAt {
            seq,
            at: Instant::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(code: &str) -> NodeId {
        NodeId::new(code)
    }

    #[test]
    fn test_enqueue_positions() {
        let mut queue = DownloadQueue::new();
        assert_eq!(queue.enqueue(id("FR")), EnqueueResult::Added { position: 1 });
        assert_eq!(queue.enqueue(id("DE")), EnqueueResult::Added { position: 2 });
        assert_eq!(queue.len(), 2);
        assert!(queue.contains(&id("DE")));
    }

    #[test]
    fn test_enqueue_is_idempotent() {
        let mut queue = DownloadQueue::new();
        queue.enqueue(id("FR"));
        queue.enqueue(id("DE"));
        let before = queue.ids();

        assert_eq!(
            queue.enqueue(id("FR")),
            EnqueueResult::AlreadyQueued { position: 1 }
        );
        assert_eq!(queue.ids(), before);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_dequeue_fifo() {
        let mut queue = DownloadQueue::new();
        queue.enqueue(id("FR"));
        queue.enqueue(id("DE"));

        let first = queue.dequeue().unwrap();
        let second = queue.dequeue().unwrap();
        assert_eq!(first.node_id, id("FR"));
        assert_eq!(second.node_id, id("DE"));
        assert!(first.enqueued_at < second.enqueued_at);
        assert!(queue.dequeue().is_none());
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut queue = DownloadQueue::new();
        queue.enqueue(id("FR"));
        assert!(!queue.remove(&id("DE")));
        assert!(queue.remove(&id("FR")));
        assert!(!queue.remove(&id("FR")));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_push_front_keeps_relative_order() {
        let mut queue = DownloadQueue::new();
        queue.enqueue(id("FR"));
        queue.enqueue(id("DE"));
        let head = queue.dequeue().unwrap();
        queue.enqueue(id("IT"));

        queue.push_front(head);
        assert_eq!(queue.ids(), vec![id("FR"), id("DE"), id("IT")]);
    }

    #[test]
    fn test_push_front_ignores_duplicate() {
        let mut queue = DownloadQueue::new();
        queue.enqueue(id("FR"));
        let stale = queue.dequeue().unwrap();
        queue.enqueue(id("DE"));
        queue.enqueue(id("FR"));

        queue.push_front(stale);
        assert_eq!(queue.ids(), vec![id("DE"), id("FR")]);
    }

    #[test]
    fn test_attempt_carried_into_snapshot() {
        let mut queue = DownloadQueue::new();
        queue.enqueue(id("FR"));
        queue.enqueue_attempt(id("DE"), 2);

        let snapshot = queue.snapshot();
        assert_eq!(snapshot[1].id, id("DE"));
        assert_eq!(snapshot[1].position, 2);
        assert_eq!(snapshot[1].attempt, 2);
    }

    #[test]
    fn test_waited_grows_while_queued() {
        let mut queue = DownloadQueue::new();
        queue.enqueue(id("FR"));
        std::thread::sleep(std::time::Duration::from_millis(5));

        let task = queue.dequeue().unwrap();
        assert!(task.waited() >= std::time::Duration::from_millis(5));
    }
}
