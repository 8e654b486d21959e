//! Multi-producer, single-consumer priority command queue.
//!
//! Ordering is strict: lower priority band first, insertion order within a
//! band. The single dispatcher consumer blocks on [`CommandQueue::pop`] with
//! a timeout so it can re-check shutdown and config flags while idle.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use log::trace;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::command::QueuedCommand;

struct Entry {
    seq: u64,
    item: QueuedCommand,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.item.priority == other.item.priority && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // BinaryHeap is a max-heap; invert so the lowest (band, seq) pops
        // first. The sequence stamp makes equal bands FIFO.
        (other.item.priority, other.seq).cmp(&(self.item.priority, self.seq))
    }
}

/// The shared work queue feeding the dispatcher.
pub struct CommandQueue {
    heap: Mutex<BinaryHeap<Entry>>,
    seq: AtomicU64,
    notify: Notify,
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandQueue {
    pub fn new() -> Self {
        CommandQueue {
            heap: Mutex::new(BinaryHeap::new()),
            seq: AtomicU64::new(0),
            notify: Notify::new(),
        }
    }

    /// Enqueue an entry. Callable from any task.
    pub fn push(&self, item: QueuedCommand) {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        trace!(
            "enqueue {} band={:?} device={:?}",
            item.command.name(),
            item.priority,
            item.device
        );
        self.heap.lock().unwrap().push(Entry { seq, item });
        self.notify.notify_one();
    }

    /// Dequeue the most urgent entry, waiting at most `wait`.
    ///
    /// Returns `None` when nothing arrived within the window; the caller is
    /// expected to re-check its shutdown flag and come back.
    pub async fn pop(&self, wait: Duration) -> Option<QueuedCommand> {
        let deadline = Instant::now() + wait;
        loop {
            if let Some(entry) = self.heap.lock().unwrap().pop() {
                return Some(entry.item);
            }
            let notified = self.notify.notified();
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                // Window elapsed; one last check to avoid dropping an entry
                // that raced the timeout.
                return self.heap.lock().unwrap().pop().map(|e| e.item);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.heap.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.lock().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, Priority};

    fn entry(priority: Priority, command: Command) -> QueuedCommand {
        QueuedCommand::with_priority(priority, None, command)
    }

    #[tokio::test]
    async fn test_priority_order_with_fifo_tie_break() {
        let queue = CommandQueue::new();
        queue.push(entry(Priority::Polling, Command::Status));
        queue.push(entry(Priority::HighCommand, Command::On));
        queue.push(entry(Priority::Polling, Command::RefreshWifi));
        queue.push(entry(Priority::HighCommand, Command::Off));

        let wait = Duration::from_millis(10);
        assert_eq!(queue.pop(wait).await.unwrap().command, Command::On);
        assert_eq!(queue.pop(wait).await.unwrap().command, Command::Off);
        assert_eq!(queue.pop(wait).await.unwrap().command, Command::Status);
        assert_eq!(queue.pop(wait).await.unwrap().command, Command::RefreshWifi);
        assert!(queue.pop(wait).await.is_none());
    }

    #[tokio::test]
    async fn test_stop_sentinel_preempts_all_queued_work() {
        let queue = CommandQueue::new();
        for _ in 0..100 {
            queue.push(QueuedCommand::new(None, Command::Discovery { initial: true }));
        }
        queue.push(QueuedCommand::new(None, Command::StopThread));

        let first = queue.pop(Duration::from_millis(10)).await.unwrap();
        assert_eq!(first.command, Command::StopThread);
    }

    #[tokio::test]
    async fn test_pop_wakes_on_late_push() {
        let queue = std::sync::Arc::new(CommandQueue::new());
        let producer = std::sync::Arc::clone(&queue);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            producer.push(QueuedCommand::new(None, Command::StopThread));
        });

        let popped = queue.pop(Duration::from_secs(5)).await;
        assert_eq!(popped.unwrap().command, Command::StopThread);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_pop_times_out_when_idle() {
        let queue = CommandQueue::new();
        assert!(queue.pop(Duration::from_millis(5)).await.is_none());
        assert!(queue.is_empty());
    }
}
