//! Named per-device one-shot timers.
//!
//! At most one pending timer per (device, name): starting a name that is
//! already pending aborts the previous instance, so rapid re-arms never
//! stack duplicate callbacks. Timers only ever re-enqueue commands; they
//! never touch the registry or the transport themselves.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::debug;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use uuid::Uuid;

use crate::command::{Command, Priority, QueuedCommand};
use crate::queue::CommandQueue;

/// Timer names. One pending instance of each per device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Status,
    WaveformOff,
}

/// Schedules follow-up commands for the dispatcher.
pub struct TimerManager {
    queue: Arc<CommandQueue>,
    timers: Mutex<HashMap<(Uuid, TimerKind), JoinHandle<()>>>,
}

impl TimerManager {
    pub fn new(queue: Arc<CommandQueue>) -> Self {
        TimerManager {
            queue,
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// Repeating status refresh: one high-priority STATUS per second for
    /// `seconds` seconds, approximating "poll until the just-issued
    /// transition has completed".
    pub fn start_status(&self, device: Uuid, seconds: u64) {
        if seconds == 0 {
            return;
        }
        debug!("arming STATUS timer for {device}: {seconds}s");
        let queue = Arc::clone(&self.queue);
        let handle = tokio::spawn(async move {
            for _ in 0..seconds {
                sleep(Duration::from_secs(1)).await;
                queue.push(QueuedCommand::with_priority(
                    Priority::HighStatus,
                    Some(device),
                    Command::Status,
                ));
            }
        });
        self.arm(device, TimerKind::Status, handle);
    }

    /// One-shot auto-off once a waveform effect has run its course.
    pub fn start_waveform_off(&self, device: Uuid, delay: Duration) {
        debug!("arming WAVEFORM_OFF timer for {device}: {delay:?}");
        let queue = Arc::clone(&self.queue);
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            queue.push(QueuedCommand::new(Some(device), Command::Off));
        });
        self.arm(device, TimerKind::WaveformOff, handle);
    }

    fn arm(&self, device: Uuid, kind: TimerKind, handle: JoinHandle<()>) {
        if let Some(old) = self.timers.lock().unwrap().insert((device, kind), handle) {
            old.abort();
        }
    }

    pub fn cancel(&self, device: Uuid, kind: TimerKind) {
        if let Some(handle) = self.timers.lock().unwrap().remove(&(device, kind)) {
            handle.abort();
        }
    }

    /// Abort everything outstanding; called during shutdown so nothing
    /// re-enqueues after the dispatcher has drained.
    pub fn cancel_all(&self) {
        let mut timers = self.timers.lock().unwrap();
        for (_, handle) in timers.drain() {
            handle.abort();
        }
    }

    /// Number of timers that have been armed and not yet completed.
    pub fn pending(&self) -> usize {
        self.timers
            .lock()
            .unwrap()
            .values()
            .filter(|h| !h.is_finished())
            .count()
    }
}
