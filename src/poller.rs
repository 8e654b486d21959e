//! Periodic status-poll producer.
//!
//! The poller never inspects responses and never performs transport I/O: it
//! bumps the polling generation, enqueues a STATUS sweep for enabled
//! devices, flags devices that have missed too many polls and re-triggers
//! discovery. Reconfiguration and shutdown arrive through a wake signal
//! rather than queue messages.

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info};
use tokio::sync::Notify;
use tokio::time::sleep;

use crate::command::{Command, Priority, QueuedCommand};
use crate::config::ControllerConfig;
use crate::queue::CommandQueue;
use crate::registry::DeviceRegistry;

pub(crate) struct Poller {
    queue: Arc<CommandQueue>,
    registry: Arc<DeviceRegistry>,
    config: Arc<Mutex<ControllerConfig>>,
    running: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl Poller {
    pub(crate) fn new(
        queue: Arc<CommandQueue>,
        registry: Arc<DeviceRegistry>,
        config: Arc<Mutex<ControllerConfig>>,
        running: Arc<AtomicBool>,
        wake: Arc<Notify>,
    ) -> Self {
        Poller {
            queue,
            registry,
            config,
            running,
            wake,
        }
    }

    pub(crate) async fn run(self) {
        info!("poller started");
        loop {
            let interval = self.config.lock().unwrap().poll_interval;
            tokio::select! {
                () = sleep(interval) => {}
                () = self.wake.notified() => {
                    // Reconfigured or shutting down; re-read state.
                    if !self.running.load(Ordering::SeqCst) {
                        break;
                    }
                    continue;
                }
            }
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            self.tick();
        }
        info!("poller stopped");
    }

    fn tick(&self) {
        let config = self.config.lock().unwrap().clone();
        let generation = self.registry.next_poll_generation();
        debug!("poll sweep, generation {generation}");

        // Keep discovering until the startup round count is met.
        if self.registry.discovery_rounds() < config.startup_discovery_rounds {
            self.queue
                .push(QueuedCommand::new(None, Command::Discovery { initial: true }));
        }

        let mut stale_found = false;
        self.registry.for_each(|session| {
            if !session.enabled || session.addr.is_none() {
                return;
            }
            if session.connected
                && generation.saturating_sub(session.last_response_poll)
                    > config.missed_poll_threshold
            {
                debug!("device {} missed too many polls", session.mac);
                session.mark_no_ack();
                stale_found = true;
            }
            self.queue.push(QueuedCommand::with_priority(
                Priority::Polling,
                Some(session.id),
                Command::Status,
            ));
        });

        if stale_found {
            self.queue
                .push(QueuedCommand::new(None, Command::Discovery { initial: false }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct Rig {
        queue: Arc<CommandQueue>,
        registry: Arc<DeviceRegistry>,
        running: Arc<AtomicBool>,
        wake: Arc<Notify>,
        config: Arc<Mutex<ControllerConfig>>,
    }

    fn rig(poll_interval: Duration) -> (Poller, Rig) {
        let queue = Arc::new(CommandQueue::new());
        let registry = Arc::new(DeviceRegistry::new());
        let config = Arc::new(Mutex::new(ControllerConfig {
            poll_interval,
            startup_discovery_rounds: 0,
            ..ControllerConfig::default()
        }));
        let running = Arc::new(AtomicBool::new(true));
        let wake = Arc::new(Notify::new());
        let poller = Poller::new(
            Arc::clone(&queue),
            Arc::clone(&registry),
            Arc::clone(&config),
            Arc::clone(&running),
            Arc::clone(&wake),
        );
        (
            poller,
            Rig {
                queue,
                registry,
                running,
                wake,
                config,
            },
        )
    }

    fn resolved_device(registry: &DeviceRegistry, mac: &str) -> uuid::Uuid {
        let id = registry.register(mac);
        registry.with_session(id, |s| {
            s.addr = Some("10.0.0.20:56700".parse().unwrap());
        });
        id
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_enqueues_status_for_enabled_resolved_devices() {
        let (poller, rig) = rig(Duration::from_secs(10));
        resolved_device(&rig.registry, "d0:73:d5:00:00:01");
        let disabled = resolved_device(&rig.registry, "d0:73:d5:00:00:02");
        rig.registry.set_enabled(disabled, false);
        rig.registry.register("d0:73:d5:00:00:03"); // unresolved

        let handle = tokio::spawn(poller.run());
        sleep(Duration::from_secs(15)).await;

        let mut statuses = 0;
        while let Some(entry) = rig.queue.pop(Duration::from_millis(1)).await {
            assert_eq!(entry.priority, Priority::Polling);
            assert_eq!(entry.command, Command::Status);
            statuses += 1;
        }
        assert_eq!(statuses, 1);

        rig.running.store(false, Ordering::SeqCst);
        rig.wake.notify_one();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_missed_polls_flag_no_ack_and_retrigger_discovery() {
        let (poller, rig) = rig(Duration::from_secs(10));
        let id = resolved_device(&rig.registry, "d0:73:d5:00:00:04");
        rig.registry.with_session(id, |s| {
            s.mark_reconnected();
            s.last_response_poll = 0;
        });

        let handle = tokio::spawn(poller.run());
        // Default threshold is 2: the third generation flags the device.
        sleep(Duration::from_secs(35)).await;

        rig.running.store(false, Ordering::SeqCst);
        rig.wake.notify_one();
        handle.await.unwrap();

        let (connected, no_ack) = rig
            .registry
            .with_session(id, |s| (s.connected, s.no_ack))
            .unwrap();
        assert!(!connected);
        assert!(no_ack);

        let mut discoveries = 0;
        while let Some(entry) = rig.queue.pop(Duration::from_millis(1)).await {
            if entry.command == (Command::Discovery { initial: false }) {
                discoveries += 1;
            }
        }
        assert_eq!(discoveries, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_discovery_rounds_are_enqueued() {
        let (poller, rig) = rig(Duration::from_secs(10));
        rig.config.lock().unwrap().startup_discovery_rounds = 3;

        let handle = tokio::spawn(poller.run());
        sleep(Duration::from_secs(15)).await;
        rig.running.store(false, Ordering::SeqCst);
        rig.wake.notify_one();
        handle.await.unwrap();

        let entry = rig.queue.pop(Duration::from_millis(1)).await.unwrap();
        assert_eq!(entry.command, Command::Discovery { initial: true });
        assert_eq!(entry.priority, Priority::InitDiscovery);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wake_reloads_interval_without_ticking() {
        let (poller, rig) = rig(Duration::from_secs(3600));
        resolved_device(&rig.registry, "d0:73:d5:00:00:05");

        let handle = tokio::spawn(poller.run());
        sleep(Duration::from_secs(1)).await;

        // Shrink the interval and wake; the next tick happens on the new
        // cadence.
        rig.config.lock().unwrap().poll_interval = Duration::from_secs(5);
        rig.wake.notify_one();
        sleep(Duration::from_secs(10)).await;
        assert!(!rig.queue.is_empty());

        rig.running.store(false, Ordering::SeqCst);
        rig.wake.notify_one();
        handle.await.unwrap();
    }
}
