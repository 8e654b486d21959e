//! Discovery reconciliation: mapping scanned LAN identities onto registry
//! sessions.

use log::{debug, info};
use uuid::Uuid;

use crate::command::{Command, Priority, QueuedCommand};
use crate::queue::CommandQueue;
use crate::registry::DeviceRegistry;
use crate::transport::DiscoveredDevice;

/// What a reconcile pass did, for logging and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryStats {
    pub created: usize,
    pub reconnected: usize,
    pub refreshed: usize,
}

/// Enqueue the metadata refresh cascade for a device: version, firmware and
/// wifi info, all at the lowest band so they never displace user commands.
pub(crate) fn enqueue_refresh_cascade(queue: &CommandQueue, device: Uuid) {
    for command in [
        Command::RefreshVersion,
        Command::RefreshFirmware,
        Command::RefreshWifi,
    ] {
        queue.push(QueuedCommand::new(Some(device), command));
    }
}

/// Reconcile one discovery sweep against the registry.
///
/// New MACs get a session and a full status+metadata refresh. Known but
/// disconnected devices are marked reconnected with the same cascade,
/// enqueued exactly once per sweep. Known connected devices only have their
/// network location refreshed: devices change address between rounds while
/// keeping the same MAC, so resolution is always by MAC.
pub(crate) fn reconcile(
    registry: &DeviceRegistry,
    queue: &CommandQueue,
    devices: &[DiscoveredDevice],
) -> DiscoveryStats {
    let mut stats = DiscoveryStats::default();

    for found in devices {
        let known = registry.contains_mac(&found.mac);
        if !known {
            let id = registry.register(&found.mac);
            registry.with_session(id, |session| {
                session.addr = Some(found.addr);
                if session.label.is_none() {
                    session.label.clone_from(&found.label);
                }
                session.mark_reconnected();
            });
            info!("discovered new device {} at {}", found.mac, found.addr);
            queue.push(QueuedCommand::with_priority(
                Priority::HighStatus,
                Some(id),
                Command::Status,
            ));
            enqueue_refresh_cascade(queue, id);
            stats.created += 1;
            continue;
        }

        let (id, was_disconnected) = match registry.with_session_by_mac(&found.mac, |session| {
            let was_disconnected = !session.connected;
            session.addr = Some(found.addr);
            if session.label.is_none() {
                session.label.clone_from(&found.label);
            }
            if was_disconnected {
                session.mark_reconnected();
            }
            (session.id, was_disconnected)
        }) {
            Some(result) => result,
            None => continue,
        };

        if was_disconnected {
            info!("device {} reconnected at {}", found.mac, found.addr);
            queue.push(QueuedCommand::with_priority(
                Priority::HighStatus,
                Some(id),
                Command::Status,
            ));
            enqueue_refresh_cascade(queue, id);
            stats.reconnected += 1;
        } else {
            debug!("device {} refreshed at {}", found.mac, found.addr);
            stats.refreshed += 1;
        }
    }

    let round = registry.record_discovery_round();
    debug!("discovery round {round} complete: {stats:?}");
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::time::Duration;

    fn found(mac: &str, addr: &str) -> DiscoveredDevice {
        DiscoveredDevice {
            mac: mac.to_string(),
            addr: addr.parse::<SocketAddr>().unwrap(),
            label: Some("Kitchen".to_string()),
        }
    }

    async fn drain(queue: &CommandQueue) -> Vec<Command> {
        let mut commands = Vec::new();
        while let Some(entry) = queue.pop(Duration::from_millis(1)).await {
            commands.push(entry.command);
        }
        commands
    }

    #[tokio::test]
    async fn test_new_mac_creates_session_and_cascades() {
        let registry = DeviceRegistry::new();
        let queue = CommandQueue::new();

        let stats = reconcile(
            &registry,
            &queue,
            &[found("d0:73:d5:00:00:01", "10.0.0.5:56700")],
        );

        assert_eq!(stats.created, 1);
        assert!(registry.contains_mac("d0:73:d5:00:00:01"));
        let commands = drain(&queue).await;
        assert_eq!(
            commands,
            vec![
                Command::Status,
                Command::RefreshVersion,
                Command::RefreshFirmware,
                Command::RefreshWifi,
            ]
        );
    }

    #[tokio::test]
    async fn test_disconnected_device_reconnects_with_single_cascade() {
        let registry = DeviceRegistry::new();
        let queue = CommandQueue::new();
        let id = registry.register("d0:73:d5:00:00:02");
        registry.with_session(id, |s| s.communication_lost());

        let stats = reconcile(
            &registry,
            &queue,
            &[found("d0:73:d5:00:00:02", "10.0.0.6:56700")],
        );

        assert_eq!(stats.reconnected, 1);
        let connected = registry.with_session(id, |s| s.connected).unwrap();
        assert!(connected);

        let commands = drain(&queue).await;
        let version_refreshes = commands
            .iter()
            .filter(|c| **c == Command::RefreshVersion)
            .count();
        assert_eq!(version_refreshes, 1);
        assert_eq!(commands.len(), 4);
    }

    #[tokio::test]
    async fn test_connected_device_only_refreshes_address() {
        let registry = DeviceRegistry::new();
        let queue = CommandQueue::new();
        let id = registry.register("d0:73:d5:00:00:03");
        registry.with_session(id, |s| {
            s.addr = Some("10.0.0.7:56700".parse().unwrap());
            s.mark_reconnected();
        });

        // Same MAC shows up on a new address.
        let stats = reconcile(
            &registry,
            &queue,
            &[found("d0:73:d5:00:00:03", "10.0.0.99:56700")],
        );

        assert_eq!(stats.refreshed, 1);
        assert!(queue.is_empty());
        let addr = registry.with_session(id, |s| s.addr).unwrap();
        assert_eq!(addr, Some("10.0.0.99:56700".parse().unwrap()));
    }

    #[tokio::test]
    async fn test_rounds_are_counted() {
        let registry = DeviceRegistry::new();
        let queue = CommandQueue::new();
        reconcile(&registry, &queue, &[]);
        reconcile(&registry, &queue, &[]);
        assert_eq!(registry.discovery_rounds(), 2);
    }
}
