//! Controller configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for the dispatch engine.
///
/// All durations are plain [`Duration`]s; the poll interval may be changed
/// at runtime through the controller, which wakes the poller instead of
/// sending a queue message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Interval between status-poll sweeps.
    pub poll_interval: Duration,
    /// Polls a device may miss before it is flagged no-ack and discovery is
    /// re-triggered.
    pub missed_poll_threshold: u64,
    /// Discovery sweeps required before startup is considered complete.
    pub startup_discovery_rounds: u32,
    /// Transition duration for ON commands.
    pub duration_on: Duration,
    /// Transition duration for OFF commands.
    pub duration_off: Duration,
    /// Whether WHITE/COLOR commands power a device on when it is off.
    pub auto_power_on: bool,
    /// How long the dispatcher blocks on an empty queue before re-checking
    /// its shutdown flag.
    pub dequeue_timeout: Duration,
    /// Bound on waiting for the dispatcher to observe the stop sentinel.
    pub shutdown_timeout: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            poll_interval: Duration::from_secs(300),
            missed_poll_threshold: 2,
            startup_discovery_rounds: 3,
            duration_on: Duration::from_secs(1),
            duration_off: Duration::from_secs(1),
            auto_power_on: true,
            dequeue_timeout: Duration::from_millis(500),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(300));
        assert!(config.auto_power_on);
    }

    #[test]
    fn test_partial_deserialization_keeps_defaults() {
        let config: ControllerConfig =
            serde_json::from_str(r#"{"missed_poll_threshold": 5}"#).unwrap();
        assert_eq!(config.missed_poll_threshold, 5);
        assert_eq!(config.poll_interval, Duration::from_secs(300));
    }
}
