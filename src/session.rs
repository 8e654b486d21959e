//! Per-device session state and published-state reconciliation.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::color;
use crate::products::Capabilities;
use crate::transport::{DeviceHandle, WifiInfo};
use crate::types::{Hsbk, PowerLevel};

/// Connection indicator published alongside the color state.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    /// No successful exchange yet.
    #[default]
    Unknown,
    Connected,
    /// A command or poll received no response within the expected time.
    NoAck,
    /// The device is administratively disabled.
    NotEnabled,
}

/// Color/power captured at the most recent transition into the "on" state.
///
/// Used to restore the prior appearance after brightness-to-zero sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastKnownGood {
    pub color: Hsbk,
    pub power: u16,
}

/// Human-scale state published to external observers.
///
/// All fields are overwritten atomically from the dispatcher task; nothing
/// else writes them.
#[serde_with::skip_serializing_none]
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    pub on: bool,
    /// 0-360, truncated.
    pub hue: u16,
    /// 0-100, truncated.
    pub saturation: u8,
    /// 0-100, truncated.
    pub brightness: u8,
    pub kelvin: u16,
    /// 0-100, truncated.
    pub power: u8,
    /// RGB channels scaled 0-100.
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    /// Single perceptual dim level, 0-100.
    pub brightness_level: u8,
    /// Infrared maximum level 0-100, only on night-vision bulbs.
    pub infrared: Option<u8>,
    pub status: SessionStatus,
    pub label: Option<String>,
}

/// One session per physical bulb, keyed by MAC.
///
/// The MAC is the stable identity; IP and port may change between discovery
/// rounds and are always re-resolved rather than assumed static.
#[derive(Debug, Clone)]
pub struct DeviceSession {
    pub id: Uuid,
    pub mac: String,
    pub addr: Option<SocketAddr>,
    pub label: Option<String>,
    pub enabled: bool,
    /// True only after a successful protocol exchange.
    pub connected: bool,
    /// Set when a command could not reach a device whose identity has no
    /// network location yet. Never true together with `connected`.
    pub no_ack: bool,
    /// Derived once from the product-id table; immutable afterwards.
    pub capabilities: Option<Capabilities>,
    pub product_name: Option<String>,
    pub firmware_version: Option<String>,
    pub wifi: Option<WifiInfo>,
    /// Raw infrared maximum, read on bulbs that support it.
    pub infrared: Option<u16>,
    /// Raw wire-format color, stored verbatim.
    pub color: Hsbk,
    /// Raw power, only ever 0 or 65535.
    pub power: u16,
    pub last_known_good: Option<LastKnownGood>,
    /// Polling generation at which this device last answered.
    pub last_response_poll: u64,
    state: DeviceState,
}

impl DeviceSession {
    pub fn new(mac: &str) -> Self {
        DeviceSession {
            id: Uuid::new_v4(),
            mac: mac.to_string(),
            addr: None,
            label: None,
            enabled: true,
            connected: false,
            no_ack: false,
            capabilities: None,
            product_name: None,
            firmware_version: None,
            wifi: None,
            infrared: None,
            color: Hsbk::default(),
            power: 0,
            last_known_good: None,
            last_response_poll: 0,
            state: DeviceState::default(),
        }
    }

    /// Transport handle, available once discovery has mapped the MAC.
    pub fn handle(&self) -> Option<DeviceHandle> {
        self.addr.map(|addr| DeviceHandle {
            mac: self.mac.clone(),
            addr,
        })
    }

    pub fn is_on(&self) -> bool {
        self.power > 0
    }

    /// Published snapshot for external observers.
    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn supports_color(&self) -> bool {
        self.capabilities.is_some_and(|c| c.supports_color)
    }

    pub fn supports_infrared(&self) -> bool {
        self.capabilities.is_some_and(|c| c.supports_infrared)
    }

    /// Sole writer of derived/published state from a wire-format read.
    ///
    /// Stores the raw HSBK verbatim, snapshots it as last-known-good on any
    /// "on" reading, derives the truncated human-scale fields and marks the
    /// device connected. Applying the same reading twice yields identical
    /// published state.
    pub fn update_status_from_msg(&mut self, power_raw: u16, hsbk: Hsbk) {
        let power = PowerLevel::from_raw(power_raw);
        self.color = hsbk;
        self.power = power.raw();
        if power.is_on() {
            self.last_known_good = Some(LastKnownGood {
                color: hsbk,
                power: power.raw(),
            });
        }

        let hue = color::raw_to_degrees(hsbk.hue);
        let saturation = color::raw_to_percent(hsbk.saturation);
        let brightness = color::raw_to_percent(hsbk.brightness);
        let power_pct = color::raw_to_percent(self.power);
        let (red, green, blue) = color::hsv_to_rgb(hue, saturation, brightness);
        let brightness_level =
            color::brightness_level(saturation, brightness, power_pct, hsbk.is_colored());

        self.state = DeviceState {
            on: power.is_on(),
            hue,
            saturation,
            brightness,
            kelvin: hsbk.kelvin,
            power: power_pct,
            red,
            green,
            blue,
            brightness_level,
            infrared: self.infrared.map(color::raw_to_percent),
            status: SessionStatus::Connected,
            label: self.label.clone(),
        };
        self.connected = true;
        self.no_ack = false;
    }

    /// A transport exchange failed: transition to disconnected and publish
    /// the no-ack indicator. Idempotent.
    pub fn communication_lost(&mut self) {
        self.connected = false;
        self.state.status = SessionStatus::NoAck;
    }

    /// The device's identity has no network location, or it stopped
    /// answering polls.
    pub fn mark_no_ack(&mut self) {
        self.connected = false;
        self.no_ack = true;
        self.state.status = SessionStatus::NoAck;
    }

    /// Discovery re-observed a previously disconnected device.
    pub fn mark_reconnected(&mut self) {
        self.connected = true;
        self.no_ack = false;
        self.state.status = SessionStatus::Connected;
    }

    /// Publish the neutral state for a disabled device.
    pub fn publish_not_enabled(&mut self) {
        self.state.status = SessionStatus::NotEnabled;
    }

    /// Apply the product-id lookup. Capabilities are immutable after the
    /// first successful version query; later lookups only refresh the name.
    pub fn apply_product(&mut self, product_id: u32) {
        if self.capabilities.is_none() {
            self.capabilities = Some(
                crate::products::product_info(product_id)
                    .map(|p| p.capabilities)
                    .unwrap_or_default(),
            );
        }
        self.product_name = Some(crate::products::product_name(product_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colored(hue: u16, sat: u16, bri: u16) -> Hsbk {
        Hsbk {
            hue,
            saturation: sat,
            brightness: bri,
            kelvin: 3500,
        }
    }

    #[test]
    fn test_update_status_is_idempotent() {
        let mut session = DeviceSession::new("d0:73:d5:00:00:01");
        session.update_status_from_msg(65535, colored(32768, 65535, 52428));
        let first = session.state().clone();
        session.update_status_from_msg(65535, colored(32768, 65535, 52428));
        assert_eq!(session.state(), &first);
        assert!(session.connected);
        assert!(!session.no_ack);
    }

    #[test]
    fn test_snapshot_taken_on_on_transition_only() {
        let mut session = DeviceSession::new("d0:73:d5:00:00:01");
        session.update_status_from_msg(0, colored(100, 200, 300));
        assert!(session.last_known_good.is_none());

        let on_color = colored(1000, 2000, 3000);
        session.update_status_from_msg(65535, on_color);
        let snapshot = session.last_known_good.unwrap();
        assert_eq!(snapshot.color, on_color);
        assert_eq!(snapshot.power, 65535);

        // A later off reading keeps the snapshot.
        session.update_status_from_msg(0, colored(0, 0, 0));
        assert_eq!(session.last_known_good.unwrap().color, on_color);
    }

    #[test]
    fn test_published_fields_truncate() {
        let mut session = DeviceSession::new("d0:73:d5:00:00:01");
        session.update_status_from_msg(65535, colored(32768, 65535, 39321));
        let state = session.state();
        assert_eq!(state.hue, 180);
        assert_eq!(state.saturation, 100);
        assert_eq!(state.brightness, 59);
        assert_eq!(state.power, 100);
        assert_eq!(state.kelvin, 3500);
        assert!(state.on);
    }

    #[test]
    fn test_brightness_level_zero_when_off() {
        let mut session = DeviceSession::new("d0:73:d5:00:00:01");
        session.update_status_from_msg(0, colored(0, 0, 65535));
        assert_eq!(session.state().brightness_level, 0);
        assert!(!session.state().on);
    }

    #[test]
    fn test_white_brightness_level_is_direct() {
        let mut session = DeviceSession::new("d0:73:d5:00:00:01");
        session.update_status_from_msg(65535, Hsbk::white(39321, 3500));
        // White devices publish brightness scaled by power only.
        assert_eq!(session.state().brightness_level, 59);
    }

    #[test]
    fn test_communication_lost_is_idempotent() {
        let mut session = DeviceSession::new("d0:73:d5:00:00:01");
        session.update_status_from_msg(65535, colored(0, 0, 65535));
        assert!(session.connected);

        session.communication_lost();
        let after_first = (session.connected, session.state().status);
        session.communication_lost();
        assert_eq!((session.connected, session.state().status), after_first);
        assert_eq!(session.state().status, SessionStatus::NoAck);
    }

    #[test]
    fn test_no_ack_and_connected_never_both() {
        let mut session = DeviceSession::new("d0:73:d5:00:00:01");
        session.mark_no_ack();
        assert!(session.no_ack && !session.connected);

        session.update_status_from_msg(65535, colored(0, 0, 1));
        assert!(session.connected && !session.no_ack);
    }

    #[test]
    fn test_capabilities_immutable_after_first_lookup() {
        let mut session = DeviceSession::new("d0:73:d5:00:00:01");
        session.apply_product(29);
        assert!(session.supports_infrared());

        session.apply_product(51);
        // Name refreshes, capabilities stay.
        assert!(session.supports_infrared());
        assert_eq!(session.product_name.as_deref(), Some("LIFX Mini White"));
    }
}
