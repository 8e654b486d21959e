//! Transport adapter contract.
//!
//! The wire-level LAN protocol (binary packet encoding, UDP sockets,
//! per-exchange timeouts) lives behind this trait. The engine only sees
//! synchronous request/response semantics: every call either completes or
//! fails, and no call guarantees delivery.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::types::{Hsbk, WaveformShape};

type Result<T> = std::result::Result<T, Error>;

/// Network location of a device, re-resolved by MAC on every discovery pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceHandle {
    pub mac: String,
    pub addr: SocketAddr,
}

/// One device observed during a discovery sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    pub mac: String,
    pub addr: SocketAddr,
    pub label: Option<String>,
}

/// Wifi diagnostics reported by a bulb.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WifiInfo {
    pub signal: f32,
    pub tx: u32,
    pub rx: u32,
}

/// Raw protocol send/receive primitives per device.
///
/// Futures are `Send` so the dispatcher loop can run on a spawned task.
pub trait Transport: Send + Sync {
    /// Network-wide device scan.
    fn discover(&self) -> impl Future<Output = Result<Vec<DiscoveredDevice>>> + Send;

    /// Read current power and HSBK.
    fn get_color(&self, handle: &DeviceHandle) -> impl Future<Output = Result<(u16, Hsbk)>> + Send;

    /// Write HSBK with a transition duration. `rapid` marks fire-and-forget
    /// updates that may coalesce with identical in-flight writes.
    fn set_color(
        &self,
        handle: &DeviceHandle,
        color: Hsbk,
        duration: Duration,
        rapid: bool,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Write the power level (0 or 65535) with a transition duration.
    fn set_power(
        &self,
        handle: &DeviceHandle,
        level: u16,
        duration: Duration,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Start a waveform effect.
    #[allow(clippy::too_many_arguments)]
    fn set_waveform(
        &self,
        handle: &DeviceHandle,
        transient: bool,
        color: Hsbk,
        period: Duration,
        cycles: f32,
        duty_cycle: f32,
        shape: WaveformShape,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Set infrared maximum brightness (raw 0-65535).
    fn set_infrared(
        &self,
        handle: &DeviceHandle,
        level: u16,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Read infrared maximum brightness.
    fn get_infrared(&self, handle: &DeviceHandle) -> impl Future<Output = Result<u16>> + Send;

    /// Push a display name to the device.
    fn set_label(
        &self,
        handle: &DeviceHandle,
        label: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Read the product id for the capability lookup.
    fn get_product_id(&self, handle: &DeviceHandle) -> impl Future<Output = Result<u32>> + Send;

    /// Read the firmware version string.
    fn get_firmware_version(
        &self,
        handle: &DeviceHandle,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Read wifi diagnostics.
    fn get_wifi_info(
        &self,
        handle: &DeviceHandle,
    ) -> impl Future<Output = Result<WifiInfo>> + Send;
}
