//! Device commands and queue priority bands.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::WaveformShape;

/// Queue priority bands, most urgent first. Lower values dequeue earlier.
///
/// The relative order is load-bearing: the stop sentinel must preempt all
/// queued work, startup discovery must run before user commands, and status
/// refreshes must never starve effects or user actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    ThreadStop = 0,
    InitDiscovery = 1,
    WaveformEffect = 2,
    HighCommand = 3,
    MediumCommand = 4,
    HighStatus = 5,
    MediumStatus = 6,
    Discovery = 7,
    Polling = 8,
    Low = 9,
}

impl Priority {
    pub fn value(self) -> u8 {
        self as u8
    }
}

/// Color mode selector for [`Command::Standard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorMode {
    /// Apply hue/saturation; kelvin is carried through unchanged.
    Color,
    /// Force saturation to zero and apply kelvin.
    White,
}

/// One fully-typed unit of work for the dispatcher.
///
/// Every variant carries exactly the fields its handler needs; there are no
/// positional parameter lists. `None` fields in [`Command::Standard`] and
/// [`Command::Waveform`] mean "leave the device's current value unchanged".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Power on with the configured transition duration.
    On,
    /// Power off with the configured transition duration.
    Off,
    /// Power on with zero transition.
    ImmediateOn,
    /// Perceptual brightness target, 0-100%.
    Brightness { percent: u8 },
    /// Relative perceptual dim, coalesced at the transport layer.
    Dim { percent: u8 },
    /// Relative perceptual brighten, coalesced at the transport layer.
    Brighten { percent: u8 },
    /// White level and temperature; saturation forced to zero.
    White { percent: u8, kelvin: u16 },
    /// Direct color set, 0-100% hue (of 360) handled by the caller; raw here.
    Color { hue: u16, saturation: u16, brightness: u16 },
    /// Field-wise overlay write: read current HSBK, overlay the `Some`
    /// fields, write back.
    Standard {
        turn_on_if_off: bool,
        mode: ColorMode,
        hue: Option<u16>,
        saturation: Option<u16>,
        brightness: Option<u16>,
        kelvin: Option<u16>,
        duration: Option<Duration>,
    },
    /// Timed color-oscillation effect.
    Waveform {
        transient: bool,
        hue: Option<u16>,
        saturation: Option<u16>,
        brightness: Option<u16>,
        kelvin: Option<u16>,
        period: Duration,
        cycles: f32,
        duty_cycle: f32,
        shape: WaveformShape,
    },
    /// Read power + HSBK and reconcile the session.
    Status,
    /// Push the display name to the physical device.
    SetLabel { label: String },
    InfraredOn,
    InfraredOff,
    InfraredSet { percent: u8 },
    /// Metadata refreshes cascaded after a reconnect.
    RefreshVersion,
    RefreshFirmware,
    RefreshWifi,
    /// Run a discovery sweep from within the dispatcher.
    Discovery { initial: bool },
    /// Shutdown sentinel; drains the dispatcher immediately.
    StopThread,
}

impl Command {
    /// Default priority band for this command kind.
    pub fn priority(&self) -> Priority {
        match self {
            Command::StopThread => Priority::ThreadStop,
            Command::Discovery { initial: true } => Priority::InitDiscovery,
            Command::Discovery { initial: false } => Priority::Discovery,
            Command::Waveform { .. } => Priority::WaveformEffect,
            Command::On
            | Command::Off
            | Command::ImmediateOn
            | Command::Color { .. }
            | Command::White { .. }
            | Command::Standard { .. } => Priority::HighCommand,
            Command::Brightness { .. }
            | Command::Dim { .. }
            | Command::Brighten { .. }
            | Command::SetLabel { .. }
            | Command::InfraredOn
            | Command::InfraredOff
            | Command::InfraredSet { .. } => Priority::MediumCommand,
            Command::Status => Priority::MediumStatus,
            Command::RefreshVersion | Command::RefreshFirmware | Command::RefreshWifi => {
                Priority::Low
            }
        }
    }

    /// Whether this command addresses a single device (and therefore needs
    /// the enabled/resolved checks before any transport attempt).
    pub fn is_device_scoped(&self) -> bool {
        !matches!(self, Command::Discovery { .. } | Command::StopThread)
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::On => "ON",
            Command::Off => "OFF",
            Command::ImmediateOn => "IMMEDIATE-ON",
            Command::Brightness { .. } => "BRIGHTNESS",
            Command::Dim { .. } => "DIM",
            Command::Brighten { .. } => "BRIGHTEN",
            Command::White { .. } => "WHITE",
            Command::Color { .. } => "COLOR",
            Command::Standard { .. } => "STANDARD",
            Command::Waveform { .. } => "WAVEFORM",
            Command::Status => "STATUS",
            Command::SetLabel { .. } => "SETLABEL",
            Command::InfraredOn => "INFRARED_ON",
            Command::InfraredOff => "INFRARED_OFF",
            Command::InfraredSet { .. } => "INFRARED_SET",
            Command::RefreshVersion => "GETVERSION",
            Command::RefreshFirmware => "GETHOSTFIRMWARE",
            Command::RefreshWifi => "GETWIFIINFO",
            Command::Discovery { .. } => "DISCOVERY",
            Command::StopThread => "STOPTHREAD",
        }
    }
}

/// A queue entry: a command, its band, and an optional device scope.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedCommand {
    pub priority: Priority,
    pub device: Option<Uuid>,
    pub command: Command,
}

impl QueuedCommand {
    /// Entry at the command's default band.
    pub fn new(device: Option<Uuid>, command: Command) -> Self {
        QueuedCommand {
            priority: command.priority(),
            device,
            command,
        }
    }

    /// Entry at an explicit band (timer and poller producers override the
    /// default STATUS band).
    pub fn with_priority(priority: Priority, device: Option<Uuid>, command: Command) -> Self {
        QueuedCommand {
            priority,
            device,
            command,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_bands_are_strictly_ascending() {
        let bands = [
            Priority::ThreadStop,
            Priority::InitDiscovery,
            Priority::WaveformEffect,
            Priority::HighCommand,
            Priority::MediumCommand,
            Priority::HighStatus,
            Priority::MediumStatus,
            Priority::Discovery,
            Priority::Polling,
            Priority::Low,
        ];
        for pair in bands.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].value() < pair[1].value());
        }
    }

    #[test]
    fn test_default_bands() {
        assert_eq!(Command::StopThread.priority(), Priority::ThreadStop);
        assert_eq!(
            Command::Discovery { initial: true }.priority(),
            Priority::InitDiscovery
        );
        assert_eq!(
            Command::Discovery { initial: false }.priority(),
            Priority::Discovery
        );
        assert_eq!(Command::On.priority(), Priority::HighCommand);
        assert_eq!(Command::Status.priority(), Priority::MediumStatus);
        assert_eq!(Command::RefreshWifi.priority(), Priority::Low);
    }

    #[test]
    fn test_device_scope() {
        assert!(Command::Status.is_device_scoped());
        assert!(!Command::StopThread.is_device_scoped());
        assert!(!Command::Discovery { initial: false }.is_device_scoped());
    }
}
