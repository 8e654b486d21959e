//! Binary power level.

use serde::{Deserialize, Serialize};

/// Device power level.
///
/// The bulbs are binary-power with independent brightness, so only 0 and
/// 65535 are ever persisted; any non-zero wire value reads back as on.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerLevel {
    #[default]
    Off,
    On,
}

impl PowerLevel {
    /// Interpret a raw wire power value.
    pub fn from_raw(raw: u16) -> Self {
        if raw > 0 { PowerLevel::On } else { PowerLevel::Off }
    }

    /// Raw wire value (0 or 65535).
    pub fn raw(self) -> u16 {
        match self {
            PowerLevel::On => u16::MAX,
            PowerLevel::Off => 0,
        }
    }

    pub fn is_on(self) -> bool {
        matches!(self, PowerLevel::On)
    }
}
