//! HSBK color representation.

use serde::{Deserialize, Serialize};

/// Lowest color temperature accepted by the bulbs.
pub const KELVIN_MIN: u16 = 2500;
/// Highest color temperature accepted by the bulbs.
pub const KELVIN_MAX: u16 = 9000;

/// Hue/Saturation/Brightness/Kelvin tuple in raw wire ranges.
///
/// Hue, saturation and brightness span the full 0-65535 range; kelvin is
/// limited to 2500-9000. Values are stored exactly as they travel on the
/// wire, so a status read followed by a write round-trips without loss.
///
/// # Examples
///
/// ```
/// use lifx_fleet_rs::Hsbk;
///
/// let warm_white = Hsbk::white(65535, 2700);
/// assert_eq!(warm_white.saturation, 0);
/// assert!(!warm_white.is_colored());
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hsbk {
    pub hue: u16,
    pub saturation: u16,
    pub brightness: u16,
    pub kelvin: u16,
}

impl Hsbk {
    /// Create an HSBK tuple, validating the kelvin range.
    ///
    /// Returns `None` when kelvin falls outside 2500-9000.
    ///
    /// # Examples
    ///
    /// ```
    /// use lifx_fleet_rs::Hsbk;
    ///
    /// assert!(Hsbk::create(0, 0, 65535, 2499).is_none());
    /// assert!(Hsbk::create(0, 0, 65535, 2500).is_some());
    /// assert!(Hsbk::create(0, 0, 65535, 9000).is_some());
    /// assert!(Hsbk::create(0, 0, 65535, 9001).is_none());
    /// ```
    pub fn create(hue: u16, saturation: u16, brightness: u16, kelvin: u16) -> Option<Self> {
        if (KELVIN_MIN..=KELVIN_MAX).contains(&kelvin) {
            Some(Hsbk {
                hue,
                saturation,
                brightness,
                kelvin,
            })
        } else {
            None
        }
    }

    /// A white (zero saturation) tuple at the given brightness and kelvin.
    pub fn white(brightness: u16, kelvin: u16) -> Self {
        Hsbk {
            hue: 0,
            saturation: 0,
            brightness,
            kelvin: kelvin.clamp(KELVIN_MIN, KELVIN_MAX),
        }
    }

    /// Whether the tuple encodes a colored (saturated) state.
    pub fn is_colored(&self) -> bool {
        self.saturation > 0
    }

    /// Copy of `self` with the given brightness.
    pub fn with_brightness(&self, brightness: u16) -> Self {
        Hsbk { brightness, ..*self }
    }
}
