//! Pure color math: range conversions, the perceptual brightness remap and
//! the published brightness-level blend.
//!
//! The remap and blend curves reproduce the dimming behavior of the reference
//! mobile app. Their constants (the midpoint split and the 1.98 multiplier)
//! were reverse-engineered from observed device traffic; they are preserved
//! verbatim because changing them changes user-visible dimming.

/// Midpoint of the combined saturation+brightness dimming curve.
pub(crate) const REMAP_MIDPOINT: u16 = 32768;

/// Slope of both halves of the dimming curve.
pub(crate) const REMAP_SLOPE: f64 = 1.98;

/// Convert a 0-100 percentage to the raw 0-65535 wire range.
///
/// Truncating, like every conversion in this module.
///
/// # Examples
///
/// ```
/// use lifx_fleet_rs::color::percent_to_raw;
///
/// assert_eq!(percent_to_raw(0), 0);
/// assert_eq!(percent_to_raw(60), 39321);
/// assert_eq!(percent_to_raw(100), 65535);
/// ```
pub fn percent_to_raw(percent: u8) -> u16 {
    (u32::from(percent.min(100)) * 65535 / 100) as u16
}

/// Convert a raw 0-65535 wire value to a truncated 0-100 percentage.
pub fn raw_to_percent(raw: u16) -> u8 {
    (u32::from(raw) * 100 / 65535) as u8
}

/// Convert a raw 0-65535 hue to truncated 0-360 degrees.
pub fn raw_to_degrees(raw: u16) -> u16 {
    (u32::from(raw) * 360 / 65535) as u16
}

/// Map a raw brightness target onto the combined saturation+brightness curve
/// used for colored devices.
///
/// Above the midpoint the brightness is pinned at full and saturation shifts
/// down; below it the saturation is pinned at full and brightness shifts up.
/// Both branches meet exactly at the midpoint, so dimming through 50% has no
/// visible step. Returns `(saturation, brightness)`.
pub fn remap_brightness(target: u16) -> (u16, u16) {
    if target >= REMAP_MIDPOINT {
        let sat = 65535.0 - f64::from(target - REMAP_MIDPOINT) * REMAP_SLOPE;
        (sat as u16, u16::MAX)
    } else {
        let bri = 65535.0 - f64::from(REMAP_MIDPOINT - target) * REMAP_SLOPE;
        (u16::MAX, bri as u16)
    }
}

/// Inverse of [`remap_brightness`]: recover the curve position from a
/// device's current saturation/brightness pair.
///
/// Used by relative dimming so a delta applies to the perceived level rather
/// than to whichever channel happens to be unpinned.
pub fn remap_position(saturation: u16, brightness: u16) -> u16 {
    let pos = if saturation >= brightness {
        f64::from(REMAP_MIDPOINT) - f64::from(u16::MAX - brightness) / REMAP_SLOPE
    } else {
        f64::from(REMAP_MIDPOINT) + f64::from(u16::MAX - saturation) / REMAP_SLOPE
    };
    pos.clamp(0.0, 65535.0) as u16
}

/// Single publishable "brightness level" percentage.
///
/// Colored devices blend saturation into the level; white devices publish
/// brightness directly. Both scale by the power fraction and collapse to
/// zero when off.
pub fn brightness_level(
    saturation_pct: u8,
    brightness_pct: u8,
    power_pct: u8,
    colored: bool,
) -> u8 {
    if power_pct == 0 {
        return 0;
    }
    let power_frac = f64::from(power_pct) / 100.0;
    let level = if colored {
        let sat = f64::from(saturation_pct).max(1.0);
        (f64::from(brightness_pct) / 2.0 + (100.0 - sat) / 2.0) * power_frac
    } else {
        f64::from(brightness_pct) * power_frac
    };
    level as u8
}

/// HSV to RGB on normalized values (hue 0-360, sat/value 0-100), with the
/// output channels also scaled 0-100.
pub fn hsv_to_rgb(hue_deg: u16, saturation_pct: u8, value_pct: u8) -> (u8, u8, u8) {
    let h = f64::from(hue_deg % 360);
    let s = f64::from(saturation_pct.min(100)) / 100.0;
    let v = f64::from(value_pct.min(100)) / 100.0;

    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match (h / 60.0) as u16 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    (
        ((r + m) * 100.0) as u8,
        ((g + m) * 100.0) as u8,
        ((b + m) * 100.0) as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_round_trip_truncates() {
        assert_eq!(raw_to_percent(percent_to_raw(60)), 59);
        assert_eq!(raw_to_percent(65535), 100);
        assert_eq!(raw_to_degrees(65535), 360);
        assert_eq!(raw_to_degrees(0), 0);
    }

    #[test]
    fn test_remap_midpoint_continuity() {
        // The two branches must agree at the midpoint.
        let (sat_hi, bri_hi) = remap_brightness(REMAP_MIDPOINT);
        let (sat_lo, bri_lo) = remap_brightness(REMAP_MIDPOINT - 1);
        assert_eq!((sat_hi, bri_hi), (65535, 65535));
        assert_eq!(sat_lo, 65535);
        assert!(bri_hi - bri_lo <= 2);
    }

    #[test]
    fn test_remap_is_order_preserving() {
        let mut prev = remap_brightness(0);
        for target in (0..=65535u32).step_by(257).map(|t| t as u16) {
            let cur = remap_brightness(target);
            // Saturation never increases, brightness never decreases.
            assert!(cur.0 <= prev.0);
            assert!(cur.1 >= prev.1);
            prev = cur;
        }
    }

    #[test]
    fn test_remap_eighty_percent_shifts_saturation() {
        let target = percent_to_raw(80);
        assert_eq!(target, 52428);
        let (sat, bri) = remap_brightness(target);
        assert_eq!(bri, 65535);
        assert_eq!(sat, (65535.0 - f64::from(52428 - 32768) * 1.98) as u16);
        assert_eq!(sat, 26608);
    }

    #[test]
    fn test_remap_position_inverts_curve() {
        for target in [0u16, 1000, 20000, 32768, 40000, 52428, 65535] {
            let (sat, bri) = remap_brightness(target);
            let recovered = remap_position(sat, bri);
            assert!(recovered.abs_diff(target) <= 1, "target {target} -> {recovered}");
        }
    }

    #[test]
    fn test_brightness_level_white() {
        assert_eq!(brightness_level(0, 80, 100, false), 80);
        assert_eq!(brightness_level(0, 80, 0, false), 0);
    }

    #[test]
    fn test_brightness_level_colored_blend() {
        // (bri/2) + ((100-sat)/2), saturation floored at 1.0.
        assert_eq!(brightness_level(100, 100, 100, true), 50);
        assert_eq!(brightness_level(0, 100, 100, true), 99);
        assert_eq!(brightness_level(50, 50, 100, true), 50);
    }

    #[test]
    fn test_hsv_to_rgb_primaries() {
        assert_eq!(hsv_to_rgb(0, 100, 100), (100, 0, 0));
        assert_eq!(hsv_to_rgb(120, 100, 100), (0, 100, 0));
        assert_eq!(hsv_to_rgb(240, 100, 100), (0, 0, 100));
        assert_eq!(hsv_to_rgb(0, 0, 100), (100, 100, 100));
    }
}
