//! Waveform effect shapes.

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

/// Shape of a timed color-oscillation effect.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, EnumIter, PartialEq, Eq)]
pub enum WaveformShape {
    Saw = 0,
    Sine = 1,
    HalfSine = 2,
    Triangle = 3,
    Pulse = 4,
}

impl WaveformShape {
    pub fn create(value: u8) -> Option<Self> {
        WaveformShape::iter().find(|shape| *shape as u8 == value)
    }

    pub fn id(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_round_trip() {
        for shape in WaveformShape::iter() {
            assert_eq!(WaveformShape::create(shape.id()), Some(shape));
        }
        assert_eq!(WaveformShape::create(5), None);
    }
}
