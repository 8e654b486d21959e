//! Wire-level value types shared across the engine.

mod hsbk;
mod power;
mod waveform;

pub use hsbk::{Hsbk, KELVIN_MAX, KELVIN_MIN};
pub use power::PowerLevel;
pub use waveform::WaveformShape;
