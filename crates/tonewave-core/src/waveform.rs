//! Waveform synthesis.
//!
//! [`sample`] is a pure function of its inputs: the sample index is the only
//! phase reference, so the same index always yields the same value. Phase is
//! reduced to a cycle fraction in `f64` before any trigonometry, which keeps
//! indices well past `2^31` accurate.

use crate::Error;
use core::f64::consts::TAU;
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// Frequencies below this (including zero, negatives and NaN) are raised to it.
pub const MIN_FREQUENCY_HZ: f64 = 1.0e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum WaveformKind {
    #[default]
    Sine = 0,
    Square = 1,
    Triangle = 2,
    Sawtooth = 3,
}

impl WaveformKind {
    pub fn all() -> &'static [WaveformKind] {
        &[
            WaveformKind::Sine,
            WaveformKind::Square,
            WaveformKind::Triangle,
            WaveformKind::Sawtooth,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            WaveformKind::Sine => "Sine",
            WaveformKind::Square => "Square",
            WaveformKind::Triangle => "Triangle",
            WaveformKind::Sawtooth => "Sawtooth",
        }
    }

    /// Inverse of `kind as u8`. Unknown tags map to `Sine`.
    #[inline]
    pub(crate) fn from_tag(tag: u8) -> Self {
        match tag {
            1 => WaveformKind::Square,
            2 => WaveformKind::Triangle,
            3 => WaveformKind::Sawtooth,
            _ => WaveformKind::Sine,
        }
    }

    /// Evaluate one cycle of the waveform at cycle fraction `t` in `[0, 1)`.
    #[inline]
    pub fn at_phase(&self, t: f64) -> f64 {
        match self {
            WaveformKind::Sine => (TAU * t).sin(),
            WaveformKind::Square => {
                if (TAU * t).sin() >= 0.0 {
                    1.0
                } else {
                    -1.0
                }
            }
            // Minimum at the cycle start, peak at mid-cycle.
            WaveformKind::Triangle => 4.0 * (t - (t + 0.5).floor()).abs() - 1.0,
            WaveformKind::Sawtooth => 2.0 * (t - 0.5),
        }
    }

    #[inline]
    pub fn sample(&self, index: u64, frequency_hz: f64, sample_rate: f64) -> f64 {
        sample(index, frequency_hz, *self, sample_rate)
    }
}

impl fmt::Display for WaveformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WaveformKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WaveformKind::all()
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownWaveform(s.to_string()))
    }
}

/// Fraction of the current cycle at `index`, in `[0, 1)`.
#[inline]
pub fn cycle_fraction(index: u64, frequency_hz: f64, sample_rate: f64) -> f64 {
    let frequency = clamp_frequency(frequency_hz);
    let sample_rate = if sample_rate.is_finite() && sample_rate >= 1.0 {
        sample_rate
    } else {
        1.0
    };
    let cycles = index as f64 * frequency / sample_rate;
    if !cycles.is_finite() {
        return 0.0;
    }

    let t = cycles.fract();
    let t = if t < 0.0 { t + 1.0 } else { t };
    if t >= 1.0 {
        0.0
    } else {
        t
    }
}

/// Normalized waveform value in `[-1, 1]` for sample `index`.
#[inline]
pub fn sample(index: u64, frequency_hz: f64, kind: WaveformKind, sample_rate: f64) -> f64 {
    kind.at_phase(cycle_fraction(index, frequency_hz, sample_rate))
}

#[inline]
pub(crate) fn clamp_frequency(frequency_hz: f64) -> f64 {
    if frequency_hz.is_nan() || frequency_hz < MIN_FREQUENCY_HZ {
        MIN_FREQUENCY_HZ
    } else {
        frequency_hz
    }
}
