//! Live playback parameters and slider range mapping.
//!
//! [`PlaybackParameters`] is the only state shared between the control thread
//! and the playback thread. Each field lives in its own atomic slot: a single
//! field is never read half-written, while a snapshot may mix an old frequency
//! with a new amplitude if both change during one buffer.
//!
//! # Example
//!
//! ```
//! use tonewave_core::{ParameterRange, PlaybackParameters, WaveformKind};
//!
//! let params = PlaybackParameters::default();
//! params.set_waveform_kind(WaveformKind::Triangle);
//!
//! // Frequency slider: 50Hz to 2kHz, logarithmic
//! let slider = ParameterRange::logarithmic(50.0, 2000.0, 440.0);
//! params.set_frequency(slider.denormalize(0.5)); // ~316 Hz
//!
//! let snapshot = params.snapshot();
//! assert_eq!(snapshot.waveform_kind, WaveformKind::Triangle);
//! ```

use crate::lockfree::AtomicDouble;
use crate::waveform::WaveformKind;
use std::sync::atomic::{AtomicU8, Ordering};

pub const DEFAULT_FREQUENCY_HZ: f64 = 440.0;
pub const DEFAULT_AMPLITUDE: f64 = 0.5;

#[derive(Debug)]
pub struct PlaybackParameters {
    frequency_hz: AtomicDouble,
    amplitude: AtomicDouble,
    waveform_kind: AtomicU8,
}

/// Values read at the start of one output buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSnapshot {
    pub frequency_hz: f64,
    pub amplitude: f64,
    pub waveform_kind: WaveformKind,
}

impl ParameterSnapshot {
    /// Amplitude limited to `[0, 1]`; NaN counts as silence.
    #[inline]
    pub fn gain(&self) -> f64 {
        if self.amplitude.is_nan() {
            0.0
        } else {
            self.amplitude.clamp(0.0, 1.0)
        }
    }
}

impl PlaybackParameters {
    pub fn new(frequency_hz: f64, amplitude: f64, waveform_kind: WaveformKind) -> Self {
        Self {
            frequency_hz: AtomicDouble::new(frequency_hz),
            amplitude: AtomicDouble::new(amplitude),
            waveform_kind: AtomicU8::new(waveform_kind as u8),
        }
    }

    #[inline]
    pub fn set_frequency(&self, hz: f64) {
        self.frequency_hz.set(hz);
    }

    /// Linear gain as a fraction, `0.0..=1.0`.
    #[inline]
    pub fn set_amplitude(&self, level: f64) {
        self.amplitude.set(level);
    }

    #[inline]
    pub fn set_waveform_kind(&self, kind: WaveformKind) {
        self.waveform_kind.store(kind as u8, Ordering::Release);
    }

    #[inline]
    pub fn frequency(&self) -> f64 {
        self.frequency_hz.get()
    }

    #[inline]
    pub fn amplitude(&self) -> f64 {
        self.amplitude.get()
    }

    #[inline]
    pub fn waveform_kind(&self) -> WaveformKind {
        WaveformKind::from_tag(self.waveform_kind.load(Ordering::Acquire))
    }

    #[inline]
    pub fn snapshot(&self) -> ParameterSnapshot {
        ParameterSnapshot {
            frequency_hz: self.frequency(),
            amplitude: self.amplitude(),
            waveform_kind: self.waveform_kind(),
        }
    }
}

impl Default for PlaybackParameters {
    fn default() -> Self {
        Self::new(DEFAULT_FREQUENCY_HZ, DEFAULT_AMPLITUDE, WaveformKind::Sine)
    }
}

/// How a parameter value is scaled between normalized (0-1) and real values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterScale {
    /// `real = min + normalized * (max - min)`
    #[default]
    Linear,

    /// `real = min * (max/min)^normalized`
    ///
    /// Requires `min > 0` and `max > min`.
    Logarithmic,
}

/// Parameter range for mapping UI controls onto engine values.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterRange {
    pub min: f64,
    pub max: f64,
    pub default: f64,
    pub scale: ParameterScale,
}

impl ParameterRange {
    pub fn new(min: f64, max: f64, default: f64, scale: ParameterScale) -> Self {
        debug_assert!(max > min, "max must be greater than min");

        Self {
            min,
            max,
            default: default.clamp(min, max),
            scale,
        }
    }

    pub fn linear(min: f64, max: f64, default: f64) -> Self {
        Self::new(min, max, default, ParameterScale::Linear)
    }

    /// # Panics
    ///
    /// Panics in debug mode if `min <= 0`.
    pub fn logarithmic(min: f64, max: f64, default: f64) -> Self {
        debug_assert!(min > 0.0, "logarithmic scale requires min > 0");
        Self::new(min, max, default, ParameterScale::Logarithmic)
    }

    /// Convert a real value to normalized (0.0-1.0).
    #[inline]
    pub fn normalize(&self, value: f64) -> f64 {
        let value = value.clamp(self.min, self.max);
        let range = self.max - self.min;

        if range <= 0.0 {
            return 0.0;
        }

        match self.scale {
            ParameterScale::Linear => (value - self.min) / range,
            ParameterScale::Logarithmic if self.min > 0.0 => {
                let log_min = self.min.ln();
                (value.ln() - log_min) / (self.max.ln() - log_min)
            }
            // Invalid log range: fall back to linear
            ParameterScale::Logarithmic => (value - self.min) / range,
        }
    }

    /// Convert a normalized value (0.0-1.0) to a real value.
    #[inline]
    pub fn denormalize(&self, normalized: f64) -> f64 {
        let normalized = normalized.clamp(0.0, 1.0);
        let range = self.max - self.min;

        match self.scale {
            ParameterScale::Linear => self.min + normalized * range,
            ParameterScale::Logarithmic if self.min > 0.0 => {
                let log_min = self.min.ln();
                (log_min + normalized * (self.max.ln() - log_min)).exp()
            }
            ParameterScale::Logarithmic => self.min + normalized * range,
        }
    }

    #[inline]
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    #[inline]
    pub fn default_normalized(&self) -> f64 {
        self.normalize(self.default)
    }
}

impl Default for ParameterRange {
    fn default() -> Self {
        Self::linear(0.0, 1.0, 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_defaults() {
        let params = PlaybackParameters::default();
        let snapshot = params.snapshot();
        assert_eq!(snapshot.frequency_hz, 440.0);
        assert_eq!(snapshot.amplitude, 0.5);
        assert_eq!(snapshot.waveform_kind, WaveformKind::Sine);
    }

    #[test]
    fn test_setters_are_idempotent() {
        let params = PlaybackParameters::default();
        for _ in 0..3 {
            params.set_frequency(1000.0);
            params.set_amplitude(0.25);
            params.set_waveform_kind(WaveformKind::Sawtooth);
        }
        assert_eq!(
            params.snapshot(),
            ParameterSnapshot {
                frequency_hz: 1000.0,
                amplitude: 0.25,
                waveform_kind: WaveformKind::Sawtooth,
            }
        );
    }

    #[test]
    fn test_out_of_range_values_are_stored_as_is() {
        let params = PlaybackParameters::default();
        params.set_frequency(-5.0);
        params.set_amplitude(3.0);
        assert_eq!(params.frequency(), -5.0);
        assert_eq!(params.amplitude(), 3.0);
        assert_eq!(params.snapshot().gain(), 1.0);

        params.set_amplitude(f64::NAN);
        assert_eq!(params.snapshot().gain(), 0.0);
        params.set_amplitude(-1.0);
        assert_eq!(params.snapshot().gain(), 0.0);
    }

    #[test]
    fn test_concurrent_field_updates() {
        let params = Arc::new(PlaybackParameters::default());
        let writer = {
            let params = Arc::clone(&params);
            thread::spawn(move || {
                for i in 0..1000 {
                    params.set_frequency(if i % 2 == 0 { 220.0 } else { 880.0 });
                    params.set_waveform_kind(WaveformKind::all()[i % 4]);
                }
            })
        };

        for _ in 0..1000 {
            let snapshot = params.snapshot();
            assert!([440.0, 220.0, 880.0].contains(&snapshot.frequency_hz));
        }
        writer.join().unwrap();
    }

    #[test]
    fn test_linear_range() {
        let range = ParameterRange::linear(0.0, 100.0, 50.0);

        assert_relative_eq!(range.normalize(50.0), 0.5);
        assert_relative_eq!(range.denormalize(0.25), 25.0);
        assert_relative_eq!(range.default_normalized(), 0.5);
        assert_relative_eq!(range.clamp(120.0), 100.0);
        assert!(range.contains(0.0));
        assert!(!range.contains(-1.0));
    }

    #[test]
    fn test_logarithmic_range() {
        let range = ParameterRange::logarithmic(50.0, 2000.0, 440.0);

        let mid = range.denormalize(0.5);
        assert_relative_eq!(mid, (50.0f64 * 2000.0).sqrt(), max_relative = 1e-9);
        assert_relative_eq!(range.denormalize(0.0), 50.0, max_relative = 1e-9);
        assert_relative_eq!(range.denormalize(1.0), 2000.0, max_relative = 1e-9);

        for value in [50.0, 440.0, 1000.0, 2000.0] {
            let back = range.denormalize(range.normalize(value));
            assert_relative_eq!(value, back, max_relative = 1e-9);
        }
    }
}
