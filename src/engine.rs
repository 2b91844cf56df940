//! ToneEngine: the control surface a UI binds to.

use crate::core::{
    AudioFormat, ParameterRange, PlaybackEngine, PlaybackState, WaveformKind,
};
use crate::Result;

/// Cycles a 440 Hz waveform shows across a full-width preview.
const PREVIEW_CYCLES_AT_A4: f64 = 20.0;

/// Tone generator with UI-facing units.
///
/// Amplitude is on a 0-100 scale here; the core engine works in fractions.
///
/// # Example
///
/// ```ignore
/// use tonewave::prelude::*;
///
/// let engine = ToneEngine::builder().build()?;
///
/// // Slider callbacks
/// engine.set_frequency(ToneEngine::frequency_range().denormalize(0.2));
/// engine.set_amplitude(75.0);
/// engine.set_waveform("Sawtooth")?;
///
/// engine.start();
/// let plot = engine.preview(600);
/// ```
pub struct ToneEngine {
    core: PlaybackEngine,
}

impl ToneEngine {
    pub fn builder() -> crate::ToneEngineBuilder {
        crate::ToneEngineBuilder::default()
    }

    pub(crate) fn from_core(core: PlaybackEngine) -> Self {
        Self { core }
    }

    /// Underlying engine (fractional amplitude, device access).
    pub fn core(&self) -> &PlaybackEngine {
        &self.core
    }

    /// Frequency slider range: 50-2000 Hz, default 440.
    pub fn frequency_range() -> ParameterRange {
        ParameterRange::linear(50.0, 2000.0, 440.0)
    }

    /// Amplitude slider range: 0-100, default 50.
    pub fn amplitude_range() -> ParameterRange {
        ParameterRange::linear(0.0, 100.0, 50.0)
    }

    pub fn set_frequency(&self, hz: f64) {
        self.core.set_frequency(hz);
    }

    /// Amplitude in percent (0-100).
    pub fn set_amplitude(&self, percent: f64) {
        self.core.set_amplitude(percent / 100.0);
    }

    pub fn set_waveform_kind(&self, kind: WaveformKind) {
        self.core.set_waveform_kind(kind);
    }

    /// Select a waveform by its display name, e.g. `"Triangle"`.
    pub fn set_waveform(&self, name: &str) -> Result<()> {
        let kind = name.parse::<WaveformKind>()?;
        self.core.set_waveform_kind(kind);
        Ok(())
    }

    pub fn frequency(&self) -> f64 {
        self.core.parameters().frequency()
    }

    /// Amplitude in percent (0-100).
    pub fn amplitude(&self) -> f64 {
        self.core.parameters().amplitude() * 100.0
    }

    pub fn waveform_kind(&self) -> WaveformKind {
        self.core.parameters().waveform_kind()
    }

    pub fn start(&self) {
        self.core.start();
    }

    pub fn stop(&self) {
        self.core.stop();
    }

    pub fn state(&self) -> PlaybackState {
        self.core.state()
    }

    pub fn is_playing(&self) -> bool {
        self.core.is_playing()
    }

    pub fn last_error(&self) -> Option<String> {
        self.core.last_error()
    }

    pub fn format(&self) -> AudioFormat {
        self.core.format()
    }

    pub fn device_name(&self) -> String {
        self.core.device_name()
    }

    /// Display curve for the current waveform and frequency.
    ///
    /// See [`preview`].
    pub fn preview(&self, width: usize) -> Vec<f64> {
        preview(self.waveform_kind(), self.frequency(), width)
    }
}

/// Render `width` points of `kind` for an on-screen plot.
///
/// The curve free-runs from the x coordinate (20 cycles across the width at
/// 440 Hz, proportionally more or fewer at other frequencies). It shows the
/// waveform's shape and relative pitch only; it is not tied to the samples
/// actually sent to the device. Values are normalized to `[-1, 1]`; scale by
/// amplitude when drawing.
pub fn preview(kind: WaveformKind, frequency_hz: f64, width: usize) -> Vec<f64> {
    if width == 0 {
        return Vec::new();
    }

    let cycles_per_point = PREVIEW_CYCLES_AT_A4 * frequency_hz.max(0.0) / 440.0 / width as f64;
    (0..width)
        .map(|x| {
            let cycles = x as f64 * cycles_per_point;
            kind.at_phase(if cycles.is_finite() { cycles.fract() } else { 0.0 })
        })
        .collect()
}
