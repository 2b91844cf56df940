//! # Tonewave - Real-time Tone Generator
//!
//! Synthesizes a periodic waveform and streams it to an audio device while
//! frequency, amplitude, and waveform shape change live.
//!
//! ## Architecture
//!
//! Tonewave is an umbrella crate over:
//! - **tonewave-core** - Waveform math, playback engine, device seam, CPAL output
//!
//! This crate adds the control surface a UI binds to: amplitude on a 0-100
//! scale, waveform selection by name, slider ranges, and a display preview.
//!
//! ## Quick Start
//!
//! ```ignore
//! use tonewave::prelude::*;
//!
//! let engine = ToneEngine::builder().build()?;
//!
//! engine.set_frequency(440.0);
//! engine.set_amplitude(50.0);
//! engine.set_waveform_kind(WaveformKind::Triangle);
//! engine.start();
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - CPAL audio output
//! - `cpal` - CPAL audio output; without it only [`MemoryDevice`] is available

/// Re-export of tonewave-core for direct access
pub use tonewave_core as core;

pub use tonewave_core::{
    waveform, AudioDevice, AudioFormat, AudioSink, ByteOrder, DiagnosticSink, EngineConfig,
    ErrorKind, MemoryCapture, MemoryDevice, ParameterRange, ParameterScale, PlaybackEngine,
    PlaybackParameters, PlaybackState, TracingDiagnostics, WaveformKind,
};

#[cfg(feature = "cpal")]
pub use tonewave_core::{list_output_devices, CpalDevice};

mod builder;
mod engine;
mod error;

pub use builder::ToneEngineBuilder;
pub use engine::{preview, ToneEngine};
pub use error::{Error, Result};

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{ToneEngine, ToneEngineBuilder};

    pub use crate::core::{EngineConfig, MemoryDevice, PlaybackState, WaveformKind};
}
