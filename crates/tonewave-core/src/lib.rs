//! Real-time tone synthesis kernel.
//!
//! # Primary API
//!
//! - [`PlaybackEngine`] / [`PlaybackEngineBuilder`]: start/stop and live parameter control
//! - [`WaveformKind`] / [`waveform::sample`]: pure waveform math
//! - [`AudioDevice`] / [`AudioSink`]: the output device seam
//! - [`EngineConfig`]: sample rate, buffer size, byte order
//!
//! # Feature-gated APIs
//!
//! - `"cpal"`: [`CpalDevice`] audio output (enabled by default)
//!
//! # Example
//!
//! ```ignore
//! use tonewave_core::{PlaybackEngine, WaveformKind};
//!
//! let engine = PlaybackEngine::builder().build()?;
//!
//! engine.set_frequency(440.0);
//! engine.set_waveform_kind(WaveformKind::Square);
//! engine.start();
//! // ...
//! engine.stop();
//! ```

pub mod error;
pub use error::{Error, ErrorKind, Result};

pub mod config;
pub use config::EngineConfig;

pub mod format;
pub use format::{AudioFormat, ByteOrder};

pub mod waveform;
pub use waveform::WaveformKind;

pub(crate) mod lockfree;
pub use lockfree::{AtomicDouble, AtomicFlag};

pub mod parameter;
pub use parameter::{ParameterRange, ParameterScale, ParameterSnapshot, PlaybackParameters};

pub mod diagnostics;
pub use diagnostics::{DiagnosticSink, TracingDiagnostics};

pub mod output;
pub use output::{AudioDevice, AudioSink, MemoryCapture, MemoryDevice};

#[cfg(feature = "cpal")]
pub use output::{list_output_devices, CpalDevice};

mod playback;
pub use playback::{PlaybackEngine, PlaybackEngineBuilder, PlaybackState};
