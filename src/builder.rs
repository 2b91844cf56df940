//! Builder for configuring and constructing a `ToneEngine`.

use crate::core::{AudioDevice, DiagnosticSink, EngineConfig, PlaybackEngineBuilder};
use crate::{Result, ToneEngine};
use std::path::Path;

/// The engine starts stopped at 440 Hz, 50% amplitude, Sine.
///
/// # Example
///
/// ```ignore
/// use tonewave::prelude::*;
///
/// let engine = ToneEngine::builder()
///     .config_file("tonewave.toml")?
///     .output_device(1)
///     .build()?;
/// ```
#[derive(Default)]
pub struct ToneEngineBuilder {
    config: EngineConfig,
    core: PlaybackEngineBuilder,
}

impl ToneEngineBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Load engine settings from a TOML file.
    pub fn config_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        self.config = EngineConfig::from_toml_str(&source)?;
        tracing::debug!(path = %path.display(), "Loaded engine config");
        Ok(self)
    }

    /// Only used by the default CPAL device.
    pub fn output_device(mut self, index: usize) -> Self {
        self.config.output_device = Some(index);
        self
    }

    pub fn sample_rate(mut self, rate: u32) -> Self {
        self.config.sample_rate = rate;
        self
    }

    /// Default: 512
    pub fn buffer_frames(mut self, frames: usize) -> Self {
        self.config.buffer_frames = frames;
        self
    }

    /// Replace the default CPAL output, e.g. with a [`MemoryDevice`](crate::MemoryDevice).
    pub fn device(mut self, device: impl AudioDevice + 'static) -> Self {
        self.core = self.core.device(device);
        self
    }

    pub fn diagnostics(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.core = self.core.diagnostics(sink);
        self
    }

    pub fn build(self) -> Result<ToneEngine> {
        let core = self.core.config(self.config).build()?;
        Ok(ToneEngine::from_core(core))
    }
}
