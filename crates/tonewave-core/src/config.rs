//! Playback engine configuration.

use crate::format::{AudioFormat, ByteOrder};
use crate::{Error, Result};
use serde::Deserialize;
use std::time::Duration;

/// Configuration for the playback engine.
///
/// Every field has a default, so a partial TOML table is enough:
///
/// ```
/// use tonewave_core::EngineConfig;
///
/// let config = EngineConfig::from_toml_str("buffer_frames = 256").unwrap();
/// assert_eq!(config.buffer_frames, 256);
/// assert_eq!(config.sample_rate, 44100);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sample_rate: u32,
    /// Frames per device write.
    pub buffer_frames: usize,
    pub channels: u16,
    pub byte_order: ByteOrder,
    /// Output device index; `None` picks the host default.
    pub output_device: Option<usize>,
    /// Buffers the device may hold ahead of playback.
    pub queue_depth: usize,
    /// How long a single write may block before the device is considered dead.
    pub write_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            buffer_frames: 512,
            channels: 1,
            byte_order: ByteOrder::BigEndian,
            output_device: None,
            queue_depth: 4,
            write_timeout_ms: 2000,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(8000..=384_000).contains(&self.sample_rate) {
            return Err(Error::InvalidConfig(format!(
                "sample_rate {} out of range (8000-384000 Hz)",
                self.sample_rate
            )));
        }
        if !(16..=16384).contains(&self.buffer_frames) {
            return Err(Error::InvalidConfig(format!(
                "buffer_frames {} out of range (16-16384)",
                self.buffer_frames
            )));
        }
        if !(1..=8).contains(&self.channels) {
            return Err(Error::InvalidConfig(format!(
                "channels {} out of range (1-8)",
                self.channels
            )));
        }
        if self.queue_depth == 0 {
            return Err(Error::InvalidConfig("queue_depth must be at least 1".into()));
        }
        if self.write_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "write_timeout_ms must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Device format requested on `start()`.
    pub fn format(&self) -> AudioFormat {
        AudioFormat {
            sample_rate: self.sample_rate,
            channels: self.channels,
            byte_order: self.byte_order,
        }
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}
