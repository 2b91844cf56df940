//! Audio output devices.
//!
//! An [`AudioDevice`] opens an [`AudioSink`] for one playback run. The sink
//! follows the lifecycle `start` → `write`* → `drain` → `stop` → `close`;
//! `write` blocks until the device has consumed or buffered the data, which
//! is what paces the generation loop.

use crate::format::AudioFormat;
use crate::Result;

mod memory;
pub use memory::{MemoryCapture, MemoryDevice};

#[cfg(feature = "cpal")]
mod cpal_device;
#[cfg(feature = "cpal")]
pub use cpal_device::{list_output_devices, CpalDevice};

pub trait AudioDevice: Send + Sync {
    /// Open the device with `format`.
    ///
    /// Fails with `UnsupportedFormat` when no device accepts the format and
    /// `DeviceUnavailable` when the device cannot be acquired.
    fn open(&self, format: &AudioFormat) -> Result<Box<dyn AudioSink>>;

    fn name(&self) -> String;
}

pub trait AudioSink: Send {
    fn start(&mut self) -> Result<()>;

    /// Write one buffer of interleaved encoded samples.
    fn write(&mut self, buffer: &[u8]) -> Result<()>;

    /// Block until buffered audio has been played.
    fn drain(&mut self) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    /// Release the device. Called exactly once.
    fn close(&mut self);
}
