//! Playback engine: device lifecycle and the generation loop.

use crate::config::EngineConfig;
use crate::diagnostics::{DiagnosticSink, TracingDiagnostics};
use crate::format::AudioFormat;
use crate::lockfree::AtomicFlag;
use crate::output::{AudioDevice, AudioSink};
use crate::parameter::{ParameterSnapshot, PlaybackParameters};
use crate::waveform::{self, WaveformKind};
use crate::{Error, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Samples synthesized between two checks of the stop flag.
const STOP_CHECK_INTERVAL: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum PlaybackState {
    #[default]
    Stopped = 0,
    Playing = 1,
}

impl PlaybackState {
    fn from_tag(tag: u8) -> Self {
        if tag == PlaybackState::Playing as u8 {
            PlaybackState::Playing
        } else {
            PlaybackState::Stopped
        }
    }
}

/// State touched by both the engine and its generation loop.
struct Shared {
    params: Arc<PlaybackParameters>,
    state: AtomicU8,
    samples_written: AtomicU64,
    diagnostics: Arc<dyn DiagnosticSink>,
    last_error: Mutex<Option<String>>,
}

impl Shared {
    fn state(&self) -> PlaybackState {
        PlaybackState::from_tag(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: PlaybackState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn report(&self, error: &Error) {
        *self.last_error.lock() = Some(error.to_string());
        self.diagnostics.report(error);
    }
}

struct Worker {
    shutdown: Arc<AtomicFlag>,
    handle: JoinHandle<()>,
}

/// Synthesizes the current waveform and streams it to an [`AudioDevice`].
///
/// Parameter setters never block and may be called from any thread while
/// playing. `start`/`stop` are serialized internally and never return
/// errors; failures go to the diagnostic sink and leave the engine stopped.
pub struct PlaybackEngine {
    shared: Arc<Shared>,
    device: Box<dyn AudioDevice>,
    format: AudioFormat,
    buffer_frames: usize,
    worker: Mutex<Option<Worker>>,
}

impl PlaybackEngine {
    pub fn builder() -> PlaybackEngineBuilder {
        PlaybackEngineBuilder::default()
    }

    #[inline]
    pub fn set_frequency(&self, hz: f64) {
        self.shared.params.set_frequency(hz);
    }

    /// Linear gain as a fraction, `0.0..=1.0`.
    #[inline]
    pub fn set_amplitude(&self, level: f64) {
        self.shared.params.set_amplitude(level);
    }

    #[inline]
    pub fn set_waveform_kind(&self, kind: WaveformKind) {
        self.shared.params.set_waveform_kind(kind);
    }

    /// Shared parameter handle, for controls living outside the engine.
    pub fn parameters(&self) -> &Arc<PlaybackParameters> {
        &self.shared.params
    }

    pub fn state(&self) -> PlaybackState {
        self.shared.state()
    }

    pub fn is_playing(&self) -> bool {
        self.state() == PlaybackState::Playing
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn buffer_frames(&self) -> usize {
        self.buffer_frames
    }

    pub fn device_name(&self) -> String {
        self.device.name()
    }

    /// Samples produced since the current (or last) stream was opened.
    pub fn samples_written(&self) -> u64 {
        self.shared.samples_written.load(Ordering::Acquire)
    }

    /// Message of the most recent reported failure.
    pub fn last_error(&self) -> Option<String> {
        self.shared.last_error.lock().clone()
    }

    /// Open the device and begin streaming. No-op while playing.
    ///
    /// Failure is reported to the diagnostic sink and leaves the engine stopped.
    pub fn start(&self) {
        if let Err(err) = self.try_start() {
            self.shared.report(&err);
        }
    }

    /// Like [`start`](Self::start), but returns the failure instead of reporting it.
    pub fn try_start(&self) -> Result<()> {
        let mut worker = self.worker.lock();

        if let Some(existing) = worker.take() {
            if self.shared.state() == PlaybackState::Playing {
                *worker = Some(existing);
                return Ok(());
            }
            // Loop already exited on its own
            join_worker(existing.handle);
        }

        let mut sink = self.device.open(&self.format)?;
        if let Err(err) = sink.start() {
            sink.close();
            return Err(err);
        }

        let shutdown = Arc::new(AtomicFlag::new(false));
        self.shared.samples_written.store(0, Ordering::Release);
        self.shared.set_state(PlaybackState::Playing);

        let generation = GenerationLoop {
            shared: Arc::clone(&self.shared),
            shutdown: Arc::clone(&shutdown),
            format: self.format,
            buffer_frames: self.buffer_frames,
        };

        // If spawning fails the closure is dropped and the guard closes the sink.
        let device = DeviceGuard::new(sink, Arc::clone(&self.shared));
        let spawned = thread::Builder::new()
            .name("tonewave-playback".into())
            .spawn(move || generation.run(device));

        match spawned {
            Ok(handle) => {
                tracing::info!(
                    device = %self.device.name(),
                    sample_rate = self.format.sample_rate,
                    buffer_frames = self.buffer_frames,
                    "Playback started"
                );
                *worker = Some(Worker { shutdown, handle });
                Ok(())
            }
            Err(err) => {
                self.shared.set_state(PlaybackState::Stopped);
                Err(Error::Spawn(err))
            }
        }
    }

    /// Stop streaming and release the device. No-op while stopped.
    ///
    /// Waits for the generation loop, which exits within one buffer cycle.
    pub fn stop(&self) {
        let mut worker = self.worker.lock();

        if let Some(Worker { shutdown, handle }) = worker.take() {
            shutdown.set(true);
            join_worker(handle);
            self.shared.set_state(PlaybackState::Stopped);
            tracing::info!(samples = self.samples_written(), "Playback stopped");
        }
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn join_worker(handle: JoinHandle<()>) {
    if handle.join().is_err() {
        tracing::error!("Playback thread panicked");
    }
}

/// Owns an open sink and guarantees it is released exactly once.
///
/// Dropping the guard also leaves the engine stopped, so a loop that exits
/// by unwinding is not left looking like it still plays.
struct DeviceGuard {
    sink: Option<Box<dyn AudioSink>>,
    shared: Arc<Shared>,
}

impl DeviceGuard {
    fn new(sink: Box<dyn AudioSink>, shared: Arc<Shared>) -> Self {
        Self {
            sink: Some(sink),
            shared,
        }
    }

    fn write(&mut self, buffer: &[u8]) -> Result<()> {
        match self.sink.as_mut() {
            Some(sink) => sink.write(buffer),
            None => Err(Error::WriteFailed("device already released".into())),
        }
    }

    /// Drain (when the device is healthy), stop, close.
    fn release(&mut self, drain: bool) {
        let Some(mut sink) = self.sink.take() else {
            return;
        };

        if drain {
            if let Err(err) = sink.drain() {
                tracing::warn!("Failed to drain audio device: {}", err);
            }
        }
        if let Err(err) = sink.stop() {
            tracing::warn!("Failed to stop audio device: {}", err);
        }
        sink.close();
        tracing::debug!("Audio device released");
    }
}

impl Drop for DeviceGuard {
    fn drop(&mut self) {
        self.release(false);
        self.shared.set_state(PlaybackState::Stopped);
    }
}

struct GenerationLoop {
    shared: Arc<Shared>,
    shutdown: Arc<AtomicFlag>,
    format: AudioFormat,
    buffer_frames: usize,
}

impl GenerationLoop {
    fn run(self, mut device: DeviceGuard) {
        let mut buffer = vec![0u8; self.buffer_frames * self.format.bytes_per_frame()];
        let mut clock: u64 = 0;

        let result = loop {
            if self.shutdown.get() {
                break Ok(());
            }

            let params = self.shared.params.snapshot();
            if !self.fill(&mut buffer, &mut clock, &params) {
                break Ok(());
            }

            if let Err(err) = device.write(&buffer) {
                break Err(err);
            }
            self.shared.samples_written.store(clock, Ordering::Release);
        };

        match result {
            Ok(()) => device.release(true),
            Err(err) => {
                device.release(false);
                self.shared.report(&err);
            }
        }
        tracing::debug!(samples = clock, "Generation loop exited");
    }

    /// Synthesize one buffer. Returns `false` if stopped part-way; the
    /// partial buffer must then not be written.
    fn fill(&self, buffer: &mut [u8], clock: &mut u64, params: &ParameterSnapshot) -> bool {
        let sample_rate = self.format.sample_rate as f64;
        let gain = params.gain();

        for (i, frame) in buffer
            .chunks_exact_mut(self.format.bytes_per_frame())
            .enumerate()
        {
            if i % STOP_CHECK_INTERVAL == 0 && i > 0 && self.shutdown.get() {
                return false;
            }

            let value = waveform::sample(
                *clock,
                params.frequency_hz,
                params.waveform_kind,
                sample_rate,
            );
            let encoded = self.format.encode(self.format.quantize(value, gain));
            for channel in frame.chunks_exact_mut(encoded.len()) {
                channel.copy_from_slice(&encoded);
            }
            *clock += 1;
        }
        true
    }
}

/// Builder for [`PlaybackEngine`].
pub struct PlaybackEngineBuilder {
    config: EngineConfig,
    device: Option<Box<dyn AudioDevice>>,
    params: Option<Arc<PlaybackParameters>>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl Default for PlaybackEngineBuilder {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            device: None,
            params: None,
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }
}

impl PlaybackEngineBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Default: CPAL output (or an error without the `cpal` feature).
    pub fn device(mut self, device: impl AudioDevice + 'static) -> Self {
        self.device = Some(Box::new(device));
        self
    }

    /// Share an existing parameter set instead of creating one.
    pub fn parameters(mut self, params: Arc<PlaybackParameters>) -> Self {
        self.params = Some(params);
        self
    }

    /// Default: [`TracingDiagnostics`].
    pub fn diagnostics(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.diagnostics = Arc::new(sink);
        self
    }

    pub fn build(self) -> Result<PlaybackEngine> {
        self.config.validate()?;

        let device: Box<dyn AudioDevice> = match self.device {
            Some(device) => device,
            #[cfg(feature = "cpal")]
            None => Box::new(crate::output::CpalDevice::from_config(&self.config)),
            #[cfg(not(feature = "cpal"))]
            None => {
                return Err(Error::InvalidConfig(
                    "no audio device given and CPAL output is disabled".into(),
                ))
            }
        };

        Ok(PlaybackEngine {
            shared: Arc::new(Shared {
                params: self.params.unwrap_or_default(),
                state: AtomicU8::new(PlaybackState::Stopped as u8),
                samples_written: AtomicU64::new(0),
                diagnostics: self.diagnostics,
                last_error: Mutex::new(None),
            }),
            device,
            format: self.config.format(),
            buffer_frames: self.config.buffer_frames,
            worker: Mutex::new(None),
        })
    }
}
