//! CPAL audio output.
//!
//! CPAL pulls samples from a callback, while the engine pushes buffers from
//! its generation loop. The two meet in a bounded channel: a full channel
//! blocks `write`, which paces the loop at the device's playback rate.

use super::{AudioDevice, AudioSink};
use crate::config::EngineConfig;
use crate::format::AudioFormat;
use crate::lockfree::AtomicFlag;
use crate::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Wrapper to hold a `cpal::Stream` in a `Send` context.
///
/// `cpal::Stream` is `!Send` due to platform internals. The sink that owns it
/// moves to the playback thread once, right after opening, and is only ever
/// touched from that thread afterwards.
struct StreamHandle(cpal::Stream);

// SAFETY: the stream is never shared; ownership moves to a single thread
// that performs every later call and the final drop.
unsafe impl Send for StreamHandle {}

/// Output through the host's audio API.
#[derive(Debug, Clone)]
pub struct CpalDevice {
    device_index: Option<usize>,
    queue_depth: usize,
    write_timeout: Duration,
}

impl Default for CpalDevice {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl CpalDevice {
    /// Host default output device.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            device_index: config.output_device,
            queue_depth: config.queue_depth.max(1),
            write_timeout: config.write_timeout(),
        }
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.device_index = Some(index);
        self
    }
}

/// List available output devices as `"index: name"`.
pub fn list_output_devices() -> Result<Vec<String>> {
    cpal::default_host()
        .output_devices()?
        .enumerate()
        .map(|(i, d)| Ok(format!("{i}: {}", d.name()?)))
        .collect()
}

fn get_device(index: Option<usize>) -> Result<cpal::Device> {
    let host = cpal::default_host();

    match index {
        Some(i) => {
            let devices: Vec<_> = host
                .output_devices()
                .map_err(|e| Error::DeviceUnavailable(e.to_string()))?
                .collect();
            let count = devices.len();
            devices.into_iter().nth(i).ok_or_else(|| {
                Error::DeviceUnavailable(format!(
                    "Device index {i} out of range ({count} available)"
                ))
            })
        }
        None => host
            .default_output_device()
            .ok_or_else(|| Error::DeviceUnavailable("No output device available".into())),
    }
}

/// Pick a device config that can run `format`'s sample rate.
///
/// Prefers the requested channel count, then native 16-bit samples.
fn select_config(
    device: &cpal::Device,
    format: &AudioFormat,
) -> Result<cpal::SupportedStreamConfig> {
    let rate = cpal::SampleRate(format.sample_rate);

    let rank = |range: &cpal::SupportedStreamConfigRange| {
        let channels = if range.channels() == format.channels { 0 } else { 1 };
        let sample = match range.sample_format() {
            cpal::SampleFormat::I16 => 0,
            cpal::SampleFormat::F32 => 1,
            _ => 2,
        };
        (channels, sample)
    };

    let best = device
        .supported_output_configs()
        .map_err(|e| Error::DeviceUnavailable(e.to_string()))?
        .filter(|range| range.min_sample_rate() <= rate && rate <= range.max_sample_rate())
        .filter(|range| {
            matches!(
                range.sample_format(),
                cpal::SampleFormat::I16 | cpal::SampleFormat::F32 | cpal::SampleFormat::U16
            )
        })
        .min_by_key(rank);

    best.map(|range| range.with_sample_rate(rate)).ok_or_else(|| {
        Error::UnsupportedFormat(format!(
            "{} Hz, {} channel(s), {}-bit signed",
            format.sample_rate,
            format.channels,
            AudioFormat::BITS_PER_SAMPLE
        ))
    })
}

impl AudioDevice for CpalDevice {
    fn open(&self, format: &AudioFormat) -> Result<Box<dyn AudioSink>> {
        let device = get_device(self.device_index)?;
        let supported = select_config(&device, format)?;
        let config: cpal::StreamConfig = supported.config();

        let (tx, rx) = bounded(self.queue_depth);
        let status = Arc::new(StreamStatus::default());
        let source_channels = format.channels as usize;

        let stream = match supported.sample_format() {
            cpal::SampleFormat::I16 => {
                build_stream::<i16>(&device, &config, source_channels, rx, Arc::clone(&status))
            }
            cpal::SampleFormat::U16 => {
                build_stream::<u16>(&device, &config, source_channels, rx, Arc::clone(&status))
            }
            _ => build_stream::<f32>(&device, &config, source_channels, rx, Arc::clone(&status)),
        }
        .map_err(|e| Error::DeviceUnavailable(e.to_string()))?;

        tracing::debug!(
            device = %device.name().unwrap_or_default(),
            sample_rate = config.sample_rate.0,
            device_channels = config.channels,
            sample_format = ?supported.sample_format(),
            "Opened CPAL output stream"
        );

        Ok(Box::new(CpalSink {
            stream: Some(StreamHandle(stream)),
            tx: Some(tx),
            status,
            format: *format,
            write_timeout: self.write_timeout,
        }))
    }

    fn name(&self) -> String {
        get_device(self.device_index)
            .and_then(|d| Ok(d.name()?))
            .unwrap_or_else(|_| "unavailable".to_string())
    }
}

#[derive(Default)]
struct StreamStatus {
    /// Frames handed to `write` and not yet played.
    queued_frames: AtomicUsize,
    failed: AtomicFlag,
    error: Mutex<Option<String>>,
}

impl StreamStatus {
    fn failure(&self) -> Option<Error> {
        if !self.failed.get() {
            return None;
        }
        let message = self
            .error
            .lock()
            .clone()
            .unwrap_or_else(|| "stream error".to_string());
        Some(Error::WriteFailed(message))
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    source_channels: usize,
    rx: Receiver<Vec<i16>>,
    status: Arc<StreamStatus>,
) -> core::result::Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + cpal::FromSample<i16>,
{
    let device_channels = config.channels as usize;
    let callback_status = Arc::clone(&status);
    let mut feed = FrameFeed::new(rx, source_channels);

    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            feed.fill(data, device_channels, &callback_status);
        },
        move |err| {
            *status.error.lock() = Some(err.to_string());
            status.failed.set(true);
        },
        None,
    )
}

/// Callback side of the bridge: hands queued buffers to the device frame
/// by frame.
struct FrameFeed {
    rx: Receiver<Vec<i16>>,
    source_channels: usize,
    pending: Vec<i16>,
    cursor: usize,
}

impl FrameFeed {
    fn new(rx: Receiver<Vec<i16>>, source_channels: usize) -> Self {
        Self {
            rx,
            source_channels: source_channels.max(1),
            pending: Vec::new(),
            cursor: 0,
        }
    }

    /// Fill interleaved `data`. Source channels repeat across extra device
    /// channels; an empty queue yields silence.
    fn fill<T>(&mut self, data: &mut [T], device_channels: usize, status: &StreamStatus)
    where
        T: cpal::Sample + cpal::FromSample<i16>,
    {
        for frame in data.chunks_mut(device_channels.max(1)) {
            if self.cursor >= self.pending.len() {
                match self.rx.try_recv() {
                    Ok(next) => {
                        self.pending = next;
                        self.cursor = 0;
                    }
                    Err(_) => {
                        // Underrun
                        frame.fill(T::EQUILIBRIUM);
                        continue;
                    }
                }
            }

            let end = (self.cursor + self.source_channels).min(self.pending.len());
            let source = &self.pending[self.cursor..end];
            for (ch, sample) in frame.iter_mut().enumerate() {
                let value = source.get(ch % self.source_channels).copied().unwrap_or(0);
                *sample = T::from_sample(value);
            }
            self.cursor += self.source_channels;
            let _ = status.queued_frames.fetch_update(
                Ordering::AcqRel,
                Ordering::Acquire,
                |n| Some(n.saturating_sub(1)),
            );
        }
    }
}

struct CpalSink {
    stream: Option<StreamHandle>,
    tx: Option<Sender<Vec<i16>>>,
    status: Arc<StreamStatus>,
    format: AudioFormat,
    write_timeout: Duration,
}

impl AudioSink for CpalSink {
    fn start(&mut self) -> Result<()> {
        if let Some(stream) = &self.stream {
            stream.0.play()?;
        }
        Ok(())
    }

    fn write(&mut self, buffer: &[u8]) -> Result<()> {
        if let Some(err) = self.status.failure() {
            return Err(err);
        }
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| Error::WriteFailed("stream is closed".into()))?;

        let samples = self.format.decode_buffer(buffer);
        let frames = samples.len() / (self.format.channels as usize).max(1);
        self.status.queued_frames.fetch_add(frames, Ordering::AcqRel);

        tx.send_timeout(samples, self.write_timeout).map_err(|e| {
            self.status.queued_frames.fetch_sub(frames, Ordering::AcqRel);
            match e {
                SendTimeoutError::Timeout(_) => Error::WriteFailed(format!(
                    "device stopped consuming audio for {:?}",
                    self.write_timeout
                )),
                SendTimeoutError::Disconnected(_) => {
                    Error::WriteFailed("audio stream disconnected".into())
                }
            }
        })
    }

    fn drain(&mut self) -> Result<()> {
        let queued = self.status.queued_frames.load(Ordering::Acquire);
        let playback = Duration::from_secs_f64(queued as f64 / self.format.sample_rate as f64);
        let deadline = Instant::now() + playback + self.write_timeout;

        while self.status.queued_frames.load(Ordering::Acquire) > 0 {
            if self.status.failed.get() {
                break;
            }
            if Instant::now() >= deadline {
                return Err(Error::WriteFailed("timed out draining audio".into()));
            }
            thread::sleep(Duration::from_millis(1));
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(stream) = &self.stream {
            stream.0.pause()?;
        }
        Ok(())
    }

    fn close(&mut self) {
        self.tx = None;
        self.stream = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ByteOrder;
    use cpal::Sample;

    fn feed_with(buffers: &[Vec<i16>], source_channels: usize) -> (FrameFeed, StreamStatus) {
        let (tx, rx) = bounded(buffers.len().max(1));
        let status = StreamStatus::default();
        for buffer in buffers {
            status
                .queued_frames
                .fetch_add(buffer.len() / source_channels, Ordering::AcqRel);
            tx.send(buffer.clone()).unwrap();
        }
        (FrameFeed::new(rx, source_channels), status)
    }

    fn detached_sink(
        queue_depth: usize,
        write_timeout: Duration,
    ) -> (CpalSink, Receiver<Vec<i16>>) {
        let (tx, rx) = bounded(queue_depth);
        let sink = CpalSink {
            stream: None,
            tx: Some(tx),
            status: Arc::new(StreamStatus::default()),
            format: AudioFormat {
                byte_order: ByteOrder::LittleEndian,
                ..AudioFormat::default()
            },
            write_timeout,
        };
        (sink, rx)
    }

    #[test]
    fn test_mono_fans_out_to_device_channels() {
        let (mut feed, status) = feed_with(&[vec![100, -200, 300]], 1);
        let mut data = [0i16; 6];

        feed.fill(&mut data, 2, &status);

        assert_eq!(data, [100, 100, -200, -200, 300, 300]);
        assert_eq!(status.queued_frames.load(Ordering::Acquire), 0);
    }

    #[test]
    fn test_underrun_is_silence() {
        let (mut feed, status) = feed_with(&[vec![7, 8]], 1);
        let mut data = [1i16; 4];

        feed.fill(&mut data, 1, &status);

        assert_eq!(data, [7, 8, 0, 0]);
        // Silence frames were never queued
        assert_eq!(status.queued_frames.load(Ordering::Acquire), 0);

        let mut floats = [0.5f32; 2];
        feed.fill(&mut floats, 2, &status);
        assert_eq!(floats, [0.0, 0.0]);

        let mut unsigned = [0u16; 2];
        feed.fill(&mut unsigned, 1, &status);
        assert_eq!(unsigned, [u16::EQUILIBRIUM; 2]);
    }

    #[test]
    fn test_buffers_continue_across_callbacks() {
        let (mut feed, status) = feed_with(&[vec![1, 2, 3], vec![4, 5]], 1);
        assert_eq!(status.queued_frames.load(Ordering::Acquire), 5);

        let mut first = [0i16; 2];
        feed.fill(&mut first, 1, &status);
        assert_eq!(first, [1, 2]);
        assert_eq!(status.queued_frames.load(Ordering::Acquire), 3);

        let mut second = [0i16; 3];
        feed.fill(&mut second, 1, &status);
        assert_eq!(second, [3, 4, 5]);
        assert_eq!(status.queued_frames.load(Ordering::Acquire), 0);
    }

    #[test]
    fn test_stereo_source_keeps_channel_order() {
        let (mut feed, status) = feed_with(&[vec![1, -1, 2, -2]], 2);
        let mut data = [0i16; 4];
        feed.fill(&mut data, 2, &status);
        assert_eq!(data, [1, -1, 2, -2]);
        assert_eq!(status.queued_frames.load(Ordering::Acquire), 0);
    }

    #[test]
    fn test_write_queues_decoded_samples() {
        let (mut sink, rx) = detached_sink(2, Duration::from_millis(50));

        sink.write(&[0xff, 0x7f, 0x00, 0x80]).unwrap();

        assert_eq!(rx.try_recv().unwrap(), vec![i16::MAX, i16::MIN]);
        assert_eq!(sink.status.queued_frames.load(Ordering::Acquire), 2);
    }

    #[test]
    fn test_write_times_out_when_device_stalls() {
        let (mut sink, _rx) = detached_sink(1, Duration::from_millis(20));
        sink.write(&[0, 0]).unwrap();

        let err = sink.write(&[0, 0]).unwrap_err();
        assert!(matches!(err, Error::WriteFailed(_)));
        // The rejected buffer is not counted as queued
        assert_eq!(sink.status.queued_frames.load(Ordering::Acquire), 1);
    }

    #[test]
    fn test_write_after_disconnect_fails() {
        let (mut sink, rx) = detached_sink(1, Duration::from_millis(20));
        drop(rx);
        let err = sink.write(&[0, 0]).unwrap_err();
        assert!(err.to_string().contains("disconnected"));
        assert_eq!(sink.status.queued_frames.load(Ordering::Acquire), 0);
    }

    #[test]
    fn test_stream_error_fails_next_write() {
        let (mut sink, _rx) = detached_sink(1, Duration::from_millis(20));
        *sink.status.error.lock() = Some("device unplugged".into());
        sink.status.failed.set(true);

        let err = sink.write(&[0, 0]).unwrap_err();
        assert!(err.to_string().contains("device unplugged"));
    }

    #[test]
    fn test_drain_waits_for_queued_frames() {
        let (mut sink, rx) = detached_sink(1, Duration::from_millis(20));
        assert!(sink.drain().is_ok());

        sink.write(&[0, 0, 0, 0]).unwrap();
        assert!(matches!(sink.drain(), Err(Error::WriteFailed(_))));

        let mut feed = FrameFeed::new(rx, 1);
        let mut data = [0i16; 2];
        feed.fill(&mut data, 1, &sink.status);
        assert!(sink.drain().is_ok());
    }

    #[test]
    fn test_close_rejects_writes() {
        let (mut sink, _rx) = detached_sink(1, Duration::from_millis(20));
        sink.close();
        assert!(matches!(sink.write(&[0, 0]), Err(Error::WriteFailed(_))));
    }
}
