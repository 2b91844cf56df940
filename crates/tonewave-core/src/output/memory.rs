//! In-memory capture device for tests and headless runs.

use super::{AudioDevice, AudioSink};
use crate::format::AudioFormat;
use crate::{Error, ErrorKind, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Default)]
struct CaptureState {
    buffers: Mutex<Vec<Vec<u8>>>,
    format: Mutex<Option<AudioFormat>>,
    opens: AtomicUsize,
    closes: AtomicUsize,
    drains: AtomicUsize,
}

/// Read side of a [`MemoryDevice`]: everything written so far.
#[derive(Debug, Clone, Default)]
pub struct MemoryCapture {
    state: Arc<CaptureState>,
}

impl MemoryCapture {
    pub fn buffers(&self) -> Vec<Vec<u8>> {
        self.state.buffers.lock().clone()
    }

    pub fn buffer_count(&self) -> usize {
        self.state.buffers.lock().len()
    }

    /// All captured buffers decoded to samples, in write order.
    pub fn samples(&self) -> Vec<i16> {
        let format = self.format().unwrap_or_default();
        self.state
            .buffers
            .lock()
            .iter()
            .flat_map(|buffer| format.decode_buffer(buffer))
            .collect()
    }

    /// Format of the most recent open.
    pub fn format(&self) -> Option<AudioFormat> {
        *self.state.format.lock()
    }

    pub fn opens(&self) -> usize {
        self.state.opens.load(Ordering::Acquire)
    }

    pub fn closes(&self) -> usize {
        self.state.closes.load(Ordering::Acquire)
    }

    pub fn drains(&self) -> usize {
        self.state.drains.load(Ordering::Acquire)
    }

    /// Devices opened and not yet closed.
    pub fn open_handles(&self) -> usize {
        let closes = self.closes();
        self.opens().saturating_sub(closes)
    }

    pub fn clear(&self) {
        self.state.buffers.lock().clear();
    }
}

/// Device that records every buffer written to it.
///
/// Each write sleeps for `write_delay` so a generation loop is paced the way
/// a hardware device would pace it.
#[derive(Debug, Clone)]
pub struct MemoryDevice {
    capture: MemoryCapture,
    write_delay: Duration,
    open_failure: Option<ErrorKind>,
    fail_after_writes: Option<usize>,
}

impl Default for MemoryDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDevice {
    pub fn new() -> Self {
        Self {
            capture: MemoryCapture::default(),
            write_delay: Duration::from_millis(1),
            open_failure: None,
            fail_after_writes: None,
        }
    }

    pub fn write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = delay;
        self
    }

    /// Refuse to open, failing with an error of `kind`.
    pub fn fail_open(mut self, kind: ErrorKind) -> Self {
        self.open_failure = Some(kind);
        self
    }

    /// Accept `writes` buffers per open, then fail every write.
    pub fn fail_after_writes(mut self, writes: usize) -> Self {
        self.fail_after_writes = Some(writes);
        self
    }

    pub fn capture(&self) -> MemoryCapture {
        self.capture.clone()
    }
}

impl AudioDevice for MemoryDevice {
    fn open(&self, format: &AudioFormat) -> Result<Box<dyn AudioSink>> {
        match self.open_failure {
            Some(ErrorKind::UnsupportedFormat) => {
                return Err(Error::UnsupportedFormat(format!(
                    "{} Hz, {} channel(s) not supported by memory device",
                    format.sample_rate, format.channels
                )));
            }
            Some(_) => {
                return Err(Error::DeviceUnavailable("memory device is offline".into()));
            }
            None => {}
        }

        self.capture.state.opens.fetch_add(1, Ordering::AcqRel);
        *self.capture.state.format.lock() = Some(*format);

        Ok(Box::new(MemorySink {
            state: Arc::clone(&self.capture.state),
            write_delay: self.write_delay,
            writes_left: self.fail_after_writes,
            started: false,
            closed: false,
        }))
    }

    fn name(&self) -> String {
        "memory".to_string()
    }
}

struct MemorySink {
    state: Arc<CaptureState>,
    write_delay: Duration,
    writes_left: Option<usize>,
    started: bool,
    closed: bool,
}

impl AudioSink for MemorySink {
    fn start(&mut self) -> Result<()> {
        self.started = true;
        Ok(())
    }

    fn write(&mut self, buffer: &[u8]) -> Result<()> {
        if !self.started || self.closed {
            return Err(Error::WriteFailed("memory sink is not running".into()));
        }

        if let Some(left) = self.writes_left.as_mut() {
            if *left == 0 {
                return Err(Error::WriteFailed("memory device disconnected".into()));
            }
            *left -= 1;
        }

        if !self.write_delay.is_zero() {
            thread::sleep(self.write_delay);
        }
        self.state.buffers.lock().push(buffer.to_vec());
        Ok(())
    }

    fn drain(&mut self) -> Result<()> {
        self.state.drains.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.started = false;
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.state.closes.fetch_add(1, Ordering::AcqRel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_records_writes() {
        let device = MemoryDevice::new().write_delay(Duration::ZERO);
        let capture = device.capture();
        let format = AudioFormat::default();

        let mut sink = device.open(&format).unwrap();
        sink.start().unwrap();
        sink.write(&[0x7f, 0xff, 0x80, 0x00]).unwrap();
        sink.drain().unwrap();
        sink.stop().unwrap();
        sink.close();

        assert_eq!(capture.buffer_count(), 1);
        assert_eq!(capture.samples(), vec![i16::MAX, i16::MIN]);
        assert_eq!(capture.format(), Some(format));
        assert_eq!(capture.drains(), 1);
        assert_eq!(capture.open_handles(), 0);
    }

    #[test]
    fn test_write_before_start_fails() {
        let device = MemoryDevice::new();
        let mut sink = device.open(&AudioFormat::default()).unwrap();
        assert!(matches!(sink.write(&[0, 0]), Err(Error::WriteFailed(_))));
    }

    #[test]
    fn test_open_failures() {
        let unsupported = MemoryDevice::new().fail_open(ErrorKind::UnsupportedFormat);
        let err = unsupported.open(&AudioFormat::default()).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);

        let offline = MemoryDevice::new().fail_open(ErrorKind::DeviceUnavailable);
        let err = offline.open(&AudioFormat::default()).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::DeviceUnavailable);
        assert_eq!(offline.capture().opens(), 0);
    }

    #[test]
    fn test_fail_after_writes() {
        let device = MemoryDevice::new()
            .write_delay(Duration::ZERO)
            .fail_after_writes(2);
        let mut sink = device.open(&AudioFormat::default()).unwrap();
        sink.start().unwrap();

        assert!(sink.write(&[0, 0]).is_ok());
        assert!(sink.write(&[0, 0]).is_ok());
        assert!(matches!(sink.write(&[0, 0]), Err(Error::WriteFailed(_))));
        assert_eq!(device.capture().buffer_count(), 2);
    }

    #[test]
    fn test_open_handles_under_concurrent_open_close() {
        let device = MemoryDevice::new().write_delay(Duration::ZERO);
        let capture = device.capture();

        let churn = thread::spawn(move || {
            for _ in 0..2_000 {
                let mut sink = device.open(&AudioFormat::default()).unwrap();
                sink.close();
            }
        });
        // Must never underflow while closes race ahead of the read
        while !churn.is_finished() {
            let _ = capture.open_handles();
        }
        churn.join().unwrap();
        assert_eq!(capture.open_handles(), 0);
    }
}
