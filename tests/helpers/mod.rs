//! Test helpers for tonewave integration tests.
//!
//! Every engine here streams into a `MemoryDevice`, so no audio hardware is needed.

#![allow(dead_code)]

use std::time::{Duration, Instant};
use tonewave::prelude::*;
use tonewave::MemoryCapture;

/// Matches the engine's reference rate
pub const TEST_SAMPLE_RATE: f64 = 44100.0;

/// Build an engine writing into a fresh memory device.
pub fn test_engine() -> (ToneEngine, MemoryCapture) {
    let device = MemoryDevice::new();
    let capture = device.capture();
    let engine = ToneEngine::builder()
        .device(device)
        .build()
        .expect("Failed to create test engine");
    (engine, capture)
}

/// Poll `cond` every millisecond until it holds or `max_wait_ms` elapses.
pub fn wait_for(max_wait_ms: u64, mut cond: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    let timeout = Duration::from_millis(max_wait_ms);

    while start.elapsed() < timeout {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    cond()
}

/// Wait until at least `count` buffers were captured.
pub fn wait_for_buffers(capture: &MemoryCapture, count: usize) -> bool {
    wait_for(2000, || capture.buffer_count() >= count)
}

/// Decode one captured buffer with the capture's format.
pub fn decoded(capture: &MemoryCapture, index: usize) -> Vec<i16> {
    let format = capture.format().expect("device was never opened");
    format.decode_buffer(&capture.buffers()[index])
}

/// Count sign changes in a run of samples (zero counts as positive).
pub fn zero_crossings(samples: &[i16]) -> usize {
    samples
        .windows(2)
        .filter(|w| (w[0] >= 0) != (w[1] >= 0))
        .count()
}

/// Peak absolute sample value.
pub fn peak(samples: &[i16]) -> u16 {
    samples.iter().map(|s| s.unsigned_abs()).max().unwrap_or(0)
}
