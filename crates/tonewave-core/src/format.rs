//! Output sample format and 16-bit PCM encoding.

use serde::{Deserialize, Serialize};

/// Bytes per encoded sample (16-bit signed PCM).
pub const BYTES_PER_SAMPLE: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ByteOrder {
    #[default]
    BigEndian,
    LittleEndian,
}

/// Format requested from the output device: signed 16-bit PCM, interleaved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub byte_order: ByteOrder,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 1,
            byte_order: ByteOrder::BigEndian,
        }
    }
}

impl AudioFormat {
    pub const BITS_PER_SAMPLE: u16 = 16;

    #[inline]
    pub fn bytes_per_frame(&self) -> usize {
        self.channels as usize * BYTES_PER_SAMPLE
    }

    /// Scale factor mapping normalized 1.0 to the largest positive sample.
    #[inline]
    pub fn full_scale(&self) -> f64 {
        i16::MAX as f64
    }

    /// Scale a normalized sample by `amplitude` into a 16-bit value.
    ///
    /// Rounds to nearest and saturates at `i16::MIN`/`i16::MAX`. NaN encodes as silence.
    #[inline]
    pub fn quantize(&self, normalized: f64, amplitude: f64) -> i16 {
        let scaled = (normalized * amplitude * self.full_scale()).round();
        if scaled.is_nan() {
            return 0;
        }
        scaled.clamp(i16::MIN as f64, i16::MAX as f64) as i16
    }

    #[inline]
    pub fn encode(&self, sample: i16) -> [u8; BYTES_PER_SAMPLE] {
        match self.byte_order {
            ByteOrder::BigEndian => sample.to_be_bytes(),
            ByteOrder::LittleEndian => sample.to_le_bytes(),
        }
    }

    #[inline]
    pub fn decode(&self, bytes: [u8; BYTES_PER_SAMPLE]) -> i16 {
        match self.byte_order {
            ByteOrder::BigEndian => i16::from_be_bytes(bytes),
            ByteOrder::LittleEndian => i16::from_le_bytes(bytes),
        }
    }

    /// Decode an interleaved byte buffer. A trailing odd byte is ignored.
    pub fn decode_buffer(&self, buffer: &[u8]) -> Vec<i16> {
        buffer
            .chunks_exact(BYTES_PER_SAMPLE)
            .map(|pair| self.decode([pair[0], pair[1]]))
            .collect()
    }
}
