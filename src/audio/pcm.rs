//! PCM16 decoding

use std::time::Duration;

use super::AudioError;

/// Sample rate of the speech the content service produces
pub const SAMPLE_RATE: u32 = 24_000;

/// Speech is mono
pub const CHANNELS: u16 = 1;

/// Decoded, normalized audio ready for output
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    /// Interleaved samples in [-1.0, 1.0)
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioClip {
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }
}

/// Decode little-endian signed 16-bit PCM into normalized float samples
pub fn decode_pcm16(bytes: &[u8], sample_rate: u32, channels: u16) -> Result<AudioClip, AudioError> {
    if bytes.is_empty() {
        return Err(AudioError::Empty);
    }
    if bytes.len() % 2 != 0 {
        return Err(AudioError::Truncated(bytes.len()));
    }

    let samples = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect();

    Ok(AudioClip {
        samples,
        sample_rate,
        channels,
    })
}
