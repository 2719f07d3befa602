//! Audio playback for pre-fetched speech
//!
//! Speech arrives as raw PCM16 mono at 24kHz. The playback context is created
//! on first use and resumed whenever it is found suspended.

mod pcm;
mod playback;

pub use playback::{AudioEngine, ContextState, PacedSink};

use thiserror::Error;

/// Failures decoding or starting playback
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio payload is empty")]
    Empty,

    #[error("audio payload has an odd byte length ({0})")]
    Truncated(usize),

    #[error("audio output failed: {0}")]
    Output(String),
}
