//! Playback context lifecycle

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::pcm::{decode_pcm16, AudioClip, CHANNELS, SAMPLE_RATE};
use super::AudioError;

/// Lifecycle state of the playback context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextState {
    /// Created or parked; must be resumed before output
    Suspended,
    /// Accepting output
    Running,
}

/// Destination for decoded clips
pub trait AudioSink: Send + Sync {
    /// Queue a clip for output and report how long it will play
    fn submit(&self, clip: &AudioClip) -> Result<Duration, AudioError>;
}

/// Sink without a device: the shell renders the sound, the engine only
/// tracks how long it lasts
#[derive(Debug, Default, Clone, Copy)]
pub struct PacedSink;

impl AudioSink for PacedSink {
    fn submit(&self, clip: &AudioClip) -> Result<Duration, AudioError> {
        Ok(clip.duration())
    }
}

struct AudioContext {
    state: ContextState,
    sample_rate: u32,
    created_at: Instant,
}

/// A clip that has started playing
#[derive(Debug)]
pub struct Playback {
    duration: Duration,
}

impl Playback {
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Resolves when the clip has played to the end
    pub async fn finished(self) {
        tokio::time::sleep(self.duration).await;
    }
}

/// Process-wide handle to the playback context
pub struct AudioEngine {
    sink: Arc<dyn AudioSink>,
    context: Mutex<Option<AudioContext>>,
}

impl AudioEngine {
    pub fn new(sink: Arc<dyn AudioSink>) -> Self {
        Self {
            sink,
            context: Mutex::new(None),
        }
    }

    /// State of the context, `None` until the first playback
    pub fn context_state(&self) -> Option<ContextState> {
        self.context
            .lock()
            .ok()
            .and_then(|ctx| ctx.as_ref().map(|c| c.state))
    }

    /// Park the context; the next playback resumes it
    pub fn suspend(&self) {
        if let Ok(mut guard) = self.context.lock() {
            if let Some(ctx) = guard.as_mut() {
                if ctx.state == ContextState::Running {
                    ctx.state = ContextState::Suspended;
                    debug!(
                        age_ms = ctx.created_at.elapsed().as_millis() as u64,
                        "audio context suspended"
                    );
                }
            }
        }
    }

    /// Decode a PCM16 payload and start playing it.
    ///
    /// The whole clip is decoded up front: a device-backed sink needs the
    /// samples, and decoding also rejects odd-length payloads before the
    /// player hears anything. [`PacedSink`] only reads the clip length.
    pub fn start(&self, payload: &[u8]) -> Result<Playback, AudioError> {
        let sample_rate = {
            let mut guard = self
                .context
                .lock()
                .map_err(|_| AudioError::Output("audio context lock poisoned".to_string()))?;

            let ctx = guard.get_or_insert_with(|| {
                info!(sample_rate = SAMPLE_RATE, "audio context created");
                AudioContext {
                    state: ContextState::Suspended,
                    sample_rate: SAMPLE_RATE,
                    created_at: Instant::now(),
                }
            });

            if ctx.state == ContextState::Suspended {
                ctx.state = ContextState::Running;
                debug!("audio context resumed");
            }
            ctx.sample_rate
        };

        let clip = decode_pcm16(payload, sample_rate, CHANNELS)?;
        let duration = self.sink.submit(&clip)?;
        debug!(duration_ms = duration.as_millis() as u64, "playback started");

        Ok(Playback { duration })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> AudioEngine {
        AudioEngine::new(Arc::new(PacedSink))
    }

    #[test]
    fn test_context_created_on_first_use() {
        let audio = engine();
        assert_eq!(audio.context_state(), None);

        let playback = audio.start(&[0u8; 4_800]).unwrap();
        assert_eq!(playback.duration(), Duration::from_millis(100));
        assert_eq!(audio.context_state(), Some(ContextState::Running));
    }

    #[test]
    fn test_suspended_context_is_resumed() {
        let audio = engine();
        audio.start(&[0u8; 48]).unwrap();

        audio.suspend();
        assert_eq!(audio.context_state(), Some(ContextState::Suspended));

        audio.start(&[0u8; 48]).unwrap();
        assert_eq!(audio.context_state(), Some(ContextState::Running));
    }

    #[test]
    fn test_suspend_before_creation_is_noop() {
        let audio = engine();
        audio.suspend();
        assert_eq!(audio.context_state(), None);
    }

    #[test]
    fn test_decode_failure_surfaces() {
        let audio = engine();
        assert!(matches!(audio.start(&[1]), Err(AudioError::Truncated(1))));
    }

    #[test]
    fn test_sink_receives_decoded_samples() {
        struct Recording(Mutex<Vec<usize>>);

        impl AudioSink for Recording {
            fn submit(&self, clip: &AudioClip) -> Result<Duration, AudioError> {
                self.0.lock().unwrap().push(clip.samples.len());
                Ok(clip.duration())
            }
        }

        let sink = Arc::new(Recording(Mutex::new(Vec::new())));
        let audio = AudioEngine::new(sink.clone());
        let playback = audio.start(&[0u8; 4_800]).unwrap();

        assert_eq!(*sink.0.lock().unwrap(), vec![2_400]);
        assert_eq!(playback.duration(), Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_playback_runs_to_completion() {
        let audio = engine();
        let playback = audio.start(&[0u8; 480]).unwrap();
        let started = Instant::now();
        playback.finished().await;
        assert!(started.elapsed() >= Duration::from_millis(10));
    }
}
