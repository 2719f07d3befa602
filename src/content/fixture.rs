//! Canned content provider for tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{ClueReply, ContentError, ContentProvider, GeneratedContent};
use crate::catalog::Voice;

/// Returns fixed content and records what it was asked for
pub struct FixtureProvider {
    pub fail_content: bool,
    /// Return whitespace-only sentences
    pub blank_content: bool,
    pub audio: Option<Vec<u8>>,
    pub fail_audio: bool,
    pub clue: ClueReply,
    pub fail_clue: bool,
    /// How long the clue oracle takes to answer
    pub clue_delay: Duration,
    pub hint: String,
    pub fail_hint: bool,
    pub content_calls: AtomicUsize,
    pub clue_calls: AtomicUsize,
    pub hint_calls: AtomicUsize,
    pub voices: Mutex<Vec<Voice>>,
    pub requested: Mutex<Vec<(String, String)>>,
}

impl Default for FixtureProvider {
    fn default() -> Self {
        Self {
            fail_content: false,
            blank_content: false,
            // 0.25s of silence at 24kHz
            audio: Some(vec![0u8; 12_000]),
            fail_audio: false,
            clue: ClueReply::Answer("It is near the sea.".to_string()),
            fail_clue: false,
            clue_delay: Duration::ZERO,
            hint: "Famous for its festivals.".to_string(),
            fail_hint: false,
            content_calls: AtomicUsize::new(0),
            clue_calls: AtomicUsize::new(0),
            hint_calls: AtomicUsize::new(0),
            voices: Mutex::new(Vec::new()),
            requested: Mutex::new(Vec::new()),
        }
    }
}

impl FixtureProvider {
    pub fn content_calls(&self) -> usize {
        self.content_calls.load(Ordering::SeqCst)
    }

    pub fn hint_calls(&self) -> usize {
        self.hint_calls.load(Ordering::SeqCst)
    }

    pub fn clue_calls(&self) -> usize {
        self.clue_calls.load(Ordering::SeqCst)
    }
}

fn unavailable() -> ContentError {
    ContentError::Service(503)
}

#[async_trait]
impl ContentProvider for FixtureProvider {
    async fn generate_game_content(
        &self,
        language: &str,
        country: &str,
    ) -> Result<GeneratedContent, ContentError> {
        self.content_calls.fetch_add(1, Ordering::SeqCst);
        self.requested
            .lock()
            .unwrap()
            .push((language.to_string(), country.to_string()));

        if self.fail_content {
            return Err(unavailable());
        }
        if self.blank_content {
            return Ok(GeneratedContent {
                english: "   ".to_string(),
                native: String::new(),
            });
        }
        Ok(GeneratedContent {
            english: "The market opens at dawn.".to_string(),
            native: format!("[{language}] The market opens at dawn."),
        })
    }

    async fn synthesize_speech(
        &self,
        _text: &str,
        voice: Voice,
    ) -> Result<Option<Vec<u8>>, ContentError> {
        self.voices.lock().unwrap().push(voice);
        if self.fail_audio {
            return Err(unavailable());
        }
        Ok(self.audio.clone())
    }

    async fn ask_clue(
        &self,
        _question: &str,
        _language: &str,
        _country: &str,
    ) -> Result<ClueReply, ContentError> {
        self.clue_calls.fetch_add(1, Ordering::SeqCst);
        if !self.clue_delay.is_zero() {
            tokio::time::sleep(self.clue_delay).await;
        }
        if self.fail_clue {
            return Err(unavailable());
        }
        Ok(self.clue.clone())
    }

    async fn cultural_hint(&self, _language: &str, _country: &str) -> Result<String, ContentError> {
        self.hint_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_hint {
            return Err(unavailable());
        }
        Ok(self.hint.clone())
    }
}
