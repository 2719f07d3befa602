//! Content service abstraction
//!
//! All generated material (sentence pairs, speech audio, oracle answers and
//! cultural hints) comes from an external generative service. The engine only
//! talks to it through [`ContentProvider`].

mod http;

#[cfg(test)]
pub mod fixture;

pub use http::HttpContentProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::Voice;

/// Substring the oracle returns when a question gives too much away
pub const CLUE_REJECTION_SENTINEL: &str = "ASK_ANOTHER";

/// Fallback answer when the oracle returns no text
pub const DEFAULT_CLUE_ANSWER: &str = "I'm not sure.";

/// Fallback cultural hint when the oracle returns no text
pub const DEFAULT_CULTURAL_HINT: &str = "A place of rich heritage.";

/// A generated sentence and its translation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub english: String,
    pub native: String,
}

/// The oracle's verdict on a clue question
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClueReply {
    /// The question was answered
    Answer(String),
    /// The question was too direct; the player should rephrase
    Rejected,
}

impl ClueReply {
    /// Interpret raw oracle text
    pub fn from_text(text: Option<String>) -> Self {
        match text {
            Some(t) if t.contains(CLUE_REJECTION_SENTINEL) => ClueReply::Rejected,
            Some(t) if !t.trim().is_empty() => ClueReply::Answer(t.trim().to_string()),
            _ => ClueReply::Answer(DEFAULT_CLUE_ANSWER.to_string()),
        }
    }
}

/// Failures talking to the content service
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content service unreachable: {0}")]
    Network(#[source] reqwest::Error),

    #[error("content service returned status {0}")]
    Service(u16),

    #[error("malformed content response: {0}")]
    Malformed(String),

    #[error("failed to decode generated content: {0}")]
    Deserialize(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ContentError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ContentError::Malformed(e.to_string())
        } else if let Some(status) = e.status() {
            ContentError::Service(status.as_u16())
        } else {
            ContentError::Network(e)
        }
    }
}

/// The four operations the game needs from the content service
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Generate an English sentence and its translation into `language` as
    /// spoken in `country`
    async fn generate_game_content(
        &self,
        language: &str,
        country: &str,
    ) -> Result<GeneratedContent, ContentError>;

    /// Synthesize speech for `text`; `Ok(None)` when the service produced
    /// no audio
    async fn synthesize_speech(
        &self,
        text: &str,
        voice: Voice,
    ) -> Result<Option<Vec<u8>>, ContentError>;

    /// Ask the oracle a free-text question about the target
    async fn ask_clue(
        &self,
        question: &str,
        language: &str,
        country: &str,
    ) -> Result<ClueReply, ContentError>;

    /// A vague cultural hint about the target
    async fn cultural_hint(&self, language: &str, country: &str) -> Result<String, ContentError>;
}
