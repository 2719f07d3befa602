//! HTTP client for the content service
//!
//! Every operation is a single JSON POST of `{action, ...params}` answered by
//! `{text?, audio?}`.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{
    ClueReply, ContentError, ContentProvider, GeneratedContent, DEFAULT_CULTURAL_HINT,
};
use crate::catalog::Voice;

/// Request body sent to the content service
#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
enum ServiceRequest<'a> {
    GenerateGameContent {
        language: &'a str,
        country: &'a str,
    },
    Tts {
        text: &'a str,
        #[serde(rename = "voiceName")]
        voice_name: &'a str,
    },
    GetClue {
        question: &'a str,
        language: &'a str,
        country: &'a str,
    },
    GenerateCulturalHint {
        language: &'a str,
        country: &'a str,
    },
}

impl ServiceRequest<'_> {
    fn action(&self) -> &'static str {
        match self {
            ServiceRequest::GenerateGameContent { .. } => "generateGameContent",
            ServiceRequest::Tts { .. } => "tts",
            ServiceRequest::GetClue { .. } => "getClue",
            ServiceRequest::GenerateCulturalHint { .. } => "generateCulturalHint",
        }
    }
}

/// Response body returned by the content service
#[derive(Debug, Default, Deserialize)]
struct ServiceReply {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    audio: Option<String>,
}

/// Content provider backed by the HTTP content service
pub struct HttpContentProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpContentProvider {
    pub fn new(endpoint: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key,
        })
    }

    async fn call(&self, request: &ServiceRequest<'_>) -> Result<ServiceReply, ContentError> {
        debug!(action = request.action(), "content service request");

        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ContentError::Service(status.as_u16()));
        }

        Ok(response.json::<ServiceReply>().await?)
    }
}

/// Extract the sentence pair from a `generateGameContent` reply
fn parse_game_content(reply: ServiceReply) -> Result<GeneratedContent, ContentError> {
    let text = reply
        .text
        .ok_or_else(|| ContentError::Malformed("missing text".to_string()))?;

    let content: GeneratedContent = serde_json::from_str(text.trim())?;
    if content.english.trim().is_empty() || content.native.trim().is_empty() {
        return Err(ContentError::Malformed("empty sentence".to_string()));
    }

    Ok(content)
}

/// Decode the base64 PCM payload of a `tts` reply
fn parse_audio(reply: ServiceReply) -> Result<Option<Vec<u8>>, ContentError> {
    match reply.audio {
        Some(data) if !data.is_empty() => STANDARD
            .decode(data.as_bytes())
            .map(Some)
            .map_err(|e| ContentError::Malformed(format!("audio is not base64: {e}"))),
        _ => Ok(None),
    }
}

#[async_trait]
impl ContentProvider for HttpContentProvider {
    async fn generate_game_content(
        &self,
        language: &str,
        country: &str,
    ) -> Result<GeneratedContent, ContentError> {
        let reply = self
            .call(&ServiceRequest::GenerateGameContent { language, country })
            .await?;
        parse_game_content(reply)
    }

    async fn synthesize_speech(
        &self,
        text: &str,
        voice: Voice,
    ) -> Result<Option<Vec<u8>>, ContentError> {
        let reply = self
            .call(&ServiceRequest::Tts {
                text,
                voice_name: voice.as_str(),
            })
            .await?;
        let audio = parse_audio(reply)?;
        if audio.is_none() {
            warn!(%voice, "content service returned no audio");
        }
        Ok(audio)
    }

    async fn ask_clue(
        &self,
        question: &str,
        language: &str,
        country: &str,
    ) -> Result<ClueReply, ContentError> {
        let reply = self
            .call(&ServiceRequest::GetClue {
                question,
                language,
                country,
            })
            .await?;
        Ok(ClueReply::from_text(reply.text))
    }

    async fn cultural_hint(&self, language: &str, country: &str) -> Result<String, ContentError> {
        let reply = self
            .call(&ServiceRequest::GenerateCulturalHint { language, country })
            .await?;
        Ok(reply
            .text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_CULTURAL_HINT.to_string()))
    }
}
