//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.
//! Status, action and audio requests are answered as they complete, so their
//! responses may overtake each other on one connection.

use serde::{Deserialize, Serialize};

use crate::audio::ContextState;
use crate::catalog::{LanguageEntry, Region, Voice};
use crate::events::GameEvent;
use crate::state::{Action, ActionOutcome, Snapshot};

/// Largest message accepted from a client
pub const MAX_MESSAGE_LEN: usize = 1024 * 1024;

/// Requests from the shell to the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Request current engine status
    GetStatus,

    /// Ping to check connectivity
    Ping,

    /// Subscribe to game event notifications
    Subscribe,

    /// Perform a player action
    Act { action: Action },

    /// Fetch the current round's speech as base64 PCM16
    GetAudio,

    /// List the language table
    GetCatalog,
}

/// Responses from the engine to the shell
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Current engine status
    Status(EngineStatus),

    /// Result of a player action
    Outcome(ActionOutcome),

    /// Pong response to ping
    Pong,

    /// Subscription confirmed
    Subscribed,

    /// Speech for the current round, absent outside Playing or when synthesis failed
    Audio { data: Option<String> },

    /// The language table
    Catalog { entries: Vec<CatalogEntry> },

    /// Error response
    Error { code: String, message: String },
}

impl Response {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Response::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Push notification from the engine to subscribed shells
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    Event { event: GameEvent },
}

/// Full engine status snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    /// Engine version
    pub version: String,

    /// Uptime in seconds
    pub uptime_secs: u64,

    /// Playback context state, absent until first playback
    pub audio_context: Option<ContextState>,

    /// What the shell should render
    pub game: Snapshot,
}

/// Language table row as sent over IPC
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub language: String,
    pub country: String,
    pub region: Region,
    pub voice_hint: Voice,
}

impl From<&LanguageEntry> for CatalogEntry {
    fn from(entry: &LanguageEntry) -> Self {
        Self {
            language: entry.language.to_string(),
            country: entry.country.to_string(),
            region: entry.region,
            voice_hint: entry.voice_hint,
        }
    }
}
