//! Events module for game state transitions
//!
//! Structured events broadcast by the game machine so subscribed shells can
//! react without polling.

use serde::{Deserialize, Serialize};

use crate::catalog::Region;
use crate::round::PlayType;
use crate::state::GameMode;

/// Events emitted by the game machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// The screen changed
    ModeChanged {
        from: GameMode,
        to: GameMode,
        /// Milliseconds spent in the previous mode
        duration_ms: u64,
    },

    /// A new round was adopted
    RoundStarted {
        play_type: PlayType,
        region: Region,
        audio_available: bool,
    },

    /// Round setup failed; the mode did not change
    RoundFailed { reason: String },

    /// Daily challenge refused for today
    DailyLimitReached,

    /// A clue was added to the log
    ClueAdded { entry: String },

    /// The oracle judged a question too direct
    ClueRejected,

    /// A hint was granted and paid for
    HintRevealed {
        hint: String,
        hints_remaining: u8,
        score: u32,
    },

    /// Speech playback started
    AudioStarted { duration_ms: u64 },

    /// Speech playback reached its end
    AudioFinished,

    /// The player committed a guess
    GuessResolved { correct: bool, score: u32 },

    /// Display preferences changed
    PreferencesChanged { dark_mode: bool },
}

impl std::fmt::Display for GameEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameEvent::ModeChanged { from, to, duration_ms } => {
                write!(f, "MODE_CHANGED ({} -> {}, {}ms)", from, to, duration_ms)
            }
            GameEvent::RoundStarted { play_type, region, .. } => {
                write!(f, "ROUND_STARTED ({}, {})", play_type, region)
            }
            GameEvent::RoundFailed { reason } => write!(f, "ROUND_FAILED ({})", reason),
            GameEvent::DailyLimitReached => write!(f, "DAILY_LIMIT_REACHED"),
            GameEvent::ClueAdded { .. } => write!(f, "CLUE_ADDED"),
            GameEvent::ClueRejected => write!(f, "CLUE_REJECTED"),
            GameEvent::HintRevealed { hints_remaining, .. } => {
                write!(f, "HINT_REVEALED ({} left)", hints_remaining)
            }
            GameEvent::AudioStarted { duration_ms } => {
                write!(f, "AUDIO_STARTED ({}ms)", duration_ms)
            }
            GameEvent::AudioFinished => write!(f, "AUDIO_FINISHED"),
            GameEvent::GuessResolved { correct, score } => {
                write!(f, "GUESS_RESOLVED (correct={}, score={})", correct, score)
            }
            GameEvent::PreferencesChanged { dark_mode } => {
                write!(f, "PREFERENCES_CHANGED (dark_mode={})", dark_mode)
            }
        }
    }
}
