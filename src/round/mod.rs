//! Round setup
//!
//! Picks the target language for a new round and gathers its generated
//! content before the state machine adopts it.

mod selector;

pub use selector::{RoundError, RoundSelector, SystemClock};

use serde::{Deserialize, Serialize};

use crate::catalog::Region;

/// Record key holding the date of the last Daily round
pub const DAILY_RECORD_KEY: &str = "lastDailyPlayed";

/// How a round was started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayType {
    /// Player-chosen region
    Standard,
    /// Random region, at most once per calendar day
    Daily,
    /// Whole world
    Random,
}

impl Default for PlayType {
    fn default() -> Self {
        Self::Standard
    }
}

impl std::fmt::Display for PlayType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayType::Standard => write!(f, "Standard"),
            PlayType::Daily => write!(f, "Daily"),
            PlayType::Random => write!(f, "Random"),
        }
    }
}

/// The language/country pair the player has to find
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub language: String,
    pub country: String,
}

/// Everything a new round needs, assembled before the round starts
#[derive(Debug, Clone)]
pub struct RoundSetup {
    pub play_type: PlayType,
    pub region: Region,
    pub target: Target,
    pub english_sentence: String,
    pub native_sentence: String,
    /// Raw PCM16 speech, absent when synthesis failed
    pub audio: Option<Vec<u8>>,
}
