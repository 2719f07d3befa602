//! Render view of the game state
//!
//! The shell renders exclusively from this view. The target and the native
//! sentence stay hidden until the round is over.

use serde::{Deserialize, Serialize};

use super::round_state::{Difficulty, GameMode, RoundState};
use crate::catalog::Region;
use crate::round::PlayType;

/// Display preferences, independent of round data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub dark_mode: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self { dark_mode: true }
    }
}

/// Requests currently suspending a control in the shell
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyFlags {
    /// A round is being set up
    pub loading: bool,
    /// A clue question is with the oracle
    pub asking: bool,
    /// A hint is being generated
    pub getting_hint: bool,
}

/// Revealed answer, only present on the Results screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub language: String,
    pub country: String,
    pub native_sentence: Option<String>,
}

/// Serializable view of everything the shell draws
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub mode: GameMode,
    pub play_type: PlayType,
    pub selected_region: Region,
    pub difficulty: Difficulty,
    pub english_sentence: Option<String>,
    pub audio_available: bool,
    pub is_audio_playing: bool,
    pub clues: Vec<String>,
    pub hints_remaining: u8,
    pub revealed_hints: Vec<String>,
    pub game_ended: bool,
    pub score: u32,
    pub answer: Option<Answer>,
    pub busy: BusyFlags,
    pub preferences: Preferences,
}

impl Snapshot {
    pub fn capture(state: &RoundState, busy: BusyFlags, preferences: Preferences) -> Self {
        let answer = match (&state.target, state.mode) {
            (Some(target), GameMode::Results) => Some(Answer {
                language: target.language.clone(),
                country: target.country.clone(),
                native_sentence: state.native_sentence.clone(),
            }),
            _ => None,
        };

        Self {
            mode: state.mode,
            play_type: state.play_type,
            selected_region: state.selected_region,
            difficulty: state.difficulty,
            english_sentence: state.english_sentence.clone(),
            audio_available: state.has_audio(),
            is_audio_playing: state.is_audio_playing,
            clues: state.clues.clone(),
            hints_remaining: state.hints_remaining,
            revealed_hints: state.revealed_hints.clone(),
            game_ended: state.game_ended,
            score: state.score,
            answer,
            busy,
            preferences,
        }
    }
}
