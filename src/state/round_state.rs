//! The session record rendered by the shell

use serde::{Deserialize, Serialize};

use crate::catalog::Region;
use crate::round::{PlayType, RoundSetup, Target};

/// Hints available per round
pub const MAX_HINTS: u8 = 3;

/// Clues kept in the log
pub const MAX_CLUES: usize = 3;

/// Points charged per granted hint
pub const HINT_COST: u32 = 15;

/// Points for a correct guess
pub const CORRECT_GUESS_POINTS: u32 = 150;

/// Screens of the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    Home,
    RegionSelect,
    Playing,
    Settings,
    Results,
}

impl Default for GameMode {
    fn default() -> Self {
        Self::Home
    }
}

impl std::fmt::Display for GameMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameMode::Home => write!(f, "Home"),
            GameMode::RegionSelect => write!(f, "RegionSelect"),
            GameMode::Playing => write!(f, "Playing"),
            GameMode::Settings => write!(f, "Settings"),
            GameMode::Results => write!(f, "Results"),
        }
    }
}

/// Chosen before a Standard round. Recorded only; no rule reads it yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::Medium
    }
}

/// Round data owned by the state machine
#[derive(Debug, Clone, PartialEq)]
pub struct RoundState {
    pub mode: GameMode,
    pub play_type: PlayType,
    pub selected_region: Region,
    pub difficulty: Difficulty,
    pub target: Option<Target>,
    pub english_sentence: Option<String>,
    pub native_sentence: Option<String>,
    pub audio_payload: Option<Vec<u8>>,
    pub is_audio_playing: bool,
    /// Most recent first
    pub clues: Vec<String>,
    pub hints_remaining: u8,
    pub revealed_hints: Vec<String>,
    pub game_ended: bool,
    pub score: u32,
}

impl Default for RoundState {
    fn default() -> Self {
        Self {
            mode: GameMode::Home,
            play_type: PlayType::Standard,
            selected_region: Region::World,
            difficulty: Difficulty::Medium,
            target: None,
            english_sentence: None,
            native_sentence: None,
            audio_payload: None,
            is_audio_playing: false,
            clues: Vec::new(),
            hints_remaining: MAX_HINTS,
            revealed_hints: Vec::new(),
            game_ended: false,
            score: 0,
        }
    }
}

impl RoundState {
    /// The state a new round starts from. Difficulty and score carry over.
    pub fn begin_round(&self, setup: RoundSetup) -> Self {
        Self {
            mode: GameMode::Playing,
            play_type: setup.play_type,
            selected_region: setup.region,
            difficulty: self.difficulty,
            target: Some(setup.target),
            english_sentence: Some(setup.english_sentence),
            native_sentence: Some(setup.native_sentence),
            audio_payload: setup.audio,
            score: self.score,
            ..Self::default()
        }
    }

    pub fn has_audio(&self) -> bool {
        self.audio_payload.is_some()
    }

    /// Log an answered clue, dropping the oldest beyond the limit
    pub fn push_clue(&mut self, entry: String) {
        self.clues.insert(0, entry);
        self.clues.truncate(MAX_CLUES);
    }

    /// Position of the next hint (0-based), `None` once all are used
    pub fn next_hint_index(&self) -> Option<usize> {
        (self.hints_remaining > 0).then_some(self.revealed_hints.len())
    }

    /// Record a granted hint and charge for it
    pub fn grant_hint(&mut self, text: String) -> bool {
        if self.hints_remaining == 0 {
            return false;
        }
        self.hints_remaining -= 1;
        self.revealed_hints.push(text);
        self.score = self.score.saturating_sub(HINT_COST);
        true
    }

    /// Settle the round with the player's guess; returns whether it was right
    pub fn resolve_guess(&mut self, country: &str) -> bool {
        let correct = self
            .target
            .as_ref()
            .map(|t| t.country.to_lowercase() == country.trim().to_lowercase())
            .unwrap_or(false);

        if correct {
            self.score += CORRECT_GUESS_POINTS;
        }
        self.mode = GameMode::Results;
        self.game_ended = true;
        correct
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> RoundSetup {
        RoundSetup {
            play_type: PlayType::Standard,
            region: Region::Europe,
            target: Target {
                language: "German".to_string(),
                country: "Germany".to_string(),
            },
            english_sentence: "Good morning.".to_string(),
            native_sentence: "Guten Morgen.".to_string(),
            audio: None,
        }
    }

    fn playing() -> RoundState {
        RoundState::default().begin_round(setup())
    }

    #[test]
    fn test_begin_round_replaces_round_fields() {
        let mut prev = RoundState::default();
        prev.difficulty = Difficulty::Hard;
        prev.clues = vec!["old".to_string()];
        prev.hints_remaining = 0;
        prev.revealed_hints = vec!["a".into(), "b".into(), "c".into()];
        prev.game_ended = true;

        let state = prev.begin_round(setup());
        assert_eq!(state.mode, GameMode::Playing);
        assert_eq!(state.difficulty, Difficulty::Hard);
        assert!(state.clues.is_empty());
        assert_eq!(state.hints_remaining, MAX_HINTS);
        assert!(state.revealed_hints.is_empty());
        assert!(!state.game_ended);
        assert_eq!(state.selected_region, Region::Europe);
        assert_eq!(state.native_sentence.as_deref(), Some("Guten Morgen."));
    }

    #[test]
    fn test_clue_log_keeps_three_most_recent() {
        let mut state = playing();
        for i in 1..=4 {
            state.push_clue(format!("clue {i}"));
        }
        assert_eq!(state.clues, vec!["clue 4", "clue 3", "clue 2"]);
    }

    #[test]
    fn test_hint_accounting() {
        let mut state = playing();
        state.score = 10;

        for n in 0..MAX_HINTS {
            assert_eq!(state.next_hint_index(), Some(n as usize));
            assert!(state.grant_hint(format!("hint {n}")));
            assert_eq!(
                state.revealed_hints.len(),
                (MAX_HINTS - state.hints_remaining) as usize
            );
        }

        // Floored at zero rather than going negative
        assert_eq!(state.score, 0);
        assert_eq!(state.next_hint_index(), None);
        assert!(!state.grant_hint("extra".to_string()));
        assert_eq!(state.hints_remaining, 0);
        assert_eq!(state.revealed_hints.len(), 3);
    }

    #[test]
    fn test_guess_is_case_insensitive() {
        let mut state = playing();
        assert!(state.resolve_guess("gErMaNy"));
        assert_eq!(state.score, CORRECT_GUESS_POINTS);
        assert_eq!(state.mode, GameMode::Results);
        assert!(state.game_ended);
    }

    #[test]
    fn test_wrong_guess_keeps_score() {
        let mut state = playing();
        state.score = 40;
        assert!(!state.resolve_guess("France"));
        assert_eq!(state.score, 40);
        assert_eq!(state.mode, GameMode::Results);
    }
}
