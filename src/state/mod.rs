//! Game state machine
//!
//! Five screens cycle Home -> RegionSelect -> Playing -> Results -> Home,
//! with Settings as a side branch of Home:
//! - Home: choose a play type or open settings
//! - RegionSelect: pick region and difficulty for Standard play
//! - Playing: listen, ask clues, take hints, guess
//! - Results: answer revealed until the player returns to the hub

mod machine;
mod round_state;
mod snapshot;

pub use machine::{Action, ActionOutcome, EngineCommand, GameMachine};
pub use round_state::GameMode;
pub use snapshot::Snapshot;
