//! Core game machine implementation
//!
//! One task owns the [`RoundState`] and applies every transition. Work that
//! needs the content service or the audio clock runs on spawned tasks whose
//! completions come back through the same loop, tagged with the round
//! generation they were issued under.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use super::round_state::{Difficulty, GameMode, RoundState};
use super::snapshot::{BusyFlags, Preferences, Snapshot};
use crate::audio::{AudioEngine, ContextState};
use crate::catalog::Region;
use crate::content::{ClueReply, ContentError, ContentProvider};
use crate::events::GameEvent;
use crate::round::{PlayType, RoundError, RoundSelector, RoundSetup};

/// Player actions the shell can trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    ChooseStandard,
    ChooseDaily,
    ChooseRandom,
    OpenSettings,
    CloseSettings,
    ToggleDarkMode,
    PickRegion { region: Region },
    PickDifficulty { difficulty: Difficulty },
    ConfirmStart,
    PlayAudio,
    AskClue { question: String },
    RequestHint,
    SelectCountry { country: String },
    ReturnToHub,
}

/// Why an action had no effect, or what the player should be told
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "notice", rename_all = "snake_case")]
pub enum Notice {
    /// The action does not exist on this screen
    NotAvailable { mode: GameMode },
    /// The same kind of request is still in flight
    Busy,
    DailyLimitReached,
    /// Standard play needs a concrete region
    StartDisabled,
    RoundFailed { reason: String },
    AudioUnavailable,
    AudioPlaybackFailed { reason: String },
    /// The oracle found the question too direct
    AskDifferently,
    EmptyQuestion,
    OracleUnavailable,
    HintUnavailable,
    NoHintsLeft,
    /// The round the request belonged to is over
    Superseded,
}

/// Answer to an action: an optional notice and the resulting view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub notice: Option<Notice>,
    pub snapshot: Snapshot,
}

/// Commands accepted by the engine loop
#[derive(Debug)]
pub enum EngineCommand {
    Act {
        action: Action,
        reply: oneshot::Sender<ActionOutcome>,
    },
    Snapshot {
        reply: oneshot::Sender<Snapshot>,
    },
    /// Current round's speech, if any
    Audio {
        reply: oneshot::Sender<Option<Vec<u8>>>,
    },
    /// Playback context state, `None` before first use
    AudioContext {
        reply: oneshot::Sender<Option<ContextState>>,
    },
}

type Responder = Option<oneshot::Sender<ActionOutcome>>;

/// Results of spawned work, applied back on the engine loop
enum Completion {
    RoundReady {
        play_type: PlayType,
        result: Result<RoundSetup, RoundError>,
        reply: Responder,
    },
    ClueAnswered {
        generation: u64,
        question: String,
        result: Result<ClueReply, ContentError>,
        reply: Responder,
    },
    CulturalHint {
        generation: u64,
        result: Result<String, ContentError>,
        reply: Responder,
    },
    PlaybackFinished {
        generation: u64,
    },
}

/// The machine that owns the round and applies transitions
pub struct GameMachine {
    state: RoundState,
    preferences: Preferences,
    busy: BusyFlags,
    /// Bumped whenever the round state is replaced
    generation: u64,
    mode_entered_at: Instant,
    selector: RoundSelector,
    provider: Arc<dyn ContentProvider>,
    audio: Arc<AudioEngine>,
    event_tx: broadcast::Sender<GameEvent>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
    in_flight: usize,
}

impl GameMachine {
    pub fn new(
        selector: RoundSelector,
        provider: Arc<dyn ContentProvider>,
        audio: Arc<AudioEngine>,
        event_tx: broadcast::Sender<GameEvent>,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        Self {
            state: RoundState::default(),
            preferences: Preferences::default(),
            busy: BusyFlags::default(),
            generation: 0,
            mode_entered_at: Instant::now(),
            selector,
            provider,
            audio,
            event_tx,
            completion_tx,
            completion_rx,
            in_flight: 0,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.state, self.busy, self.preferences)
    }

    /// Run the engine loop until every command sender is gone
    pub async fn run(&mut self, mut command_rx: mpsc::Receiver<EngineCommand>) {
        info!("game engine started in Home mode");

        loop {
            let next = tokio::select! {
                command = command_rx.recv() => match command {
                    Some(command) => Next::Command(command),
                    None => break,
                },
                Some(completion) = self.completion_rx.recv() => Next::Completion(completion),
            };

            match next {
                Next::Command(command) => self.handle_command(command),
                Next::Completion(completion) => self.handle_completion(completion),
            }
        }

        info!("game engine stopped");
    }

    fn handle_command(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::Act { action, reply } => self.dispatch(action, Some(reply)),
            EngineCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            EngineCommand::Audio { reply } => {
                let payload = match self.state.mode {
                    GameMode::Playing => self.state.audio_payload.clone(),
                    _ => None,
                };
                let _ = reply.send(payload);
            }
            EngineCommand::AudioContext { reply } => {
                let _ = reply.send(self.audio.context_state());
            }
        }
    }

    /// Apply a player action. Actions that need the content service answer
    /// `reply` once their call resolves.
    fn dispatch(&mut self, action: Action, reply: Responder) {
        debug!(?action, mode = %self.state.mode, "action received");

        if self.busy.loading {
            return self.respond(reply, Some(Notice::Busy));
        }

        match (self.state.mode, action) {
            (GameMode::Home, Action::ChooseStandard) => {
                self.replace_state(RoundState {
                    mode: GameMode::RegionSelect,
                    play_type: PlayType::Standard,
                    difficulty: self.state.difficulty,
                    ..RoundState::default()
                });
                self.respond(reply, None);
            }
            (GameMode::Home, Action::ChooseDaily) => {
                self.start_round(PlayType::Daily, None, reply);
            }
            (GameMode::Home, Action::ChooseRandom) => {
                self.start_round(PlayType::Random, None, reply);
            }
            (GameMode::Home, Action::OpenSettings) => {
                self.transition_to(GameMode::Settings);
                self.respond(reply, None);
            }
            (GameMode::Settings, Action::CloseSettings) => {
                self.transition_to(GameMode::Home);
                self.respond(reply, None);
            }
            (GameMode::Settings, Action::ToggleDarkMode) => {
                self.preferences.dark_mode = !self.preferences.dark_mode;
                self.emit(GameEvent::PreferencesChanged {
                    dark_mode: self.preferences.dark_mode,
                });
                self.respond(reply, None);
            }
            (GameMode::RegionSelect, Action::PickRegion { region }) => {
                self.state.selected_region = region;
                self.respond(reply, None);
            }
            (GameMode::RegionSelect, Action::PickDifficulty { difficulty }) => {
                self.state.difficulty = difficulty;
                self.respond(reply, None);
            }
            (GameMode::RegionSelect, Action::ConfirmStart) => {
                let region = self.state.selected_region;
                if region.is_world() {
                    return self.respond(reply, Some(Notice::StartDisabled));
                }
                self.start_round(PlayType::Standard, Some(region), reply);
            }
            (GameMode::RegionSelect | GameMode::Results, Action::ReturnToHub) => {
                self.replace_state(RoundState::default());
                self.audio.suspend();
                self.respond(reply, None);
            }
            (GameMode::Playing, Action::PlayAudio) => self.play_audio(reply),
            (GameMode::Playing, Action::AskClue { question }) => self.ask_clue(question, reply),
            (GameMode::Playing, Action::RequestHint) => self.request_hint(reply),
            (GameMode::Playing, Action::SelectCountry { country }) => {
                self.select_country(&country, reply)
            }
            (mode, action) => {
                debug!(?action, %mode, "action not available in this mode");
                self.respond(reply, Some(Notice::NotAvailable { mode }));
            }
        }
    }

    fn start_round(&mut self, play_type: PlayType, region: Option<Region>, reply: Responder) {
        self.busy.loading = true;
        let selector = self.selector.clone();

        self.spawn(async move {
            let result = selector.start_round(play_type, region).await;
            Completion::RoundReady {
                play_type,
                result,
                reply,
            }
        });
    }

    fn play_audio(&mut self, reply: Responder) {
        if self.state.is_audio_playing {
            return self.respond(reply, Some(Notice::Busy));
        }
        let Some(payload) = self.state.audio_payload.as_deref() else {
            return self.respond(reply, Some(Notice::AudioUnavailable));
        };

        match self.audio.start(payload) {
            Ok(playback) => {
                self.state.is_audio_playing = true;
                self.emit(GameEvent::AudioStarted {
                    duration_ms: playback.duration().as_millis() as u64,
                });

                let generation = self.generation;
                self.spawn(async move {
                    playback.finished().await;
                    Completion::PlaybackFinished { generation }
                });
                self.respond(reply, None);
            }
            Err(e) => {
                warn!(error = %e, "speech playback failed");
                self.state.is_audio_playing = false;
                self.respond(
                    reply,
                    Some(Notice::AudioPlaybackFailed {
                        reason: e.to_string(),
                    }),
                );
            }
        }
    }

    fn ask_clue(&mut self, question: String, reply: Responder) {
        let question = question.trim().to_string();
        if question.is_empty() {
            return self.respond(reply, Some(Notice::EmptyQuestion));
        }
        if self.busy.asking {
            return self.respond(reply, Some(Notice::Busy));
        }
        let Some(target) = self.state.target.clone() else {
            return self.respond(reply, Some(Notice::NotAvailable { mode: self.state.mode }));
        };

        self.busy.asking = true;
        let provider = Arc::clone(&self.provider);
        let generation = self.generation;

        self.spawn(async move {
            let result = provider
                .ask_clue(&question, &target.language, &target.country)
                .await;
            Completion::ClueAnswered {
                generation,
                question,
                result,
                reply,
            }
        });
    }

    fn request_hint(&mut self, reply: Responder) {
        let Some(index) = self.state.next_hint_index() else {
            return self.respond(reply, Some(Notice::NoHintsLeft));
        };
        if self.busy.getting_hint {
            return self.respond(reply, Some(Notice::Busy));
        }
        let Some(target) = self.state.target.clone() else {
            return self.respond(reply, Some(Notice::NotAvailable { mode: self.state.mode }));
        };

        match index {
            0 => {
                let initial = target.country.chars().next().map(String::from).unwrap_or_default();
                self.grant_hint(format!("Starts with \"{initial}\""));
                self.respond(reply, None);
            }
            1 => {
                self.busy.getting_hint = true;
                let provider = Arc::clone(&self.provider);
                let generation = self.generation;

                self.spawn(async move {
                    let result = provider
                        .cultural_hint(&target.language, &target.country)
                        .await;
                    Completion::CulturalHint {
                        generation,
                        result,
                        reply,
                    }
                });
            }
            _ => {
                self.grant_hint(format!(
                    "It's specifically within the {} region boundaries.",
                    self.state.selected_region
                ));
                self.respond(reply, None);
            }
        }
    }

    fn select_country(&mut self, country: &str, reply: Responder) {
        if country.trim().eq_ignore_ascii_case(Region::World.as_str()) {
            debug!("map closed without a guess");
            return self.respond(reply, None);
        }

        let from = self.state.mode;
        let correct = self.state.resolve_guess(country);
        self.note_mode_change(from);

        info!(correct, score = self.state.score, "guess resolved");
        self.emit(GameEvent::GuessResolved {
            correct,
            score: self.state.score,
        });
        self.respond(reply, None);
    }

    fn grant_hint(&mut self, hint: String) {
        if self.state.grant_hint(hint.clone()) {
            info!(
                hints_remaining = self.state.hints_remaining,
                score = self.state.score,
                "hint granted"
            );
            self.emit(GameEvent::HintRevealed {
                hint,
                hints_remaining: self.state.hints_remaining,
                score: self.state.score,
            });
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        self.in_flight = self.in_flight.saturating_sub(1);

        match completion {
            Completion::RoundReady {
                play_type,
                result,
                reply,
            } => {
                self.busy.loading = false;
                match result {
                    Ok(setup) => {
                        let region = setup.region;
                        let next = self.state.begin_round(setup);
                        self.replace_state(next);
                        self.emit(GameEvent::RoundStarted {
                            play_type,
                            region,
                            audio_available: self.state.has_audio(),
                        });
                        self.respond(reply, None);
                    }
                    Err(RoundError::DailyLimitReached) => {
                        self.emit(GameEvent::DailyLimitReached);
                        self.respond(reply, Some(Notice::DailyLimitReached));
                    }
                    Err(e) => {
                        warn!(error = %e, %play_type, "round start failed");
                        let reason = e.to_string();
                        self.emit(GameEvent::RoundFailed {
                            reason: reason.clone(),
                        });
                        self.respond(reply, Some(Notice::RoundFailed { reason }));
                    }
                }
            }

            Completion::ClueAnswered {
                generation,
                question,
                result,
                reply,
            } => {
                if !self.accepts(generation) {
                    return self.respond(reply, Some(Notice::Superseded));
                }
                self.busy.asking = false;
                if self.state.mode != GameMode::Playing {
                    return self.respond(reply, Some(Notice::Superseded));
                }

                match result {
                    Ok(ClueReply::Answer(answer)) => {
                        let entry = format!("Q: {question}\nA: {answer}");
                        self.state.push_clue(entry.clone());
                        self.emit(GameEvent::ClueAdded { entry });
                        self.respond(reply, None);
                    }
                    Ok(ClueReply::Rejected) => {
                        debug!("clue question rejected as too direct");
                        self.emit(GameEvent::ClueRejected);
                        self.respond(reply, Some(Notice::AskDifferently));
                    }
                    Err(e) => {
                        warn!(error = %e, "clue oracle failed");
                        self.respond(reply, Some(Notice::OracleUnavailable));
                    }
                }
            }

            Completion::CulturalHint {
                generation,
                result,
                reply,
            } => {
                if !self.accepts(generation) {
                    return self.respond(reply, Some(Notice::Superseded));
                }
                self.busy.getting_hint = false;
                if self.state.mode != GameMode::Playing {
                    return self.respond(reply, Some(Notice::Superseded));
                }

                match result {
                    Ok(hint) => {
                        self.grant_hint(hint);
                        self.respond(reply, None);
                    }
                    Err(e) => {
                        warn!(error = %e, "cultural hint failed");
                        self.respond(reply, Some(Notice::HintUnavailable));
                    }
                }
            }

            Completion::PlaybackFinished { generation } => {
                if self.accepts(generation) && self.state.is_audio_playing {
                    self.state.is_audio_playing = false;
                    self.emit(GameEvent::AudioFinished);
                }
            }
        }
    }

    /// Whether a completion still belongs to the current round
    fn accepts(&self, generation: u64) -> bool {
        if generation != self.generation {
            debug!(
                generation,
                current = self.generation,
                "discarding stale completion"
            );
            return false;
        }
        true
    }

    fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        self.in_flight += 1;
        let completion_tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let _ = completion_tx.send(task.await);
        });
    }

    /// Swap in a new round state wholesale
    fn replace_state(&mut self, next: RoundState) {
        let from = self.state.mode;
        self.state = next;
        self.generation += 1;
        self.busy.asking = false;
        self.busy.getting_hint = false;
        self.note_mode_change(from);
    }

    fn transition_to(&mut self, mode: GameMode) {
        let from = self.state.mode;
        self.state.mode = mode;
        self.note_mode_change(from);
    }

    fn note_mode_change(&mut self, from: GameMode) {
        let to = self.state.mode;
        if from == to {
            return;
        }

        let duration_ms = self.mode_entered_at.elapsed().as_millis() as u64;
        info!(
            from = %from,
            to = %to,
            duration_ms = duration_ms,
            "mode transition"
        );
        self.mode_entered_at = Instant::now();
        self.emit(GameEvent::ModeChanged {
            from,
            to,
            duration_ms,
        });
    }

    fn emit(&self, event: GameEvent) {
        debug!(?event, "emitting game event");
        let _ = self.event_tx.send(event);
    }

    fn respond(&self, reply: Responder, notice: Option<Notice>) {
        if let Some(notice) = &notice {
            debug!(?notice, "action answered with notice");
        }
        if let Some(reply) = reply {
            let _ = reply.send(ActionOutcome {
                notice,
                snapshot: self.snapshot(),
            });
        }
    }
}

enum Next {
    Command(EngineCommand),
    Completion(Completion),
}

#[cfg(test)]
impl GameMachine {
    fn state(&self) -> &RoundState {
        &self.state
    }

    /// Apply an action and wait for its answer, processing completions
    async fn perform(&mut self, action: Action) -> ActionOutcome {
        let (tx, mut rx) = oneshot::channel();
        self.dispatch(action, Some(tx));

        loop {
            match rx.try_recv() {
                Ok(outcome) => return outcome,
                Err(oneshot::error::TryRecvError::Closed) => panic!("action dropped its reply"),
                Err(oneshot::error::TryRecvError::Empty) => {}
            }
            let completion = self
                .completion_rx
                .recv()
                .await
                .expect("completion channel closed");
            self.handle_completion(completion);
        }
    }

    /// Fire an action without waiting for its answer
    fn trigger(&mut self, action: Action) -> oneshot::Receiver<ActionOutcome> {
        let (tx, rx) = oneshot::channel();
        self.dispatch(action, Some(tx));
        rx
    }

    /// Process completions until nothing is in flight
    async fn drain(&mut self) {
        while self.in_flight > 0 {
            let completion = self
                .completion_rx
                .recv()
                .await
                .expect("completion channel closed");
            self.handle_completion(completion);
        }
    }
}
