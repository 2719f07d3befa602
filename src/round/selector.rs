//! Target selection and content gathering for new rounds

use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use time::{Date, OffsetDateTime};
use tracing::{info, warn};

use super::{PlayType, RoundSetup, Target, DAILY_RECORD_KEY};
use crate::catalog::{entries_for, LanguageEntry, Region, Voice};
use crate::content::{ContentError, ContentProvider};
use crate::store::{KeyValueStore, StoreError};

/// Source of "today" for the Daily gate
pub trait Clock: Send + Sync {
    fn today(&self) -> Date;
}

/// Current UTC calendar date
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> Date {
        OffsetDateTime::now_utc().date()
    }
}

/// Reasons a round could not be started
#[derive(Debug, Error)]
pub enum RoundError {
    #[error("daily challenge already played today")]
    DailyLimitReached,

    #[error("no languages available for region {0}")]
    NoCandidates(Region),

    #[error("content generation failed: {0}")]
    ContentGeneration(#[from] ContentError),

    #[error("daily record unavailable: {0}")]
    Store(#[from] StoreError),
}

/// Chooses targets and fetches the content for new rounds
#[derive(Clone)]
pub struct RoundSelector {
    provider: Arc<dyn ContentProvider>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    rng: Arc<Mutex<StdRng>>,
}

impl RoundSelector {
    pub fn new(
        provider: Arc<dyn ContentProvider>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            provider,
            store,
            clock,
            rng: Arc::new(Mutex::new(StdRng::from_os_rng())),
        }
    }

    /// Replace the entropy-seeded generator, for reproducible draws
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Arc::new(Mutex::new(rng));
        self
    }

    /// Set up a new round.
    ///
    /// The region filter only applies to Standard play. Daily play claims
    /// today's slot before any content is requested.
    pub async fn start_round(
        &self,
        play_type: PlayType,
        region_filter: Option<Region>,
    ) -> Result<RoundSetup, RoundError> {
        let region = self.resolve_region(play_type, region_filter)?;
        let entry = self.pick_entry(region)?;

        info!(
            %play_type,
            %region,
            language = entry.language,
            "round target selected"
        );

        let content = self
            .provider
            .generate_game_content(entry.language, entry.country)
            .await?;
        if content.english.trim().is_empty() || content.native.trim().is_empty() {
            return Err(ContentError::Malformed("empty sentence".to_string()).into());
        }

        let voice = Voice::for_language(entry.language);
        let audio = match self.provider.synthesize_speech(&content.native, voice).await {
            Ok(audio) => audio,
            Err(e) => {
                warn!(error = %e, %voice, "speech synthesis failed, round continues without audio");
                None
            }
        };

        Ok(RoundSetup {
            play_type,
            region,
            target: Target {
                language: entry.language.to_string(),
                country: entry.country.to_string(),
            },
            english_sentence: content.english,
            native_sentence: content.native,
            audio,
        })
    }

    fn resolve_region(
        &self,
        play_type: PlayType,
        region_filter: Option<Region>,
    ) -> Result<Region, RoundError> {
        match play_type {
            PlayType::Standard => Ok(region_filter.unwrap_or(Region::World)),
            PlayType::Daily => self.claim_daily(),
            PlayType::Random => Ok(Region::World),
        }
    }

    /// Enforce the once-per-day rule and draw the Daily region
    fn claim_daily(&self) -> Result<Region, RoundError> {
        let today = self.clock.today().to_string();

        if self.store.get(DAILY_RECORD_KEY)?.as_deref() == Some(today.as_str()) {
            info!(%today, "daily challenge already played");
            return Err(RoundError::DailyLimitReached);
        }
        self.store.set(DAILY_RECORD_KEY, &today)?;

        let region = Region::CONCRETE[self.random_index(Region::CONCRETE.len())];
        Ok(region)
    }

    fn pick_entry(&self, region: Region) -> Result<&'static LanguageEntry, RoundError> {
        let candidates = entries_for(region);
        if candidates.is_empty() {
            return Err(RoundError::NoCandidates(region));
        }
        Ok(candidates[self.random_index(candidates.len())])
    }

    fn random_index(&self, len: usize) -> usize {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.random_range(0..len)
    }
}
