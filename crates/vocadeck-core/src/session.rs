//! Persistent study session.
//!
//! [`StudySession`] owns a loaded [`Store`] together with its file, a random
//! source and a clock, and writes the store back after every mutation.

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::SessionConfig;
use crate::corpus::load_corpus_directory;
use crate::migration::UpgradeReport;
use crate::model::{Direction, Rating};
use crate::persist::StoreFile;
use crate::scheduler::{self, NewDaySummary, Pick, RateOutcome};
use crate::store::{DeckCounts, Store};
use crate::sync::{reconcile, SyncReport};

/// Source of "today" and "now".
pub trait Clock {
    fn today(&self) -> NaiveDate;
    /// Seconds since the Unix epoch.
    fn now(&self) -> f64;
}

/// Wall clock: local calendar date, UTC timestamps.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn now(&self) -> f64 {
        Utc::now().timestamp_millis() as f64 / 1000.0
    }
}

/// A clock stuck at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    pub instant: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self { instant }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.instant.date_naive()
    }

    fn now(&self) -> f64 {
        self.instant.timestamp_millis() as f64 / 1000.0
    }
}

pub struct StudySession<R = StdRng, C = SystemClock> {
    file: StoreFile,
    store: Store,
    upgraded: Option<UpgradeReport>,
    repaired: bool,
    rng: R,
    clock: C,
}

impl StudySession {
    /// Open the store at `path` with an entropy-seeded generator and the wall clock.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with(path, StdRng::from_os_rng(), SystemClock)
    }
}

impl<R: Rng, C: Clock> StudySession<R, C> {
    /// Open the store at `path`. A store repaired on load is written back
    /// straight away.
    pub fn open_with(path: &Path, rng: R, clock: C) -> Result<Self> {
        let file = StoreFile::new(path);
        let loaded = file.load()?;
        if loaded.repaired {
            file.save(&loaded.store)?;
        }
        Ok(Self {
            file,
            store: loaded.store,
            upgraded: loaded.upgraded,
            repaired: loaded.repaired,
            rng,
            clock,
        })
    }

    /// Set when opening upgraded a legacy store.
    pub fn upgraded(&self) -> Option<&UpgradeReport> {
        self.upgraded.as_ref()
    }

    /// `true` when opening had to repair a broken store.
    pub fn repaired(&self) -> bool {
        self.repaired
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn counts(&self) -> DeckCounts {
        self.store.counts()
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Reconcile the store with the corpus under `corpus_dir` and save.
    pub fn sync(&mut self, corpus_dir: &Path) -> Result<SyncReport> {
        let parsed = load_corpus_directory(corpus_dir)?;
        let report = reconcile(&mut self.store, parsed);
        self.file.save(&self.store)?;
        Ok(report)
    }

    /// Assemble a new day's session and save.
    pub fn assemble_session(&mut self, config: &SessionConfig) -> Result<NewDaySummary> {
        let today = self.clock.today();
        let summary = scheduler::assemble_session(&mut self.store, config, today);
        self.file.save(&self.store)?;
        Ok(summary)
    }

    /// Pick the next card and direction. Saves only if stale cards were retired.
    pub fn pick_presentation(&mut self) -> Result<Pick> {
        let deck_before = self.store.study_deck.len();
        let pick = scheduler::pick_presentation(&mut self.store, &mut self.rng);
        if self.store.study_deck.len() != deck_before {
            self.file.save(&self.store)?;
        }
        Ok(pick)
    }

    /// Apply a rating and save. Nothing is written when the rating is rejected.
    pub fn apply_rating(
        &mut self,
        id: &str,
        direction: Direction,
        rating: Rating,
    ) -> Result<RateOutcome> {
        let now = self.clock.now();
        let outcome = scheduler::apply_rating(&mut self.store, id, direction, rating, now)?;
        self.file.save(&self.store)?;
        Ok(outcome)
    }

    pub fn apply_rating_symbol(
        &mut self,
        id: &str,
        direction: Direction,
        symbol: &str,
    ) -> Result<RateOutcome> {
        let rating: Rating = symbol.parse()?;
        self.apply_rating(id, direction, rating)
    }
}
