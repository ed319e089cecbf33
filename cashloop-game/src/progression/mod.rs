//! Chapters, their unlock predicates, and star progress.
//!
//! Unlocks are never stored: each read re-evaluates the predicate against the
//! current ledger, so a chapter opens as soon as the player has done the thing
//! it teaches about.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::ledger::Ledger;

pub mod quiz;
pub use quiz::{QuizBank, QuizBankError, QuizQuestion, QuizResult, QuizSession, QuizStep};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterId {
    Budgeting,
    Saving,
    Bank,
    Interest,
    Loans,
    Repay,
    Scams,
}

impl ChapterId {
    pub const ALL: [Self; 7] = [
        Self::Budgeting,
        Self::Saving,
        Self::Bank,
        Self::Interest,
        Self::Loans,
        Self::Repay,
        Self::Scams,
    ];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Budgeting => "budgeting",
            Self::Saving => "saving",
            Self::Bank => "bank",
            Self::Interest => "interest",
            Self::Loans => "loans",
            Self::Repay => "repay",
            Self::Scams => "scams",
        }
    }

    #[must_use]
    pub fn is_unlocked(self, ledger: &Ledger) -> bool {
        let stats = ledger.stats();
        match self {
            Self::Budgeting | Self::Saving => true,
            Self::Bank => ledger.wealth() > 0,
            Self::Interest => stats.total_interest_earned > 0,
            Self::Loans => !stats.loans_history.is_empty(),
            Self::Repay => stats.any_loan_repaid(),
            Self::Scams => stats.scams_encountered > 0,
        }
    }
}

impl fmt::Display for ChapterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ChapterId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|chapter| chapter.key() == s)
            .ok_or(())
    }
}

/// Persisted result of the latest quiz completion for one chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterProgress {
    pub stars: u8,
    pub completed_at: DateTime<Utc>,
}

/// Chapter row for menus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterStatus {
    pub chapter: ChapterId,
    pub unlocked: bool,
    pub progress: Option<ChapterProgress>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressBook {
    chapters: BTreeMap<ChapterId, ChapterProgress>,
}

impl ProgressBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, chapter: ChapterId) -> Option<&ChapterProgress> {
        self.chapters.get(&chapter)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChapterId, &ChapterProgress)> {
        self.chapters.iter()
    }

    /// Store `progress` unless an equal or later completion is already held.
    /// Returns whether the record changed.
    pub fn record(&mut self, chapter: ChapterId, progress: ChapterProgress) -> bool {
        match self.chapters.get(&chapter) {
            Some(existing) if existing.completed_at >= progress.completed_at => {
                log::debug!(
                    "kept newer {chapter} progress from {}",
                    existing.completed_at
                );
                false
            }
            _ => {
                self.chapters.insert(chapter, progress);
                true
            }
        }
    }

    #[must_use]
    pub fn total_stars(&self) -> u32 {
        self.chapters.values().map(|p| u32::from(p.stars)).sum()
    }

    #[must_use]
    pub fn statuses(&self, ledger: &Ledger) -> Vec<ChapterStatus> {
        ChapterId::ALL
            .into_iter()
            .map(|chapter| ChapterStatus {
                chapter,
                unlocked: chapter.is_unlocked(ledger),
                progress: self.get(chapter).copied(),
            })
            .collect()
    }
}

/// Source of completion timestamps.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant, for tests and replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
