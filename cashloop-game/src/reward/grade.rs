//! Letter grade shown on the recap stage.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ledger::LedgerStats;

const AVOIDANCE_WEIGHT: u64 = 50;
const SAVINGS_WEIGHT: u64 = 50;
/// Coins saved per savings point.
const SAVINGS_PER_POINT: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
}

impl Grade {
    #[must_use]
    pub const fn from_score(score: u32) -> Self {
        match score {
            85.. => Self::A,
            70..=84 => Self::B,
            50..=69 => Self::C,
            _ => Self::D,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        };
        f.write_str(letter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecapGrade {
    pub grade: Grade,
    pub score: u32,
    pub avoidance_points: u32,
    pub savings_points: u32,
}

/// Grade a player purely from lifetime stats.
#[must_use]
pub fn recap_grade(stats: &LedgerStats) -> RecapGrade {
    let avoidance = if stats.scams_encountered == 0 {
        AVOIDANCE_WEIGHT
    } else {
        u64::from(stats.scams_avoided) * AVOIDANCE_WEIGHT / u64::from(stats.scams_encountered)
    };
    let savings = (stats.total_saved / SAVINGS_PER_POINT).min(SAVINGS_WEIGHT);
    let avoidance_points = u32::try_from(avoidance).unwrap_or(0);
    let savings_points = u32::try_from(savings).unwrap_or(0);
    let score = avoidance_points + savings_points;
    RecapGrade {
        grade: Grade::from_score(score),
        score,
        avoidance_points,
        savings_points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(encountered: u32, avoided: u32, saved: u64) -> LedgerStats {
        LedgerStats {
            total_saved: saved,
            scams_encountered: encountered,
            scams_avoided: avoided,
            ..LedgerStats::default()
        }
    }

    #[test]
    fn perfect_record_earns_a() {
        let recap = recap_grade(&stats(4, 4, 900));
        assert_eq!(recap.score, 100);
        assert_eq!(recap.grade, Grade::A);
    }

    #[test]
    fn no_scams_counts_as_full_avoidance() {
        let recap = recap_grade(&stats(0, 0, 200));
        assert_eq!(recap.avoidance_points, 50);
        assert_eq!(recap.savings_points, 20);
        assert_eq!(recap.grade, Grade::B);
    }

    #[test]
    fn grade_boundaries() {
        assert_eq!(Grade::from_score(85), Grade::A);
        assert_eq!(Grade::from_score(84), Grade::B);
        assert_eq!(Grade::from_score(70), Grade::B);
        assert_eq!(Grade::from_score(69), Grade::C);
        assert_eq!(Grade::from_score(50), Grade::C);
        assert_eq!(Grade::from_score(49), Grade::D);
    }

    #[test]
    fn falling_for_every_scam_without_saving_is_d() {
        let recap = recap_grade(&stats(3, 0, 40));
        assert_eq!(recap.score, 4);
        assert_eq!(recap.grade, Grade::D);
    }
}
