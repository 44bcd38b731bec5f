//! Per-resource severity rollup and scoring.
//!
//! Every resource counts once, under the highest level among its issues.
//! The score deducts a fixed weight per non-OK resource, averaged over all
//! resources:
//!
//! ```text
//! score = 100 - round((10*info + 50*warning + 100*error) / resources)
//! ```

use super::{Level, Outcome, max_severity};
use serde::Serialize;

const INFO_WEIGHT: u64 = 10;
const WARN_WEIGHT: u64 = 50;
const ERROR_WEIGHT: u64 = 100;

/// Score breakpoints, highest first.
const GRADES: [(u8, &str); 5] = [(90, "A"), (80, "B"), (70, "C"), (60, "D"), (50, "E")];

/// Letter grade for a 0-100 score.
pub fn grade(score: u8) -> &'static str {
    GRADES
        .iter()
        .find(|(min, _)| score >= *min)
        .map(|(_, g)| *g)
        .unwrap_or("F")
}

/// Aggregate counts of an `Outcome` plus the derived score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub ok: usize,
    pub info: usize,
    pub warning: usize,
    pub error: usize,
    pub score: u8,
}

impl Default for Tally {
    fn default() -> Self {
        Self {
            ok: 0,
            info: 0,
            warning: 0,
            error: 0,
            score: 100,
        }
    }
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute every counter from `outcome`, discarding prior state.
    pub fn rollup(&mut self, outcome: &Outcome) -> &mut Self {
        *self = Self::from_outcome(outcome);
        self
    }

    pub fn from_outcome(outcome: &Outcome) -> Self {
        let mut tally = Self::default();
        for (_, issues) in outcome {
            match max_severity(issues) {
                Level::Ok => tally.ok += 1,
                Level::Info => tally.info += 1,
                Level::Warn => tally.warning += 1,
                Level::Error => tally.error += 1,
            }
        }
        tally.score = tally.compute_score();
        tally
    }

    pub fn total(&self) -> usize {
        self.ok + self.info + self.warning + self.error
    }

    pub fn count(&self, level: Level) -> usize {
        match level {
            Level::Ok => self.ok,
            Level::Info => self.info,
            Level::Warn => self.warning,
            Level::Error => self.error,
        }
    }

    pub fn grade(&self) -> &'static str {
        grade(self.score)
    }

    fn compute_score(&self) -> u8 {
        let total = self.total() as u64;
        if total == 0 {
            return 100;
        }
        let weighted = INFO_WEIGHT * self.info as u64
            + WARN_WEIGHT * self.warning as u64
            + ERROR_WEIGHT * self.error as u64;
        let deduction = (weighted + total / 2) / total;
        100u64.saturating_sub(deduction).min(100) as u8
    }
}
