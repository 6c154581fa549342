//! Accept/reject rule for a secondary agent's candidate.
//!
//! A candidate without a non-empty route is rejected.  Otherwise:
//!
//! 1. if it carries an `improvement_score`, accept iff the score is at least
//!    [`MIN_IMPROVEMENT_SCORE`];
//! 2. else, if both sides report a positive `duration_s`, accept iff
//!    `candidate < base × DURATION_RATIO`;
//! 3. else reject.

use std::fmt;

use crate::{RouteMetrics, SecondaryAgentResponse};

pub const MIN_IMPROVEMENT_SCORE: f64 = 0.02;
pub const DURATION_RATIO:        f64 = 0.99;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Accepted on its improvement score.
    ImprovementScore,
    /// Accepted on a faster duration.
    FasterDuration,
    NoRoute,
    /// Score present but below the minimum.
    LowImprovement,
    /// Duration not at least 1% faster.
    NotFaster,
    /// Neither a score nor a comparable pair of durations.
    NoEvidence,
}

impl Verdict {
    #[inline]
    pub fn is_accepted(self) -> bool {
        matches!(self, Verdict::ImprovementScore | Verdict::FasterDuration)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verdict::ImprovementScore => "improvement score at or above minimum",
            Verdict::FasterDuration   => "duration at least 1% faster",
            Verdict::NoRoute          => "no route",
            Verdict::LowImprovement   => "improvement score below minimum",
            Verdict::NotFaster        => "duration not faster",
            Verdict::NoEvidence       => "no improvement score or comparable duration",
        })
    }
}

/// Judge `candidate` against the base result's metrics.
pub fn judge(base: &RouteMetrics, candidate: &SecondaryAgentResponse) -> Verdict {
    if candidate.candidate_route().is_none() {
        return Verdict::NoRoute;
    }
    if let Some(score) = candidate.improvement_score {
        return if score >= MIN_IMPROVEMENT_SCORE {
            Verdict::ImprovementScore
        } else {
            Verdict::LowImprovement
        };
    }
    let cand_duration = candidate.metrics.as_ref().and_then(|m| m.duration_s);
    match (base.duration_s, cand_duration) {
        (Some(base_s), Some(cand_s)) if base_s > 0.0 && cand_s > 0.0 => {
            if cand_s < base_s * DURATION_RATIO {
                Verdict::FasterDuration
            } else {
                Verdict::NotFaster
            }
        }
        _ => Verdict::NoEvidence,
    }
}
