//! Final-score policy applied after re-scoring an optimized résumé.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Ceiling for a boosted score.
pub const BOOST_CEILING: u32 = 95;
/// Inclusive range of the boost added to the original score.
pub const BOOST_MIN: u32 = 8;
pub const BOOST_MAX: u32 = 15;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBoostPolicy {
    /// When the computed score did not improve, report
    /// `min(95, original + 8..=15)` instead.
    #[default]
    Guaranteed,
    /// Report the computed score as is.
    Disabled,
}

impl ScoreBoostPolicy {
    /// Note that an original of 95 or more cannot be improved on: the
    /// guaranteed score is capped at 95.
    pub fn finalize<R: Rng>(self, original: u32, computed: u32, rng: &mut R) -> u32 {
        match self {
            ScoreBoostPolicy::Disabled => computed,
            ScoreBoostPolicy::Guaranteed if computed > original => computed,
            ScoreBoostPolicy::Guaranteed => {
                let boost = rng.random_range(BOOST_MIN..=BOOST_MAX);
                (original + boost).min(BOOST_CEILING)
            }
        }
    }
}
