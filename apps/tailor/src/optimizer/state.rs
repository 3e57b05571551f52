//! Explicit states of one optimize run.
//!
//! The orchestrator moves strictly forward through
//! `Scored → Validated → Mutated → Rescored → Finalized`; `advance` refuses
//! anything else so a run can never skip the rescoring step or finalize twice.

use tracing::info;

use crate::errors::AppError;
use crate::matching::ScoreBreakdown;
use crate::models::OptimizedArtifact;
use crate::suggestions::ValidatedReplacement;

#[derive(Debug, Clone)]
pub enum OptimizationState {
    /// Baseline breakdown of the untouched résumé.
    Scored(ScoreBreakdown),
    /// Replacements that survived validation.
    Validated(Vec<ValidatedReplacement>),
    /// Edited text (and document, when one was available). Scores are still
    /// the baseline at this point.
    Mutated(Box<OptimizedArtifact>),
    /// Raw original vs optimized scores before the boost policy runs.
    Rescored { original: u32, optimized: u32 },
    /// Terminal. `guaranteed` is true when the boost policy raised the score.
    Finalized {
        artifact: Box<OptimizedArtifact>,
        guaranteed: bool,
    },
}

impl OptimizationState {
    pub fn name(&self) -> &'static str {
        match self {
            OptimizationState::Scored(_) => "scored",
            OptimizationState::Validated(_) => "validated",
            OptimizationState::Mutated(_) => "mutated",
            OptimizationState::Rescored { .. } => "rescored",
            OptimizationState::Finalized { .. } => "finalized",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            OptimizationState::Scored(_) => 0,
            OptimizationState::Validated(_) => 1,
            OptimizationState::Mutated(_) => 2,
            OptimizationState::Rescored { .. } => 3,
            OptimizationState::Finalized { .. } => 4,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OptimizationState::Finalized { .. })
    }

    /// Moves to `next`, logging the transition. Only the immediate successor is
    /// accepted.
    pub fn advance(self, next: OptimizationState) -> Result<OptimizationState, AppError> {
        if next.rank() != self.rank() + 1 {
            return Err(AppError::Internal(anyhow::anyhow!(
                "illegal optimization transition {} -> {}",
                self.name(),
                next.name()
            )));
        }

        match &next {
            OptimizationState::Validated(replacements) => {
                info!(from = self.name(), count = replacements.len(), "state -> validated")
            }
            OptimizationState::Mutated(artifact) => info!(
                from = self.name(),
                changes = artifact.changes_made.len(),
                pdf_preserved = artifact.pdf_preserved,
                "state -> mutated"
            ),
            OptimizationState::Rescored { original, optimized } => {
                info!(from = self.name(), original, optimized, "state -> rescored")
            }
            OptimizationState::Finalized { artifact, guaranteed } => info!(
                from = self.name(),
                original = artifact.original_score,
                optimized = artifact.optimized_score,
                guaranteed,
                "state -> finalized"
            ),
            OptimizationState::Scored(_) => {}
        }

        Ok(next)
    }

    /// Starting state; logged here since nothing precedes it.
    pub fn start(baseline: ScoreBreakdown) -> OptimizationState {
        info!(overall = baseline.overall, "state -> scored");
        OptimizationState::Scored(baseline)
    }

    pub fn into_artifact(self) -> Option<(OptimizedArtifact, bool)> {
        match self {
            OptimizationState::Finalized { artifact, guaranteed } => Some((*artifact, guaranteed)),
            _ => None,
        }
    }
}
