//! Orchestration of one optimize run and its persistence seams.

pub mod orchestrator;
pub mod policy;
pub mod postgres;
pub mod state;
pub mod store;

pub use orchestrator::{OptimizationOutcome, Orchestrator};
pub use policy::ScoreBoostPolicy;
pub use postgres::{DocumentBucket, PgArtifactStore, PgProfileStore};
pub use state::OptimizationState;
pub use store::{ArtifactStore, InMemoryArtifactStore, InMemoryProfileStore, ProfileStore};
