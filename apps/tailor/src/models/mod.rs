pub mod artifact;
pub mod job;
pub mod profile;

pub use artifact::{ArtifactVersion, OptimizedArtifact};
pub use job::{dedupe_key, filter_new_postings, JobPosting};
pub use profile::{ExperienceEntry, Profile};
