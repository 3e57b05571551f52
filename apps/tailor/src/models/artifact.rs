use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::document::MutationReport;
use crate::matching::ScoreBreakdown;
use crate::suggestions::ValidatedReplacement;

/// Result of one optimize (or refine) run for a (user, job) pair.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizedArtifact {
    pub optimized_text: String,
    /// Mutated PDF; `None` when there was no original document or it could
    /// not be parsed.
    #[serde(skip)]
    pub optimized_document: Option<Bytes>,
    pub original_score: u32,
    pub optimized_score: u32,
    /// `"original → replacement"`, one line per replaced occurrence.
    pub changes_made: Vec<String>,
    pub original_breakdown: ScoreBreakdown,
    pub optimized_breakdown: ScoreBreakdown,
    pub keywords_used: Vec<String>,
    /// Relevance of the posting to the profile's keywords, 0 – 100.
    pub relevance: u32,
    pub applied: Vec<ValidatedReplacement>,
    pub mutation_report: Option<MutationReport>,
    /// True when `optimized_document` came from in-place mutation of the
    /// original and kept its page count.
    pub pdf_preserved: bool,
}

/// Stored artifact version as returned by an artifact store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactVersion {
    pub id: Uuid,
    pub version: i32,
    pub optimized_text: String,
    pub original_score: u32,
    pub optimized_score: u32,
    pub changes_made: Vec<String>,
    pub has_document: bool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OptimizedResumeRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_id: Uuid,
    pub version: i32,
    pub optimized_text: String,
    pub s3_pdf_key: Option<String>,
    pub original_score: i32,
    pub optimized_score: i32,
    pub changes_made: Vec<String>,
    pub details: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OptimizedResumeRow> for ArtifactVersion {
    fn from(row: OptimizedResumeRow) -> Self {
        Self {
            id: row.id,
            version: row.version,
            optimized_text: row.optimized_text,
            original_score: row.original_score.max(0) as u32,
            optimized_score: row.optimized_score.max(0) as u32,
            changes_made: row.changes_made,
            has_document: row.s3_pdf_key.is_some(),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    pub user_id: Uuid,
    pub raw_text: String,
    pub skills: Vec<String>,
    pub experiences: Value,
    pub resume_s3_key: Option<String>,
}
