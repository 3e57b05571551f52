//! Match scoring — posting relevance for discovery and the ATS-style
//! document-vs-description breakdown.
//!
//! Default: `OverlapScorer` (pure word-set overlap, deterministic).
//! `LlmAtsScorer` asks the model for the same breakdown; wrap it in
//! `FallbackScorer` so a score is always produced when the model is down.
//!
//! Callers hold an `Arc<dyn AtsScorer>`.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::AppError;
use crate::llm_client::prompts::{ATS_SCORE_PROMPT_TEMPLATE, ATS_SCORE_SYSTEM};
use crate::llm_client::LlmClient;
use crate::matching::vocabulary::{
    is_tech, keyword_tokens, word_set, ATS_FALLBACK_KEYWORDS, ENTRY_LEVEL, ROLE_WORDS,
};
use crate::models::job::JobPosting;

const MAX_MISSING_SKILLS: usize = 5;
const MAX_FALLBACK_KEYWORDS: usize = 10;

// ────────────────────────────────────────────────────────────────────────────
// Output data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleAlignment {
    #[default]
    Low,
    Medium,
    High,
}

impl TitleAlignment {
    pub fn from_overall(overall: u32) -> Self {
        if overall > 65 {
            TitleAlignment::High
        } else if overall > 40 {
            TitleAlignment::Medium
        } else {
            TitleAlignment::Low
        }
    }
}

/// Structured ATS breakdown shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub overall: u32, // 0 – 100
    pub skills_matched: u32,
    /// Size of the union of declared skills and description words (rough proxy).
    pub total_skills_in_job: u32,
    pub missing_skills: Vec<String>, // at most 5
    pub title_alignment: TitleAlignment,
    pub scorer_backend: String, // "overlap" | "llm"
}

// ────────────────────────────────────────────────────────────────────────────
// Posting relevance
// ────────────────────────────────────────────────────────────────────────────

/// Scores how relevant a posting is to a candidate's keyword list, 0 – 100.
///
/// - 10 per keyword found in title or description
/// - +5 per such keyword in the technical vocabulary
/// - +15 per keyword that is a whitespace word of the title
/// - +20 if both sides hit the entry-level set, +10 if both hit the role set
pub fn score_posting_relevance<K: AsRef<str>>(
    title: &str,
    description: &str,
    keywords: &[K],
) -> u32 {
    if keywords.is_empty() {
        return 0;
    }

    let user: HashSet<String> = keywords.iter().map(|k| k.as_ref().to_lowercase()).collect();
    let job_words: HashSet<String> = keyword_tokens(&format!("{title} {description}"))
        .into_iter()
        .collect();
    let title_words: HashSet<String> = title
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect();

    let matching: HashSet<&String> = user.intersection(&job_words).collect();
    let tech_matches = matching.iter().filter(|k| is_tech(k)).count();
    let title_matches = user.intersection(&title_words).count();

    let mut score = matching.len() * 10 + tech_matches * 5 + title_matches * 15;

    let hits = |set: &HashSet<String>, vocab: &[&str]| vocab.iter().any(|w| set.contains(*w));
    if hits(&job_words, ENTRY_LEVEL) && hits(&user, ENTRY_LEVEL) {
        score += 20;
    }
    if hits(&job_words, ROLE_WORDS) && hits(&user, ROLE_WORDS) {
        score += 10;
    }

    score.min(100) as u32
}

// ────────────────────────────────────────────────────────────────────────────
// Document match
// ────────────────────────────────────────────────────────────────────────────

/// Word-overlap breakdown of a résumé text against a job description.
///
/// An empty description yields an all-zero breakdown rather than an error.
pub fn score_document_match(
    document_text: &str,
    description: &str,
    declared_skills: &[String],
) -> ScoreBreakdown {
    let job_words = word_set(description);
    if job_words.is_empty() {
        return ScoreBreakdown {
            scorer_backend: "overlap".to_string(),
            ..ScoreBreakdown::default()
        };
    }
    let doc_words = word_set(document_text);

    let overlap = doc_words.intersection(&job_words).count();
    let overall = ((overlap as f64 / job_words.len() as f64) * 100.0).floor() as u32;
    let overall = overall.min(100);

    let skills: Vec<String> = declared_skills.iter().map(|s| s.trim().to_lowercase()).collect();
    let skill_set: HashSet<&String> = skills.iter().collect();

    let skills_matched = skill_set.iter().filter(|s| job_words.contains(**s)).count() as u32;
    let total_skills_in_job = job_words.len() as u32
        + skill_set.iter().filter(|s| !job_words.contains(**s)).count() as u32;

    let mut missing_seen = HashSet::new();
    let missing_skills = skills
        .iter()
        .filter(|s| job_words.contains(*s) && !doc_words.contains(*s))
        .filter(|s| missing_seen.insert(s.as_str()))
        .take(MAX_MISSING_SKILLS)
        .cloned()
        .collect();

    ScoreBreakdown {
        overall,
        skills_matched,
        total_skills_in_job,
        missing_skills,
        title_alignment: TitleAlignment::from_overall(overall),
        scorer_backend: "overlap".to_string(),
    }
}

/// Deterministic keyword list for a description, used when the keyword
/// generator is unavailable.
pub fn fallback_job_keywords(description: &str) -> Vec<String> {
    let lower = description.to_lowercase();
    ATS_FALLBACK_KEYWORDS
        .iter()
        .filter(|kw| lower.contains(*kw))
        .take(MAX_FALLBACK_KEYWORDS)
        .map(|kw| kw.to_string())
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Scorer backends
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait AtsScorer: Send + Sync {
    async fn score(
        &self,
        document_text: &str,
        job: &JobPosting,
        declared_skills: &[String],
    ) -> Result<ScoreBreakdown, AppError>;
}

/// Deterministic word-overlap scorer.
pub struct OverlapScorer;

#[async_trait]
impl AtsScorer for OverlapScorer {
    async fn score(
        &self,
        document_text: &str,
        job: &JobPosting,
        declared_skills: &[String],
    ) -> Result<ScoreBreakdown, AppError> {
        let text = document_text.to_string();
        let description = job.description.clone();
        let skills = declared_skills.to_vec();
        tokio::task::spawn_blocking(move || score_document_match(&text, &description, &skills))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in scorer: {e}")))
    }
}

/// Shape the model is asked to return.
#[derive(Debug, Deserialize)]
struct LlmScore {
    overall_score: i64,
    #[serde(default)]
    matched_skills: Vec<String>,
    #[serde(default)]
    missing_skills: Vec<String>,
}

/// Semantic scorer via the LLM client.
pub struct LlmAtsScorer(pub LlmClient);

#[async_trait]
impl AtsScorer for LlmAtsScorer {
    async fn score(
        &self,
        document_text: &str,
        job: &JobPosting,
        declared_skills: &[String],
    ) -> Result<ScoreBreakdown, AppError> {
        let prompt = ATS_SCORE_PROMPT_TEMPLATE
            .replace("{job_title}", &job.title)
            .replace("{job_description}", &truncate_chars(&job.description, 2500))
            .replace("{resume_text}", &truncate_chars(document_text, 3500));

        let raw: LlmScore = self
            .0
            .call_json(&prompt, ATS_SCORE_SYSTEM)
            .await
            .map_err(|e| AppError::Llm(format!("ATS scoring failed: {e}")))?;

        let overall = raw.overall_score.clamp(0, 100) as u32;
        let job_words = word_set(&job.description);
        let total_skills_in_job = job_words.len() as u32
            + declared_skills
                .iter()
                .filter(|s| !job_words.contains(&s.to_lowercase()))
                .count() as u32;

        Ok(ScoreBreakdown {
            overall,
            skills_matched: raw.matched_skills.len() as u32,
            total_skills_in_job,
            missing_skills: raw.missing_skills.into_iter().take(MAX_MISSING_SKILLS).collect(),
            title_alignment: TitleAlignment::from_overall(overall),
            scorer_backend: "llm".to_string(),
        })
    }
}

/// Tries `primary`, degrading to the overlap scorer on any failure.
pub struct FallbackScorer {
    primary: Arc<dyn AtsScorer>,
}

impl FallbackScorer {
    pub fn new(primary: Arc<dyn AtsScorer>) -> Self {
        Self { primary }
    }
}

#[async_trait]
impl AtsScorer for FallbackScorer {
    async fn score(
        &self,
        document_text: &str,
        job: &JobPosting,
        declared_skills: &[String],
    ) -> Result<ScoreBreakdown, AppError> {
        match self.primary.score(document_text, job, declared_skills).await {
            Ok(breakdown) => Ok(breakdown),
            Err(e) => {
                warn!("Primary ATS scorer failed, using overlap scorer: {e}");
                OverlapScorer.score(document_text, job, declared_skills).await
            }
        }
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn skills(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_relevance_worked_example() {
        // {"sql"} matches: 10, plus title word: 15
        let score = score_posting_relevance("Python SQL backend engineer", "", &["java", "sql"]);
        assert_eq!(score, 25);
    }

    #[test]
    fn test_relevance_empty_keywords_is_zero() {
        let empty: [&str; 0] = [];
        assert_eq!(score_posting_relevance("Rust Engineer", "Rust all day", &empty), 0);
        assert_eq!(score_posting_relevance("", "", &empty), 0);
    }

    #[test]
    fn test_relevance_empty_strings_in_range() {
        assert_eq!(score_posting_relevance("", "", &["rust"]), 0);
        assert_eq!(score_posting_relevance("", "", &[""]), 0);
    }

    #[test]
    fn test_relevance_tech_bonus() {
        // kubernetes: 10 + 5 tech, no title hit
        assert_eq!(
            score_posting_relevance("Platform role", "We run kubernetes", &["kubernetes"]),
            15
        );
    }

    #[test]
    fn test_relevance_entry_level_and_role_bonus() {
        // intern: 10 + 5 (tech) + 15 (title) + 20 (entry) ; engineer: 10 + 5 + 15 + 10 (role)
        let score = score_posting_relevance("engineer intern", "", &["intern", "engineer"]);
        assert_eq!(score, 90);
    }

    #[test]
    fn test_relevance_clamped_to_100() {
        let kws = ["python", "django", "docker", "kubernetes", "react", "aws"];
        let score = score_posting_relevance(
            "python django docker kubernetes react aws",
            "python django docker kubernetes react aws",
            &kws,
        );
        assert_eq!(score, 100);
    }

    #[test]
    fn test_relevance_case_insensitive_keywords() {
        assert_eq!(score_posting_relevance("Rust", "", &["RUST"]), 30);
    }

    #[test]
    fn test_document_match_empty_description() {
        let b = score_document_match("Rust developer", "", &skills(&["Rust"]));
        assert_eq!(b.overall, 0);
        assert_eq!(b.skills_matched, 0);
        assert!(b.missing_skills.is_empty());
        assert_eq!(b.title_alignment, TitleAlignment::Low);
    }

    #[test]
    fn test_document_match_overlap_percentage_floors() {
        // description words: rust, go, sql ; doc has rust, sql → 66.6 → 66
        let b = score_document_match("rust and sql", "Rust Go SQL", &[]);
        assert_eq!(b.overall, 66);
        assert_eq!(b.title_alignment, TitleAlignment::High);
    }

    #[test]
    fn test_document_match_missing_skills_in_declared_order() {
        let declared = skills(&["Python", "Docker", "SQL", "Kafka"]);
        let b = score_document_match(
            "I write SQL",
            "Python Docker SQL Kafka Airflow",
            &declared,
        );
        assert_eq!(b.skills_matched, 4);
        assert_eq!(b.missing_skills, vec!["python", "docker", "kafka"]);
    }

    #[test]
    fn test_document_match_caps_missing_at_five() {
        let declared = skills(&["a1", "a2", "a3", "a4", "a5", "a6", "a7"]);
        let b = score_document_match("nothing", "a1 a2 a3 a4 a5 a6 a7", &declared);
        assert_eq!(b.missing_skills.len(), 5);
    }

    #[test]
    fn test_alignment_thresholds() {
        assert_eq!(TitleAlignment::from_overall(66), TitleAlignment::High);
        assert_eq!(TitleAlignment::from_overall(65), TitleAlignment::Medium);
        assert_eq!(TitleAlignment::from_overall(41), TitleAlignment::Medium);
        assert_eq!(TitleAlignment::from_overall(40), TitleAlignment::Low);
    }

    #[test]
    fn test_fallback_keywords_substring_hits() {
        let kws = fallback_job_keywords("We use Docker, Kubernetes and PostgreSQL with Agile.");
        assert!(kws.contains(&"docker".to_string()));
        assert!(kws.contains(&"kubernetes".to_string()));
        assert!(kws.contains(&"postgresql".to_string()));
        assert!(kws.contains(&"sql".to_string()));
        assert!(kws.len() <= 10);
    }

    struct FailingScorer;

    #[async_trait]
    impl AtsScorer for FailingScorer {
        async fn score(
            &self,
            _document_text: &str,
            _job: &JobPosting,
            _declared_skills: &[String],
        ) -> Result<ScoreBreakdown, AppError> {
            Err(AppError::Llm("model offline".into()))
        }
    }

    #[tokio::test]
    async fn test_fallback_scorer_degrades_to_overlap() {
        let scorer = FallbackScorer::new(Arc::new(FailingScorer));
        let job = JobPosting::new("Engineer", "Acme", "rust sql");
        let b = scorer.score("rust", &job, &[]).await.unwrap();
        assert_eq!(b.overall, 50);
        assert_eq!(b.scorer_backend, "overlap");
    }

    #[tokio::test]
    async fn test_overlap_scorer_matches_pure_function() {
        let job = JobPosting::new("Engineer", "Acme", "Python Docker SQL");
        let declared = skills(&["Python"]);
        let via_trait = OverlapScorer.score("python sql", &job, &declared).await.unwrap();
        assert_eq!(via_trait, score_document_match("python sql", &job.description, &declared));
    }
}
