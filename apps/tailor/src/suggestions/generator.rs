//! Suggestion generators — keyword extraction and replacement proposals.
//!
//! `LlmSuggestionGenerator` asks the model; `StaticSuggestionGenerator` serves
//! a fixed candidate list and the deterministic keyword fallback (CLI, tests).
//! Either way the output is untrusted and goes through `validator::validate`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::AppError;
use crate::llm_client::prompts::{
    JSON_ONLY_SYSTEM, KEYWORD_PROMPT_TEMPLATE, SUGGEST_PROMPT_TEMPLATE, SUGGEST_SYSTEM,
};
use crate::llm_client::LlmClient;
use crate::matching::scorer::fallback_job_keywords;

use super::validator::ReplacementCandidate;

const MAX_REQUIRED_KEYWORDS: usize = 10;

/// Everything a generator sees when asked for replacements.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SuggestionRequest {
    pub resume_excerpt: String,
    pub job_title: String,
    pub job_description: String,
    pub required_keywords: Vec<String>,
}

#[async_trait]
pub trait SuggestionGenerator: Send + Sync {
    async fn extract_keywords(&self, title: &str, description: &str)
        -> Result<Vec<String>, AppError>;

    async fn suggest(&self, request: &SuggestionRequest)
        -> Result<Vec<ReplacementCandidate>, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// LLM-backed generator
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct KeywordResponse {
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    skills: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SuggestResponse {
    #[serde(default)]
    replacements: Vec<ReplacementCandidate>,
}

pub struct LlmSuggestionGenerator {
    llm: LlmClient,
}

impl LlmSuggestionGenerator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl SuggestionGenerator for LlmSuggestionGenerator {
    async fn extract_keywords(
        &self,
        title: &str,
        description: &str,
    ) -> Result<Vec<String>, AppError> {
        let prompt = KEYWORD_PROMPT_TEMPLATE
            .replace("{job_title}", title)
            .replace("{job_description}", &truncate_chars(description, 2500));

        let response: KeywordResponse = self
            .llm
            .call_json(&prompt, JSON_ONLY_SYSTEM)
            .await
            .map_err(|e| AppError::GenerationUnavailable(format!("keyword extraction: {e}")))?;

        let keywords = merge_keywords(response.keywords, response.skills);
        debug!(count = keywords.len(), "extracted job keywords");
        Ok(keywords)
    }

    async fn suggest(
        &self,
        request: &SuggestionRequest,
    ) -> Result<Vec<ReplacementCandidate>, AppError> {
        let required: Vec<&String> = request
            .required_keywords
            .iter()
            .take(MAX_REQUIRED_KEYWORDS)
            .collect();
        let required = serde_json::to_string(&required)
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;

        let prompt = SUGGEST_PROMPT_TEMPLATE
            .replace("{job_title}", &request.job_title)
            .replace("{required_keywords}", &required)
            .replace("{job_description}", &truncate_chars(&request.job_description, 2000))
            .replace("{resume_excerpt}", &truncate_chars(&request.resume_excerpt, 6000));

        let response: SuggestResponse = self
            .llm
            .call_json(&prompt, SUGGEST_SYSTEM)
            .await
            .map_err(|e| AppError::GenerationUnavailable(format!("suggestions: {e}")))?;

        debug!(count = response.replacements.len(), "received replacement candidates");
        Ok(response.replacements)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Static generator
// ────────────────────────────────────────────────────────────────────────────

/// Serves a fixed candidate list. Keywords come from the fallback vocabulary
/// unless given explicitly.
#[derive(Debug, Clone, Default)]
pub struct StaticSuggestionGenerator {
    candidates: Vec<ReplacementCandidate>,
    keywords: Option<Vec<String>>,
}

impl StaticSuggestionGenerator {
    pub fn new(candidates: Vec<ReplacementCandidate>) -> Self {
        Self {
            candidates,
            keywords: None,
        }
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = Some(keywords);
        self
    }
}

#[async_trait]
impl SuggestionGenerator for StaticSuggestionGenerator {
    async fn extract_keywords(
        &self,
        _title: &str,
        description: &str,
    ) -> Result<Vec<String>, AppError> {
        Ok(self
            .keywords
            .clone()
            .unwrap_or_else(|| fallback_job_keywords(description)))
    }

    async fn suggest(
        &self,
        _request: &SuggestionRequest,
    ) -> Result<Vec<ReplacementCandidate>, AppError> {
        Ok(self.candidates.clone())
    }
}

/// Keywords first, then skills; case-insensitive de-duplication.
fn merge_keywords(keywords: Vec<String>, skills: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    keywords
        .into_iter()
        .chain(skills)
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty() && seen.insert(k.to_lowercase()))
        .collect()
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keywords_dedupes_across_lists() {
        let merged = merge_keywords(
            vec!["Python".into(), "REST APIs".into()],
            vec!["python".into(), " Docker ".into(), "".into()],
        );
        assert_eq!(merged, vec!["Python", "REST APIs", "Docker"]);
    }

    #[test]
    fn test_suggest_response_tolerates_missing_fields() {
        let raw = r#"{"replacements": [{"original": "Java", "replacement": "Python"}]}"#;
        let parsed: SuggestResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.replacements[0].max_occurrences, 1);
        assert!(parsed.replacements[0].context.is_empty());

        let empty: SuggestResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.replacements.is_empty());
    }

    #[tokio::test]
    async fn test_static_generator_uses_fallback_keywords() {
        let generator = StaticSuggestionGenerator::new(vec![ReplacementCandidate::new("Java", "Python")]);
        let keywords = generator
            .extract_keywords("Backend Engineer", "Python, Docker and AWS")
            .await
            .unwrap();
        assert_eq!(keywords, vec!["python", "aws", "docker"]);

        let candidates = generator.suggest(&SuggestionRequest::default()).await.unwrap();
        assert_eq!(candidates.len(), 1);
    }

    #[tokio::test]
    async fn test_static_generator_explicit_keywords() {
        let generator = StaticSuggestionGenerator::default().with_keywords(vec!["rust".into()]);
        let keywords = generator.extract_keywords("", "Python").await.unwrap();
        assert_eq!(keywords, vec!["rust"]);
    }
}
