pub mod keyword_index;
pub mod scorer;
pub mod vocabulary;

pub use keyword_index::build as build_keyword_index;
pub use scorer::{
    fallback_job_keywords, score_document_match, score_posting_relevance, AtsScorer,
    FallbackScorer, LlmAtsScorer, OverlapScorer, ScoreBreakdown, TitleAlignment,
};
