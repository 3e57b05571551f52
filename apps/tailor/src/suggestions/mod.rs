pub mod generator;
pub mod preview;
pub mod sections;
pub mod validator;

pub use generator::{
    LlmSuggestionGenerator, StaticSuggestionGenerator, SuggestionGenerator, SuggestionRequest,
};
pub use preview::{preview_text, TextPreview};
pub use sections::{extract_sections, relevant_excerpt, ResumeSection};
pub use validator::{validate, ReplacementCandidate, ValidatedReplacement, DEFAULT_CAP};
