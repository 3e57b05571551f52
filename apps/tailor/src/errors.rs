use thiserror::Error;

/// Pipeline-level error type.
///
/// Only `Input` and `Persistence` are surfaced to callers of the optimizer;
/// the remaining variants are degraded to a best-effort result at the point
/// where they occur (see `optimizer::orchestrator`).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Suggestion generator unavailable: {0}")]
    GenerationUnavailable(String),

    #[error("Document could not be parsed: {0}")]
    DocumentParse(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("S3 error: {0}")]
    S3(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code for the surrounding request layer.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Input(_) => "INPUT_ERROR",
            AppError::GenerationUnavailable(_) => "GENERATION_UNAVAILABLE",
            AppError::DocumentParse(_) => "DOCUMENT_PARSE_ERROR",
            AppError::Persistence(_) => "PERSISTENCE_ERROR",
            AppError::Llm(_) => "LLM_ERROR",
            AppError::S3(_) => "S3_ERROR",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// True for errors the pipeline must never swallow.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::Input(_)
                | AppError::Persistence(_)
                | AppError::Database(_)
                | AppError::S3(_)
        )
    }
}

impl From<lopdf::Error> for AppError {
    fn from(e: lopdf::Error) -> Self {
        AppError::DocumentParse(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct_per_variant() {
        let errors = [
            AppError::Input("x".into()),
            AppError::GenerationUnavailable("x".into()),
            AppError::DocumentParse("x".into()),
            AppError::Persistence("x".into()),
            AppError::Llm("x".into()),
            AppError::S3("x".into()),
            AppError::Internal(anyhow::anyhow!("x")),
        ];
        let mut codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_degradable_errors_are_not_fatal() {
        assert!(!AppError::GenerationUnavailable("down".into()).is_fatal());
        assert!(!AppError::DocumentParse("bad xref".into()).is_fatal());
        assert!(AppError::Input("empty".into()).is_fatal());
        assert!(AppError::Persistence("conn reset".into()).is_fatal());
    }

    #[test]
    fn test_display_includes_detail() {
        let e = AppError::Input("resume text is empty".into());
        assert_eq!(e.to_string(), "Invalid input: resume text is empty");
    }
}
