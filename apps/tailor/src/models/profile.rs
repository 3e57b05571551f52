use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub role: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub bullets: Vec<String>,
}

/// Raw profile fields as they arrive from the profile store or a JSON file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileData {
    #[serde(default)]
    pub raw_text: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default, alias = "experiences")]
    pub experience_entries: Vec<ExperienceEntry>,
}

/// A candidate profile. Replaced wholesale on re-upload, never edited in place.
///
/// `original_document` is the uploaded résumé PDF. `Bytes` keeps it immutable
/// and cheap to hand to concurrent optimize calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "ProfileData")]
pub struct Profile {
    pub raw_text: String,
    pub skills: Vec<String>,
    pub experience_entries: Vec<ExperienceEntry>,
    #[serde(skip)]
    pub original_document: Option<Bytes>,
}

impl Profile {
    /// Builds a profile, trimming skills and dropping case-insensitive duplicates
    /// (first spelling wins).
    pub fn new(
        raw_text: impl Into<String>,
        skills: Vec<String>,
        experience_entries: Vec<ExperienceEntry>,
        original_document: Option<Bytes>,
    ) -> Self {
        let mut seen = std::collections::HashSet::new();
        let skills = skills
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty() && seen.insert(s.to_lowercase()))
            .collect();

        Self {
            raw_text: raw_text.into(),
            skills,
            experience_entries,
            original_document,
        }
    }

    /// Ingests an uploaded PDF: the plain text is extracted with `pdf-extract`
    /// and the bytes are kept as the original document.
    pub fn from_document(
        document: Bytes,
        skills: Vec<String>,
        experience_entries: Vec<ExperienceEntry>,
    ) -> Result<Self, AppError> {
        // pdf-extract panics on some unsupported font encodings.
        let bytes: &[u8] = &document;
        let raw_text = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
            .map_err(|_| AppError::DocumentParse("text extraction panicked".to_string()))?
            .map_err(|e| AppError::DocumentParse(format!("text extraction failed: {e}")))?;
        Ok(Self::new(raw_text, skills, experience_entries, Some(document)))
    }

    /// Same profile with a different original document attached.
    pub fn with_document(self, document: Option<Bytes>) -> Self {
        Self {
            original_document: document,
            ..self
        }
    }

    pub fn is_empty(&self) -> bool {
        self.raw_text.trim().is_empty()
            && self.skills.is_empty()
            && self.experience_entries.is_empty()
    }
}

impl From<ProfileData> for Profile {
    fn from(data: ProfileData) -> Self {
        Profile::new(data.raw_text, data.skills, data.experience_entries, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_dedupes_skills_case_insensitively() {
        let profile = Profile::new(
            "",
            vec!["Rust".into(), " rust ".into(), "SQL".into(), "".into()],
            vec![],
            None,
        );
        assert_eq!(profile.skills, vec!["Rust".to_string(), "SQL".to_string()]);
    }

    #[test]
    fn test_deserialize_accepts_experiences_alias() {
        let json = r#"{
            "raw_text": "Backend engineer",
            "skills": ["Go", "go"],
            "experiences": [{"role": "Engineer", "bullets": ["Built APIs"]}]
        }"#;
        let profile: Profile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.skills, vec!["Go".to_string()]);
        assert_eq!(profile.experience_entries[0].role, "Engineer");
        assert!(profile.original_document.is_none());
    }

    #[test]
    fn test_empty_profile() {
        assert!(Profile::default().is_empty());
        assert!(!Profile::new("text", vec![], vec![], None).is_empty());
    }

    #[test]
    fn test_from_document_rejects_garbage() {
        let result = Profile::from_document(Bytes::from_static(b"not a pdf"), vec![], vec![]);
        assert!(matches!(result, Err(AppError::DocumentParse(_))));
    }
}
