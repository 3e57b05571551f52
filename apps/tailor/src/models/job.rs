use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A job posting as handed over by the discovery layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub description: String,
}

impl JobPosting {
    pub fn new(
        title: impl Into<String>,
        company: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            company: company.into(),
            description: description.into(),
        }
    }

    pub fn dedupe_key(&self) -> String {
        dedupe_key(&self.title, &self.company)
    }
}

/// Stable key collapsing postings that only differ in case or whitespace.
///
/// SHA-256 over `"{company}-{title}"` after normalization, lowercase hex.
pub fn dedupe_key(title: &str, company: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize(company).as_bytes());
    hasher.update(b"-");
    hasher.update(normalize(title).as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Lowercase, trim, collapse internal whitespace runs to one space.
fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Keeps postings whose key is not in `seen`, recording the new keys so that
/// duplicates inside the same batch are dropped too.
pub fn filter_new_postings(
    postings: Vec<JobPosting>,
    seen: &mut HashSet<String>,
) -> Vec<JobPosting> {
    postings
        .into_iter()
        .filter(|p| seen.insert(p.dedupe_key()))
        .collect()
}
