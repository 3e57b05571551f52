//! Turns untrusted replacement suggestions into ones the document mutator
//! may apply.
//!
//! Rules, applied per candidate in order:
//! - trimmed `original` and `replacement` must be non-empty
//! - `replacement` length / `original` length (chars) within [0.5, 2.0]
//! - neither side longer than 6 words
//! - `max_occurrences` clamped to [1, 3]
//!
//! Rejections are silent. The survivors keep their input order and are
//! truncated to the cap.

use serde::{Deserialize, Serialize};

pub const DEFAULT_CAP: usize = 10;

const MIN_LENGTH_RATIO: f64 = 0.5;
const MAX_LENGTH_RATIO: f64 = 2.0;
const MAX_WORDS: usize = 6;
const MAX_OCCURRENCES: u32 = 3;
const DEFAULT_REASON: &str = "ATS optimization";

fn default_max_occurrences() -> i64 {
    1
}

/// A suggestion as produced by a generator. Nothing about it is trusted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplacementCandidate {
    #[serde(default)]
    pub original: String,
    #[serde(default)]
    pub replacement: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default = "default_max_occurrences")]
    pub max_occurrences: i64,
}

impl ReplacementCandidate {
    pub fn new(original: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            replacement: replacement.into(),
            max_occurrences: 1,
            ..Self::default()
        }
    }

    pub fn with_max_occurrences(mut self, n: i64) -> Self {
        self.max_occurrences = n;
        self
    }
}

/// A replacement that passed [`validate`]. Only `validate` can build one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedReplacement {
    original: String,
    replacement: String,
    context: String,
    reason: String,
    max_occurrences: u32,
}

impl ValidatedReplacement {
    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn max_occurrences(&self) -> u32 {
        self.max_occurrences
    }
}

impl From<&ValidatedReplacement> for ReplacementCandidate {
    fn from(v: &ValidatedReplacement) -> Self {
        Self {
            original: v.original.clone(),
            replacement: v.replacement.clone(),
            context: v.context.clone(),
            reason: v.reason.clone(),
            max_occurrences: v.max_occurrences as i64,
        }
    }
}

pub fn validate(candidates: &[ReplacementCandidate], cap: usize) -> Vec<ValidatedReplacement> {
    candidates
        .iter()
        .filter_map(check)
        .take(cap)
        .collect()
}

fn check(candidate: &ReplacementCandidate) -> Option<ValidatedReplacement> {
    let original = candidate.original.trim();
    let replacement = candidate.replacement.trim();
    if original.is_empty() || replacement.is_empty() {
        return None;
    }

    let ratio = replacement.chars().count() as f64 / original.chars().count() as f64;
    if !(MIN_LENGTH_RATIO..=MAX_LENGTH_RATIO).contains(&ratio) {
        return None;
    }

    let words = original
        .split_whitespace()
        .count()
        .max(replacement.split_whitespace().count());
    if words > MAX_WORDS {
        return None;
    }

    let reason = match candidate.reason.trim() {
        "" => DEFAULT_REASON.to_string(),
        r => r.to_string(),
    };

    Some(ValidatedReplacement {
        original: original.to_string(),
        replacement: replacement.to_string(),
        context: candidate.context.trim().to_string(),
        reason,
        max_occurrences: candidate.max_occurrences.clamp(1, MAX_OCCURRENCES as i64) as u32,
    })
}

#[cfg(test)]
pub(crate) fn validated(original: &str, replacement: &str, max_occurrences: i64) -> ValidatedReplacement {
    let candidate = ReplacementCandidate::new(original, replacement).with_max_occurrences(max_occurrences);
    check(&candidate).expect("test replacement must be valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_simple_swap() {
        let out = validate(&[ReplacementCandidate::new("Java", "Python")], DEFAULT_CAP);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].original(), "Java");
        assert_eq!(out[0].replacement(), "Python");
        assert_eq!(out[0].max_occurrences(), 1);
        assert_eq!(out[0].reason(), "ATS optimization");
    }

    #[test]
    fn test_drops_empty_after_trim() {
        let out = validate(
            &[
                ReplacementCandidate::new("   ", "Python"),
                ReplacementCandidate::new("Java", "\t"),
            ],
            DEFAULT_CAP,
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_length_ratio_bounds() {
        // 2 chars -> 4 chars is exactly 2.0, kept; 2 -> 5 is 2.5, dropped
        let out = validate(
            &[
                ReplacementCandidate::new("Go", "Rust"),
                ReplacementCandidate::new("Go", "Scala"),
                ReplacementCandidate::new("Kotlin", "C++"),
                ReplacementCandidate::new("Kotlin", "Go"),
            ],
            DEFAULT_CAP,
        );
        let pairs: Vec<_> = out.iter().map(|v| (v.original(), v.replacement())).collect();
        assert_eq!(pairs, vec![("Go", "Rust"), ("Kotlin", "C++")]);
    }

    #[test]
    fn test_ratio_counts_chars_not_bytes() {
        let out = validate(&[ReplacementCandidate::new("Résumé", "Resume")], DEFAULT_CAP);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_drops_long_phrases() {
        let long = "one two three four five six seven";
        let out = validate(
            &[ReplacementCandidate::new(long, "one two three four five six seven")],
            DEFAULT_CAP,
        );
        assert!(out.is_empty());

        let six = "one two three four five six";
        assert_eq!(validate(&[ReplacementCandidate::new(six, six)], DEFAULT_CAP).len(), 1);
    }

    #[test]
    fn test_clamps_max_occurrences() {
        let out = validate(
            &[
                ReplacementCandidate::new("Java", "Python").with_max_occurrences(0),
                ReplacementCandidate::new("Azure", "AWS!").with_max_occurrences(-4),
                ReplacementCandidate::new("jQuery", "React").with_max_occurrences(9),
            ],
            DEFAULT_CAP,
        );
        let counts: Vec<_> = out.iter().map(|v| v.max_occurrences()).collect();
        assert_eq!(counts, vec![1, 1, 3]);
    }

    #[test]
    fn test_preserves_order_and_truncates_to_cap() {
        let candidates: Vec<_> = (0..15)
            .map(|i| ReplacementCandidate::new(format!("skill{i}"), format!("tool{i}")))
            .collect();
        let out = validate(&candidates, DEFAULT_CAP);
        assert_eq!(out.len(), 10);
        assert_eq!(out[0].original(), "skill0");
        assert_eq!(out[9].original(), "skill9");
        assert!(validate(&candidates, 0).is_empty());
    }

    #[test]
    fn test_validation_is_idempotent() {
        let candidates = vec![
            ReplacementCandidate::new(" Java ", "Python").with_max_occurrences(7),
            ReplacementCandidate::new("x", "a much longer phrase"),
            ReplacementCandidate::new("MS Office", "Docker"),
        ];
        let once = validate(&candidates, DEFAULT_CAP);
        let again: Vec<ReplacementCandidate> = once.iter().map(ReplacementCandidate::from).collect();
        assert_eq!(validate(&again, DEFAULT_CAP), once);
    }

    #[test]
    fn test_deserializes_with_missing_fields() {
        let json = r#"[{"original": "Java", "replacement": "Python"}, {"replacement": "Go"}]"#;
        let candidates: Vec<ReplacementCandidate> = serde_json::from_str(json).unwrap();
        assert_eq!(candidates[0].max_occurrences, 1);
        assert_eq!(validate(&candidates, DEFAULT_CAP).len(), 1);
    }
}
