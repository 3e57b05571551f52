use serde::Serialize;

use super::validator::ValidatedReplacement;

/// Plain-text view of what the replacements would do.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TextPreview {
    pub original: String,
    pub modified: String,
    /// One `"original → replacement"` line per replaced occurrence.
    pub changes_made: Vec<String>,
}

/// Applies each replacement, in order, to at most `max_occurrences` leftmost
/// occurrences. Text produced by a replacement is never matched again by the
/// same replacement, so "Java" → "JavaEE" terminates.
pub fn preview_text(text: &str, replacements: &[ValidatedReplacement]) -> TextPreview {
    let mut modified = text.to_string();
    let mut changes_made = Vec::new();

    for r in replacements {
        let mut cursor = 0;
        for _ in 0..r.max_occurrences() {
            let Some(pos) = modified[cursor..].find(r.original()).map(|p| p + cursor) else {
                break;
            };
            modified.replace_range(pos..pos + r.original().len(), r.replacement());
            cursor = pos + r.replacement().len();
            changes_made.push(format!("{} → {}", r.original(), r.replacement()));
        }
    }

    TextPreview {
        original: text.to_string(),
        modified,
        changes_made,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suggestions::validator::validated;

    #[test]
    fn test_replaces_up_to_max_occurrences() {
        let preview = preview_text("Java, Java and Java", &[validated("Java", "Rust", 2)]);
        assert_eq!(preview.modified, "Rust, Rust and Java");
        assert_eq!(preview.changes_made, vec!["Java → Rust", "Java → Rust"]);
        assert_eq!(preview.original, "Java, Java and Java");
    }

    #[test]
    fn test_replacement_containing_original_terminates() {
        let preview = preview_text("Java and Java", &[validated("Java", "JavaEE", 3)]);
        assert_eq!(preview.modified, "JavaEE and JavaEE");
        assert_eq!(preview.changes_made.len(), 2);
    }

    #[test]
    fn test_missing_original_records_nothing() {
        let preview = preview_text("Python only", &[validated("Java", "Rust", 1)]);
        assert_eq!(preview.modified, "Python only");
        assert!(preview.changes_made.is_empty());
    }

    #[test]
    fn test_case_sensitive() {
        let preview = preview_text("java Java", &[validated("Java", "Go!!", 1)]);
        assert_eq!(preview.modified, "java Go!!");
    }
}
