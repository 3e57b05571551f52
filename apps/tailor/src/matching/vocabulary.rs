//! Fixed word lists shared by the keyword index and the scorers.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

/// Filler words never worth matching on.
pub const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "as", "is", "was", "are", "were", "been", "be", "have", "has", "had", "do", "does",
    "did", "will", "would", "could", "should", "may", "might", "must", "shall", "can", "need",
    "about", "above", "after", "before", "into", "through", "during", "under", "again",
    "further", "then", "once", "here", "there", "when", "where", "why", "how", "all", "each",
    "few", "more", "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same",
    "than", "too", "very", "just", "also", "now", "we", "us", "our", "you", "your", "work",
    "working", "experience", "years", "year", "team", "company", "role",
];

/// High-value technical terms. Matches earn a bonus in posting relevance and
/// are the only résumé-text tokens promoted into the keyword index.
///
/// Plain `sql` is deliberately absent: it is matched as an ordinary keyword.
pub const TECH_VOCABULARY: &[&str] = &[
    "python", "java", "javascript", "typescript", "react", "angular", "vue", "node", "nodejs",
    "django", "flask", "fastapi", "spring", "springboot", "aws", "azure", "gcp", "cloud",
    "docker", "kubernetes", "k8s", "devops", "ci/cd", "jenkins", "git", "github", "gitlab",
    "mysql", "postgresql", "mongodb", "redis", "elasticsearch", "kafka", "rabbitmq", "graphql",
    "rest", "api", "microservices", "machine", "learning", "ml", "ai", "artificial",
    "intelligence", "deep", "neural", "tensorflow", "pytorch", "nlp", "data", "analytics",
    "science", "scientist", "engineer", "developer", "frontend", "backend", "fullstack",
    "full-stack", "mobile", "android", "ios", "flutter", "react-native", "kotlin", "swift",
    "go", "golang", "rust", "c++", "scala", "hadoop", "spark", "airflow", "tableau", "powerbi",
    "sre", "reliability", "intern", "internship", "fresher", "graduate", "trainee", "associate",
];

/// Entry-level signals: both posting and candidate must hit this set for the bonus.
pub const ENTRY_LEVEL: &[&str] = &["intern", "internship", "trainee", "fresher", "graduate", "entry"];

/// Role nouns: both posting and candidate must hit this set for the bonus.
pub const ROLE_WORDS: &[&str] = &["developer", "engineer", "architect", "manager", "analyst", "scientist"];

/// Substring vocabulary used to pull keywords out of a job description when no
/// keyword generator is available.
pub const ATS_FALLBACK_KEYWORDS: &[&str] = &[
    "python", "javascript", "react", "node.js", "sql", "aws", "docker", "kubernetes", "git",
    "agile", "api", "rest", "mongodb", "postgresql", "typescript", "java", "c++",
    "machine learning", "ai", "cloud", "microservices", "ci/cd", "devops", "scrum", "jira",
    "fastapi",
];

fn set_of(words: &'static [&'static str]) -> HashSet<&'static str> {
    words.iter().copied().collect()
}

pub fn stop_words() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| set_of(STOP_WORDS))
}

pub fn tech_vocabulary() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| set_of(TECH_VOCABULARY))
}

pub fn is_stop_word(word: &str) -> bool {
    stop_words().contains(word)
}

pub fn is_tech(word: &str) -> bool {
    tech_vocabulary().contains(word)
}

fn keyword_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[a-zA-Z+#]+").expect("static regex"))
}

fn word_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\w+").expect("static regex"))
}

/// Lowercased letter/`+`/`#` tokens, in order, duplicates kept.
pub fn keyword_tokens(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    keyword_token_regex()
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Lowercased `\w+` word set used by the document match scorer.
pub fn word_set(text: &str) -> HashSet<String> {
    let lower = text.to_lowercase();
    word_regex()
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_tokens_keep_plus_and_hash() {
        assert_eq!(
            keyword_tokens("C++ and C# on Node.js"),
            vec!["c++", "and", "c#", "on", "node", "js"]
        );
    }

    #[test]
    fn test_word_set_lowercases_and_dedupes() {
        let set = word_set("Rust rust RUST, sql_server 2024");
        assert_eq!(set.len(), 3);
        assert!(set.contains("rust"));
        assert!(set.contains("sql_server"));
        assert!(set.contains("2024"));
    }

    #[test]
    fn test_vocabulary_membership() {
        assert!(is_tech("kubernetes"));
        assert!(!is_tech("sql"));
        assert!(is_stop_word("experience"));
        assert!(!is_stop_word("python"));
    }

    #[test]
    fn test_entry_and_role_sets_are_lowercase() {
        for w in ENTRY_LEVEL.iter().chain(ROLE_WORDS) {
            assert_eq!(*w, w.to_lowercase());
        }
    }
}
