//! Keyword Index — projects a candidate profile onto an ordered keyword list.
//!
//! Source priority, first occurrence wins:
//! 1. declared skills, whole and word by word
//! 2. résumé-text tokens that are in the technical vocabulary
//! 3. experience role-title words, then bullet tokens in the vocabulary

use std::collections::HashSet;

use crate::matching::vocabulary::{is_stop_word, is_tech, keyword_tokens};
use crate::models::profile::Profile;

/// Ordered, de-duplicated keyword accumulator.
#[derive(Debug, Default)]
struct KeywordIndexBuilder {
    keywords: Vec<String>,
    seen: HashSet<String>,
}

impl KeywordIndexBuilder {
    fn add(&mut self, word: &str) {
        let word = word.trim().to_lowercase();
        if word.chars().count() <= 2 || is_stop_word(&word) || self.seen.contains(&word) {
            return;
        }
        self.seen.insert(word.clone());
        self.keywords.push(word);
    }

    fn add_tech_tokens(&mut self, text: &str) {
        for token in keyword_tokens(text) {
            if is_tech(&token) {
                self.add(&token);
            }
        }
    }
}

/// Builds the keyword list for a profile. An empty profile yields an empty list.
pub fn build(profile: &Profile) -> Vec<String> {
    let mut index = KeywordIndexBuilder::default();

    for skill in &profile.skills {
        index.add(skill);
        for word in skill.split_whitespace() {
            index.add(word);
        }
    }

    index.add_tech_tokens(&profile.raw_text);

    for entry in &profile.experience_entries {
        for word in entry
            .role
            .split(|c: char| c.is_whitespace() || matches!(c, '/' | ',' | '-'))
        {
            index.add(word);
        }
        for bullet in &entry.bullets {
            index.add_tech_tokens(bullet);
        }
    }

    index.keywords
}
