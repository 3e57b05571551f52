//! Résumé section detection over extracted plain text.

use serde::Serialize;

const MAX_EXCERPT_LINES: usize = 300;
/// Lines always kept from the top of the résumé, whatever section they are in.
const HEAD_LINES: usize = 100;
/// Longest line still considered a possible section header.
const MAX_HEADER_CHARS: usize = 40;

const RELEVANT_MARKERS: &[&str] = &["skill", "experience", "summary", "project", "work", "technical"];
const IRRELEVANT_MARKERS: &[&str] = &["education", "certification", "award", "reference"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeSection {
    Summary,
    Experience,
    Education,
    Skills,
    Projects,
    Certifications,
}

impl ResumeSection {
    pub const ALL: [ResumeSection; 6] = [
        ResumeSection::Summary,
        ResumeSection::Experience,
        ResumeSection::Education,
        ResumeSection::Skills,
        ResumeSection::Projects,
        ResumeSection::Certifications,
    ];

    fn markers(self) -> &'static [&'static str] {
        match self {
            ResumeSection::Summary => &["summary", "objective", "profile", "about"],
            ResumeSection::Experience => &["experience", "employment"],
            ResumeSection::Education => &["education", "academic", "qualifications"],
            ResumeSection::Skills => &["skills", "technologies", "competencies"],
            ResumeSection::Projects => &["projects"],
            ResumeSection::Certifications => &["certifications", "certificates", "achievements", "awards"],
        }
    }

    /// Header classification for a single trimmed line.
    pub fn from_header(line: &str) -> Option<Self> {
        if line.chars().count() > MAX_HEADER_CHARS {
            return None;
        }
        let lower = line.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|s| s.markers().iter().any(|m| lower.contains(m)))
    }
}

/// Groups non-empty lines under the most recent section header. Lines before
/// the first header are dropped; header lines themselves are not included.
pub fn extract_sections(text: &str) -> Vec<(ResumeSection, Vec<String>)> {
    let mut sections: Vec<(ResumeSection, Vec<String>)> =
        ResumeSection::ALL.iter().map(|s| (*s, Vec::new())).collect();
    let mut current: Option<ResumeSection> = None;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(section) = ResumeSection::from_header(line) {
            current = Some(section);
            continue;
        }
        if let Some(section) = current {
            if let Some((_, lines)) = sections.iter_mut().find(|(s, _)| *s == section) {
                lines.push(line.to_string());
            }
        }
    }
    sections
}

/// Part of the résumé worth sending to a suggestion generator: the first
/// lines unconditionally, then anything inside skills/experience/summary/
/// project sections, capped at 300 lines.
pub fn relevant_excerpt(text: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();
    let mut in_relevant = false;

    for line in text.lines() {
        let lower = line.trim().to_lowercase();
        if RELEVANT_MARKERS.iter().any(|m| lower.contains(m)) {
            in_relevant = true;
        } else if !lower.is_empty()
            && lower.chars().count() < 30
            && !lower.contains(':')
            && IRRELEVANT_MARKERS.iter().any(|m| lower.contains(m))
        {
            in_relevant = false;
        }

        if in_relevant || kept.len() < HEAD_LINES {
            kept.push(line);
        }
        if kept.len() >= MAX_EXCERPT_LINES {
            break;
        }
    }
    kept.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESUME: &str = "Jane Doe\n\
        Summary\n\
        Backend engineer.\n\
        Technical Skills\n\
        Languages: Java, SQL\n\
        Experience\n\
        Built billing APIs\n\
        Education\n\
        BSc Computer Science\n";

    #[test]
    fn test_extract_sections_groups_lines() {
        let sections = extract_sections(RESUME);
        let get = |s: ResumeSection| sections.iter().find(|(k, _)| *k == s).map(|(_, v)| v.clone());
        assert_eq!(get(ResumeSection::Skills).unwrap(), vec!["Languages: Java, SQL"]);
        assert_eq!(get(ResumeSection::Experience).unwrap(), vec!["Built billing APIs"]);
        assert_eq!(get(ResumeSection::Education).unwrap(), vec!["BSc Computer Science"]);
        assert!(get(ResumeSection::Projects).unwrap().is_empty());
    }

    #[test]
    fn test_long_lines_are_not_headers() {
        assert_eq!(
            ResumeSection::from_header("Led a team that shipped a profile service to production"),
            None
        );
        assert_eq!(ResumeSection::from_header("SKILLS"), Some(ResumeSection::Skills));
    }

    #[test]
    fn test_excerpt_keeps_short_resume_whole() {
        assert_eq!(relevant_excerpt(RESUME), RESUME.trim_end_matches('\n'));
    }

    #[test]
    fn test_excerpt_drops_education_after_head() {
        let mut text: Vec<String> = (0..120).map(|i| format!("Experience line {i}")).collect();
        text.push("Education".into());
        text.push("BSc".into());
        text.push("Skills".into());
        text.push("Rust".into());
        let excerpt = relevant_excerpt(&text.join("\n"));
        assert!(!excerpt.contains("BSc"));
        assert!(excerpt.contains("Rust"));
    }

    #[test]
    fn test_excerpt_capped() {
        let text: Vec<String> = (0..1000).map(|i| format!("skill {i}")).collect();
        assert_eq!(relevant_excerpt(&text.join("\n")).lines().count(), 300);
    }
}
