//! Survey classification: free-text titles to comparable survey types.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRule {
    pub keywords: Vec<String>,
    pub label: String,
}

impl ClassificationRule {
    pub fn new(keywords: &[&str], label: &str) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            label: label.to_string(),
        }
    }

    fn matches(&self, title: &str) -> bool {
        self.keywords
            .iter()
            .any(|keyword| title.contains(keyword.as_str()))
    }
}

/// Ordered rule list. Earlier rules win.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Classifier {
    rules: Vec<ClassificationRule>,
}

impl Classifier {
    pub fn new(rules: Vec<ClassificationRule>) -> Self {
        Self { rules }
    }

    /// Reads a JSON array of `{keywords, label}` objects, order preserved.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed reading classification rules: {}", path.display()))?;
        let rules: Vec<ClassificationRule> = serde_json::from_str(&data)
            .with_context(|| format!("failed parsing classification rules: {}", path.display()))?;
        Ok(Self::new(rules))
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    /// Matching is case-sensitive. Unmatched titles become their own label.
    pub fn classify(&self, title: &str) -> String {
        let title = title.trim();
        self.rules
            .iter()
            .find(|rule| rule.matches(title))
            .map(|rule| rule.label.clone())
            .unwrap_or_else(|| title.to_string())
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(vec![
            ClassificationRule::new(
                &["Course Evaluation", "Teaching Evaluation", "Learning Evaluation"],
                "Course Evaluation",
            ),
            ClassificationRule::new(&["Lecturer", "Faculty Performance"], "Lecturer Performance"),
            ClassificationRule::new(&["Alumni", "Tracer", "Graduate"], "Alumni Survey"),
            ClassificationRule::new(&["Employer", "Stakeholder"], "Employer Satisfaction"),
            ClassificationRule::new(
                &["Facilities", "Infrastructure", "Library"],
                "Facilities & Services",
            ),
            ClassificationRule::new(
                &["Academic Services", "Administration", "Registrar"],
                "Academic Services",
            ),
            ClassificationRule::new(&["Student Satisfaction", "Student"], "Student Satisfaction"),
        ])
    }
}

/// Classifies with the built-in rule list.
pub fn classify(title: &str) -> String {
    Classifier::default().classify(title)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_matching_rule_wins() {
        let classifier = Classifier::new(vec![
            ClassificationRule::new(&["a"], "X"),
            ClassificationRule::new(&["ab"], "Y"),
        ]);
        assert_eq!(classifier.classify("ab"), "X");
    }

    #[test]
    fn unmatched_title_is_its_own_label() {
        assert_eq!(classify("  Orientation Week Feedback  "), "Orientation Week Feedback");
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert_eq!(classify("alumni check-in"), "alumni check-in");
        assert_eq!(classify("Alumni check-in 2025"), "Alumni Survey");
    }

    #[test]
    fn rule_priority_beats_later_keywords() {
        // "Student" appears too, but the lecturer rule comes first.
        assert_eq!(
            classify("Student Feedback on Lecturer Performance"),
            "Lecturer Performance"
        );
    }

    #[test]
    fn empty_keyword_matches_every_title() {
        let classifier = Classifier::new(vec![
            ClassificationRule::new(&[""], "Everything"),
            ClassificationRule::new(&["Exit"], "Exit"),
        ]);
        assert_eq!(classifier.classify("Exit Survey"), "Everything");
        assert_eq!(classifier.classify("   "), "Everything");
    }

    #[test]
    fn rule_without_keywords_never_matches() {
        let classifier = Classifier::new(vec![
            ClassificationRule::new(&[], "Nothing"),
            ClassificationRule::new(&["Exit"], "Exit"),
        ]);
        assert_eq!(classifier.classify("Exit Survey"), "Exit");
    }

    #[test]
    fn rules_parse_from_json_in_order() {
        let json = r#"[
            {"keywords": ["Exit"], "label": "Exit Survey"},
            {"keywords": ["Exit Interview"], "label": "Interview"}
        ]"#;
        let classifier: Classifier = serde_json::from_str(json).unwrap();
        assert_eq!(classifier.rules().len(), 2);
        assert_eq!(classifier.classify("Exit Interview 2025"), "Exit Survey");
    }
}
