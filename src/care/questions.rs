//! Splits suggested questions into discussed / not yet discussed

use serde::{Deserialize, Serialize};

use super::pillar::PillarKey;
use super::role::StakeholderRole;

/// A suggested follow-up question with its topic signals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    /// Substrings that indicate the topic has already come up
    pub signals: Vec<String>,
}

impl Question {
    /// Whether any signal appears in the (lower-cased) transcript text.
    ///
    /// Blank signals never match, so an empty transcript covers nothing.
    pub fn is_covered_by(&self, transcript_text: &str) -> bool {
        self.signals.iter().any(|signal| {
            let signal = signal.trim().to_lowercase();
            !signal.is_empty() && transcript_text.contains(&signal)
        })
    }
}

/// Questions for one pillar, uncovered first, each list in original order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionCoverage {
    pub pillar: PillarKey,
    pub role: StakeholderRole,
    pub uncovered: Vec<Question>,
    pub covered: Vec<Question>,
}

impl QuestionCoverage {
    pub fn classify(
        pillar: PillarKey,
        role: StakeholderRole,
        questions: &[Question],
        transcript_text: &str,
    ) -> Self {
        let text = transcript_text.to_lowercase();
        let (covered, uncovered): (Vec<Question>, Vec<Question>) = questions
            .iter()
            .cloned()
            .partition(|question| question.is_covered_by(&text));

        Self {
            pillar,
            role,
            uncovered,
            covered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(text: &str, signals: &[&str]) -> Question {
        Question {
            text: text.to_string(),
            signals: signals.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn worker_alignment() -> Vec<Question> {
        vec![
            question("Have you had any contact with your employer?", &["contact with your employer", "manager sent"]),
            question("How has your manager responded?", &["Manager"]),
            question("Would the workplace support a gradual return?", &["supportive", "gradual return"]),
        ]
    }

    #[test]
    fn test_empty_transcript_covers_nothing() {
        let result = QuestionCoverage::classify(
            PillarKey::A,
            StakeholderRole::Worker,
            &worker_alignment(),
            "",
        );

        assert_eq!(result.uncovered.len(), 3);
        assert!(result.covered.is_empty());
    }

    #[test]
    fn test_blank_signal_never_matches() {
        let q = question("Anything else?", &["", "   "]);
        assert!(!q.is_covered_by(""));
        assert!(!q.is_covered_by("anything at all"));
    }

    #[test]
    fn test_signals_match_case_insensitively_and_preserve_order() {
        let text = "My MANAGER sent a message early on. I think they would be SUPPORTIVE.";
        let result = QuestionCoverage::classify(
            PillarKey::A,
            StakeholderRole::Worker,
            &worker_alignment(),
            text,
        );

        assert!(result.uncovered.is_empty());
        let covered: Vec<&str> = result.covered.iter().map(|q| q.text.as_str()).collect();
        assert_eq!(
            covered,
            vec![
                "Have you had any contact with your employer?",
                "How has your manager responded?",
                "Would the workplace support a gradual return?",
            ]
        );
    }

    #[test]
    fn test_partial_split() {
        let result = QuestionCoverage::classify(
            PillarKey::A,
            StakeholderRole::Worker,
            &worker_alignment(),
            "i'd like a gradual return",
        );

        assert_eq!(result.uncovered.len(), 2);
        assert_eq!(result.uncovered[0].text, "Have you had any contact with your employer?");
        assert_eq!(result.uncovered[1].text, "How has your manager responded?");
        assert_eq!(result.covered.len(), 1);
    }
}
