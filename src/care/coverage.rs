//! Keyword-based coverage scoring per C.A.R.E. pillar

use serde::Serialize;

use super::pillar::{Pillar, PillarKey};

/// Share of a pillar's keywords that must be heard for a full score
const SATURATION_RATIO: f64 = 0.4;
const COVERED_THRESHOLD: f64 = 0.7;
const PARTIAL_THRESHOLD: f64 = 0.25;

/// Coverage classification of a single pillar
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageState {
    Missing,
    Partial,
    Covered,
}

impl CoverageState {
    pub fn from_score(score: f64) -> Self {
        if score >= COVERED_THRESHOLD {
            CoverageState::Covered
        } else if score >= PARTIAL_THRESHOLD {
            CoverageState::Partial
        } else {
            CoverageState::Missing
        }
    }
}

/// Coverage of one pillar for the current transcript
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PillarCoverage {
    pub key: PillarKey,
    pub label: String,
    /// Distinct keywords found in the transcript
    pub hits: usize,
    pub keyword_count: usize,
    /// Normalized score in `[0, 1]`
    pub score: f64,
    pub state: CoverageState,
}

/// Coverage of every pillar, in framework order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    pub pillars: Vec<PillarCoverage>,
}

impl CoverageReport {
    pub fn get(&self, key: PillarKey) -> Option<&PillarCoverage> {
        self.pillars.iter().find(|p| p.key == key)
    }

    pub fn state(&self, key: PillarKey) -> CoverageState {
        self.get(key)
            .map(|p| p.state)
            .unwrap_or(CoverageState::Missing)
    }

    /// Percentage of pillars that are at least partially covered
    pub fn completeness(&self) -> u8 {
        let touched = PillarKey::ALL
            .iter()
            .filter(|key| self.state(**key) != CoverageState::Missing)
            .count();
        ((touched as f64 / PillarKey::ALL.len() as f64) * 100.0).round() as u8
    }

    /// First missing pillar, else first partial pillar, else Capacity
    pub fn suggested_pillar(&self) -> PillarKey {
        let first_in = |state: CoverageState| {
            PillarKey::ALL
                .iter()
                .copied()
                .find(|key| self.state(*key) == state)
        };

        first_in(CoverageState::Missing)
            .or_else(|| first_in(CoverageState::Partial))
            .unwrap_or(PillarKey::C)
    }
}

/// Scores transcript text against the pillar keyword lists
#[derive(Debug, Clone)]
pub struct CoverageScorer {
    pillars: Vec<Pillar>,
}

impl CoverageScorer {
    pub fn new(pillars: Vec<Pillar>) -> Self {
        Self { pillars }
    }

    /// Score lower-cased, space-joined transcript text.
    ///
    /// Stateless: every call rescans the whole text.
    pub fn score(&self, transcript_text: &str) -> CoverageReport {
        let text = transcript_text.to_lowercase();

        let pillars = self
            .pillars
            .iter()
            .map(|pillar| {
                let keyword_count = pillar.keywords.len();
                let hits = pillar
                    .keywords
                    .iter()
                    .filter(|keyword| text.contains(keyword.as_str()))
                    .count();
                let score = if keyword_count == 0 {
                    0.0
                } else {
                    (hits as f64 / (keyword_count as f64 * SATURATION_RATIO)).min(1.0)
                };

                PillarCoverage {
                    key: pillar.key,
                    label: pillar.label.clone(),
                    hits,
                    keyword_count,
                    score,
                    state: CoverageState::from_score(score),
                }
            })
            .collect();

        CoverageReport { pillars }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capacity() -> Pillar {
        Pillar::new(
            PillarKey::C,
            "Capacity",
            "Medical status & functional ability",
            [
                "diagnosis", "doctor", "treatment", "physio", "surgery", "specialist",
                "functional", "duties", "work", "recovery", "pain", "restriction",
                "certificate", "medical",
            ],
        )
    }

    fn scorer() -> CoverageScorer {
        CoverageScorer::new(vec![
            capacity(),
            Pillar::new(PillarKey::A, "Alignment", "", ["employer", "manager", "hr"]),
            Pillar::new(PillarKey::R, "Recovery Barriers", "", ["stress", "money"]),
            Pillar::new(PillarKey::E, "Engagement", "", ["appointment", "plan"]),
        ])
    }

    #[test]
    fn test_abbreviations_are_not_keyword_hits() {
        let report = scorer().score("i saw dr patel last week my back still hurts");
        let c = report.get(PillarKey::C).unwrap();

        assert_eq!(c.hits, 0);
        assert_eq!(c.state, CoverageState::Missing);
    }

    #[test]
    fn test_single_hit_score() {
        let report = scorer().score("i saw my doctor last week");
        let c = report.get(PillarKey::C).unwrap();

        assert_eq!(c.hits, 1);
        assert!((c.score - 1.0 / (14.0 * 0.4)).abs() < 1e-9);
        assert!((c.score - 0.179).abs() < 0.001);
        assert_eq!(c.state, CoverageState::Missing);
    }

    #[test]
    fn test_repeated_keyword_counts_once() {
        let report = scorer().score("pain pain pain");
        assert_eq!(report.get(PillarKey::C).unwrap().hits, 1);
    }

    #[test]
    fn test_thresholds() {
        assert_eq!(CoverageState::from_score(0.0), CoverageState::Missing);
        assert_eq!(CoverageState::from_score(0.249), CoverageState::Missing);
        assert_eq!(CoverageState::from_score(0.25), CoverageState::Partial);
        assert_eq!(CoverageState::from_score(0.699), CoverageState::Partial);
        assert_eq!(CoverageState::from_score(0.7), CoverageState::Covered);
        assert_eq!(CoverageState::from_score(1.0), CoverageState::Covered);
    }

    #[test]
    fn test_score_saturates_at_one() {
        // 2 keywords * 0.4 = 0.8, so a single hit already exceeds it
        let report = scorer().score("i have an appointment and a plan");
        let e = report.get(PillarKey::E).unwrap();
        assert_eq!(e.score, 1.0);
        assert_eq!(e.state, CoverageState::Covered);
    }

    #[test]
    fn test_monotonic_as_lines_are_appended() {
        let lines = [
            "Thanks for picking up",
            "The physio says the pain is easing",
            "My employer called",
            "I'm stressed about money",
            "Next appointment is Monday",
        ];
        let scorer = scorer();

        let mut text = String::new();
        let mut previous = scorer.score(&text);
        for line in lines {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(&line.to_lowercase());
            let current = scorer.score(&text);

            for (before, after) in previous.pillars.iter().zip(&current.pillars) {
                assert!(after.score >= before.score, "{:?} decreased", after.key);
                assert!(after.state >= before.state);
            }
            previous = current;
        }
    }

    #[test]
    fn test_completeness_and_suggestion() {
        let scorer = scorer();

        let empty = scorer.score("");
        assert_eq!(empty.completeness(), 0);
        assert_eq!(empty.suggested_pillar(), PillarKey::C);

        let report = scorer.score("my employer and hr");
        assert_eq!(report.state(PillarKey::A), CoverageState::Covered);
        assert_eq!(report.completeness(), 25);
        assert_eq!(report.suggested_pillar(), PillarKey::C);

        let all = scorer.score("doctor physio employer stress appointment");
        assert_eq!(all.completeness(), 100);
        assert_eq!(all.state(PillarKey::C), CoverageState::Partial);
        assert_eq!(all.suggested_pillar(), PillarKey::C);
    }
}
