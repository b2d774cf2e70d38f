use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Speaker label used for the case manager
pub const CASE_MANAGER: &str = "CM";

/// Counterpart label when the live speaker cannot be inferred
pub const UNKNOWN_CALLER: &str = "Caller";

/// A single spoken line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptLine {
    pub speaker: String,
    pub text: String,
    /// False for a provisional live recognition result
    pub is_final: bool,
}

/// Append-only transcript for one call.
///
/// Only the tail may be provisional. It is overwritten by the next
/// provisional result or by its finalized successor; final lines are
/// never changed or removed.
#[derive(Debug, Default)]
pub struct TranscriptStore {
    lines: Vec<TranscriptLine>,
    frozen: bool,
}

impl TranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a final line, replacing a provisional tail if there is one.
    ///
    /// Returns the index of the line, or `None` once frozen.
    pub fn append(&mut self, speaker: impl Into<String>, text: impl Into<String>) -> Option<usize> {
        if self.frozen {
            warn!("Transcript is frozen, dropping line");
            return None;
        }

        let line = TranscriptLine {
            speaker: speaker.into(),
            text: text.into(),
            is_final: true,
        };
        Some(self.put(line))
    }

    /// Show a provisional line, overwriting the previous provisional tail
    pub fn replace_interim(
        &mut self,
        speaker: impl Into<String>,
        text: impl Into<String>,
    ) -> Option<usize> {
        if self.frozen {
            return None;
        }

        let line = TranscriptLine {
            speaker: speaker.into(),
            text: text.into(),
            is_final: false,
        };
        Some(self.put(line))
    }

    fn put(&mut self, line: TranscriptLine) -> usize {
        match self.lines.last_mut() {
            Some(tail) if !tail.is_final => *tail = line,
            _ => self.lines.push(line),
        }
        self.lines.len() - 1
    }

    /// Stop accepting lines and drop any provisional tail
    pub fn freeze(&mut self) {
        if matches!(self.lines.last(), Some(tail) if !tail.is_final) {
            self.lines.pop();
        }
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// All lines in order, including a provisional tail
    pub fn snapshot(&self) -> Vec<TranscriptLine> {
        self.lines.clone()
    }

    pub fn lines(&self) -> &[TranscriptLine] {
        &self.lines
    }

    pub fn interim(&self) -> Option<&TranscriptLine> {
        self.lines.last().filter(|line| !line.is_final)
    }

    pub fn final_lines(&self) -> impl Iterator<Item = &TranscriptLine> {
        self.lines.iter().filter(|line| line.is_final)
    }

    pub fn final_count(&self) -> usize {
        self.final_lines().count()
    }

    /// Final lines lower-cased and joined with single spaces.
    ///
    /// Provisional text is excluded so derived scores never lose evidence.
    pub fn full_text(&self) -> String {
        self.final_lines()
            .map(|line| line.text.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Case-manager and counterpart labels for a live transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeakerLabels {
    pub case_manager: String,
    pub counterpart: String,
}

impl SpeakerLabels {
    /// Guess who the case manager is from line counts.
    ///
    /// The speaker with more lines is taken to be the case manager. This is
    /// a known approximation and misreads short calls.
    pub fn infer(lines: &[TranscriptLine]) -> Self {
        let fallback = || Self {
            case_manager: CASE_MANAGER.to_string(),
            counterpart: UNKNOWN_CALLER.to_string(),
        };

        let finals: Vec<&TranscriptLine> = lines.iter().filter(|l| l.is_final).collect();
        if finals.len() < 2 {
            return fallback();
        }

        let mut order: Vec<&str> = Vec::new();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for line in finals {
            let speaker = line.speaker.as_str();
            if !counts.contains_key(speaker) {
                order.push(speaker);
            }
            *counts.entry(speaker).or_insert(0) += 1;
        }

        match order.as_slice() {
            [] => fallback(),
            [only] => Self {
                case_manager: only.to_string(),
                counterpart: UNKNOWN_CALLER.to_string(),
            },
            [a, b, ..] => {
                let (cm, other) = if counts[a] >= counts[b] { (a, b) } else { (b, a) };
                Self {
                    case_manager: cm.to_string(),
                    counterpart: other.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interim_is_replaced_by_final_successor() {
        let mut store = TranscriptStore::new();
        store.append("CM", "Hello Jamie").unwrap();
        store.replace_interim("Worker", "hi").unwrap();
        store.replace_interim("Worker", "hi Alex it's").unwrap();

        assert_eq!(store.lines().len(), 2);
        assert_eq!(store.interim().unwrap().text, "hi Alex it's");
        assert_eq!(store.full_text(), "hello jamie");

        let index = store.append("Worker", "Hi Alex, it's Jamie").unwrap();
        assert_eq!(index, 1);
        assert!(store.interim().is_none());
        assert_eq!(store.full_text(), "hello jamie hi alex, it's jamie");
    }

    #[test]
    fn test_final_lines_are_never_overwritten() {
        let mut store = TranscriptStore::new();
        store.append("CM", "one").unwrap();
        store.append("Worker", "two").unwrap();
        store.replace_interim("CM", "thr").unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0].text, "one");
        assert_eq!(snapshot[1].text, "two");
        assert_eq!(store.final_count(), 2);
    }

    #[test]
    fn test_freeze_drops_interim_and_rejects_appends() {
        let mut store = TranscriptStore::new();
        store.append("CM", "one").unwrap();
        store.replace_interim("Worker", "tw").unwrap();
        store.freeze();

        assert!(store.is_frozen());
        assert_eq!(store.lines().len(), 1);
        assert!(store.append("Worker", "two").is_none());
        assert!(store.replace_interim("Worker", "tw").is_none());
        assert_eq!(store.lines().len(), 1);
    }

    fn line(speaker: &str) -> TranscriptLine {
        TranscriptLine {
            speaker: speaker.to_string(),
            text: "...".to_string(),
            is_final: true,
        }
    }

    #[test]
    fn test_speaker_inference() {
        assert_eq!(SpeakerLabels::infer(&[line("CM")]).counterpart, "Caller");

        let one = SpeakerLabels::infer(&[line("Injured Worker"), line("Injured Worker")]);
        assert_eq!(one.case_manager, "Injured Worker");
        assert_eq!(one.counterpart, "Caller");

        let tie = SpeakerLabels::infer(&[line("CM"), line("Injured Worker")]);
        assert_eq!(tie.case_manager, "CM");

        let flipped = SpeakerLabels::infer(&[
            line("CM"),
            line("Injured Worker"),
            line("Injured Worker"),
        ]);
        assert_eq!(flipped.case_manager, "Injured Worker");
        assert_eq!(flipped.counterpart, "CM");
    }
}
