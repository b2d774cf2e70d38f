use serde::{Deserialize, Serialize};
use tracing::debug;

/// A reply keyed by a substring of the injected question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CannedReply {
    pub key: String,
    pub reply: String,
}

/// Outcome of looking up a reply for an injected question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyResolution<'a> {
    Matched { key: &'a str, reply: &'a str },
    /// No key matched; the generic filler is used
    Filler(&'a str),
}

impl<'a> ReplyResolution<'a> {
    pub fn reply(&self) -> &'a str {
        match self {
            ReplyResolution::Matched { reply, .. } => reply,
            ReplyResolution::Filler(reply) => reply,
        }
    }
}

/// Ordered canned replies plus the generic filler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyTable {
    entries: Vec<CannedReply>,
    filler: String,
}

impl ReplyTable {
    pub fn new(entries: Vec<CannedReply>, filler: impl Into<String>) -> Self {
        let entries = entries
            .into_iter()
            .map(|entry| CannedReply {
                key: entry.key.trim().to_lowercase(),
                reply: entry.reply,
            })
            .filter(|entry| !entry.key.is_empty())
            .collect();

        Self {
            entries,
            filler: filler.into(),
        }
    }

    /// First entry whose key occurs in the lower-cased question
    pub fn resolve(&self, question: &str) -> ReplyResolution<'_> {
        let question = question.to_lowercase();
        match self.entries.iter().find(|e| question.contains(&e.key)) {
            Some(entry) => ReplyResolution::Matched {
                key: &entry.key,
                reply: &entry.reply,
            },
            None => {
                debug!("No canned reply for {:?}, using filler", question);
                ReplyResolution::Filler(&self.filler)
            }
        }
    }

    pub fn filler(&self) -> &str {
        &self.filler
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ReplyTable {
        ReplyTable::new(
            vec![
                CannedReply {
                    key: "contact with your employer".to_string(),
                    reply: "My manager sent a message early on.".to_string(),
                },
                CannedReply {
                    key: "Returning To Work".to_string(),
                    reply: "A bit anxious.".to_string(),
                },
                CannedReply {
                    key: "employer".to_string(),
                    reply: "Shadowed by the earlier key.".to_string(),
                },
            ],
            "Things are moving slowly.",
        )
    }

    #[test]
    fn test_first_matching_key_wins() {
        let table = table();
        let resolution =
            table.resolve("Have you had any contact with your employer since the injury?");
        assert_eq!(
            resolution,
            ReplyResolution::Matched {
                key: "contact with your employer",
                reply: "My manager sent a message early on.",
            }
        );
    }

    #[test]
    fn test_keys_match_case_insensitively() {
        let table = table();
        assert_eq!(table.resolve("How do you feel about RETURNING TO WORK?").reply(), "A bit anxious.");
    }

    #[test]
    fn test_unmatched_question_uses_filler() {
        let table = table();
        let resolution = table.resolve("How is the weather?");
        assert_eq!(resolution, ReplyResolution::Filler("Things are moving slowly."));
        assert_eq!(resolution.reply(), table.filler());
    }
}
