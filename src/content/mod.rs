//! Static C.A.R.E. content consumed by the call engine
//!
//! Pillars, suggested questions, canned demo replies, red-flag patterns
//! and demo scripts. Loaded once into an immutable `CareContent` and
//! shared between sessions behind an `Arc`.

mod model;
mod replies;

pub use model::{DialogueScript, ScriptPair, ScriptedLine};
pub use replies::{CannedReply, ReplyResolution, ReplyTable};

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::care::{Pillar, PillarKey, Question, RedFlagRule, StakeholderRole};
use crate::error::{ContentError, ContentResult};

/// Built-in content shipped with the crate
pub const DEFAULT_CONTENT: &str = include_str!("defaults.toml");

static EMPTY_SCRIPT: DialogueScript = DialogueScript {
    opening: Vec::new(),
    pairs: Vec::new(),
};

#[derive(Debug, Deserialize)]
struct RawContent {
    filler_reply: String,
    pillars: Vec<RawPillar>,
    #[serde(default)]
    questions: Vec<RawQuestion>,
    #[serde(default)]
    replies: Vec<CannedReply>,
    #[serde(default)]
    red_flags: Vec<RawRedFlag>,
    #[serde(default)]
    scripts: Vec<RawScript>,
}

#[derive(Debug, Deserialize)]
struct RawPillar {
    key: PillarKey,
    label: String,
    #[serde(default)]
    description: String,
    keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawQuestion {
    pillar: PillarKey,
    role: StakeholderRole,
    text: String,
    #[serde(default)]
    signals: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawRedFlag {
    pattern: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RawScript {
    role: StakeholderRole,
    #[serde(default)]
    opening: Vec<ScriptedLine>,
    #[serde(default)]
    pairs: Vec<ScriptPair>,
}

/// Immutable content tables for the whole process
#[derive(Debug, Clone)]
pub struct CareContent {
    pillars: Vec<Pillar>,
    questions: HashMap<(PillarKey, StakeholderRole), Vec<Question>>,
    replies: ReplyTable,
    red_flags: Vec<RedFlagRule>,
    scripts: HashMap<StakeholderRole, DialogueScript>,
}

impl CareContent {
    /// Content embedded in the binary
    pub fn builtin() -> ContentResult<Self> {
        Self::from_toml_str(DEFAULT_CONTENT)
    }

    pub fn from_toml_str(source: &str) -> ContentResult<Self> {
        let raw: RawContent = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        Self::from_raw(raw)
    }

    /// Load a complete content document from disk (format from extension)
    pub fn from_file(path: impl AsRef<Path>) -> ContentResult<Self> {
        let path = path.as_ref();
        info!("Loading C.A.R.E. content from {}", path.display());

        let raw: RawContent = config::Config::builder()
            .add_source(config::File::from(path))
            .build()?
            .try_deserialize()?;

        Self::from_raw(raw)
    }

    fn from_raw(raw: RawContent) -> ContentResult<Self> {
        let mut by_key: HashMap<PillarKey, Pillar> = HashMap::new();
        for p in raw.pillars {
            let pillar = Pillar::new(p.key, p.label, p.description, &p.keywords);
            if pillar.keywords.is_empty() {
                return Err(ContentError::EmptyKeywords(p.key));
            }
            if by_key.insert(p.key, pillar).is_some() {
                return Err(ContentError::DuplicatePillar(p.key));
            }
        }

        let mut pillars = Vec::with_capacity(PillarKey::ALL.len());
        for key in PillarKey::ALL {
            let pillar = by_key.remove(&key).ok_or(ContentError::MissingPillar(key))?;
            pillars.push(pillar);
        }

        let mut questions: HashMap<(PillarKey, StakeholderRole), Vec<Question>> = HashMap::new();
        for q in raw.questions {
            questions.entry((q.pillar, q.role)).or_default().push(Question {
                text: q.text,
                signals: q
                    .signals
                    .into_iter()
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect(),
            });
        }

        let red_flags = raw
            .red_flags
            .iter()
            .map(|rf| RedFlagRule::new(&rf.pattern, rf.message.clone()))
            .collect::<ContentResult<Vec<_>>>()?;

        let scripts = raw
            .scripts
            .into_iter()
            .map(|s| {
                (
                    s.role,
                    DialogueScript {
                        opening: s.opening,
                        pairs: s.pairs,
                    },
                )
            })
            .collect();

        Ok(Self {
            pillars,
            questions,
            replies: ReplyTable::new(raw.replies, raw.filler_reply),
            red_flags,
            scripts,
        })
    }

    /// Pillars in framework order (C, A, R, E)
    pub fn pillars(&self) -> &[Pillar] {
        &self.pillars
    }

    pub fn pillar(&self, key: PillarKey) -> Option<&Pillar> {
        self.pillars.iter().find(|p| p.key == key)
    }

    /// Questions for a pillar and role, falling back to the worker list
    pub fn questions_for(&self, pillar: PillarKey, role: StakeholderRole) -> &[Question] {
        self.questions
            .get(&(pillar, role))
            .filter(|list| !list.is_empty())
            .or_else(|| self.questions.get(&(pillar, StakeholderRole::FALLBACK)))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn replies(&self) -> &ReplyTable {
        &self.replies
    }

    pub fn red_flags(&self) -> &[RedFlagRule] {
        &self.red_flags
    }

    /// Demo script for a role, falling back to the worker script
    pub fn script_for(&self, role: StakeholderRole) -> &DialogueScript {
        self.scripts
            .get(&role)
            .or_else(|| self.scripts.get(&StakeholderRole::FALLBACK))
            .unwrap_or(&EMPTY_SCRIPT)
    }
}
