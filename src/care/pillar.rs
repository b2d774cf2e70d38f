use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ContentError;

/// One of the four C.A.R.E. framework pillars.
///
/// Declaration order is the framework order and drives `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum PillarKey {
    /// Capacity: medical status and functional ability
    C,
    /// Alignment: employer support and accommodations
    A,
    /// Recovery barriers: psychosocial and compliance obstacles
    R,
    /// Engagement: cooperation level
    E,
}

impl PillarKey {
    pub const ALL: [PillarKey; 4] = [PillarKey::C, PillarKey::A, PillarKey::R, PillarKey::E];

    pub fn as_str(&self) -> &'static str {
        match self {
            PillarKey::C => "C",
            PillarKey::A => "A",
            PillarKey::R => "R",
            PillarKey::E => "E",
        }
    }
}

impl fmt::Display for PillarKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PillarKey {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "C" => Ok(PillarKey::C),
            "A" => Ok(PillarKey::A),
            "R" => Ok(PillarKey::R),
            "E" => Ok(PillarKey::E),
            _ => Err(ContentError::UnknownValue {
                field: "pillar",
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for PillarKey {
    type Error = ContentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A framework pillar with its weighted keyword list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pillar {
    pub key: PillarKey,
    pub label: String,
    pub description: String,
    /// Lower-cased, deduplicated keywords
    pub keywords: Vec<String>,
}

impl Pillar {
    pub fn new(
        key: PillarKey,
        label: impl Into<String>,
        description: impl Into<String>,
        keywords: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Self {
        let mut normalized: Vec<String> = Vec::new();
        for keyword in keywords {
            let keyword = keyword.as_ref().trim().to_lowercase();
            if !keyword.is_empty() && !normalized.contains(&keyword) {
                normalized.push(keyword);
            }
        }

        Self {
            key,
            label: label.into(),
            description: description.into(),
            keywords: normalized,
        }
    }
}
