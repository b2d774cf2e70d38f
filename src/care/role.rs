use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ContentError;

/// Who the case manager is speaking with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", rename_all = "lowercase")]
pub enum StakeholderRole {
    Worker,
    Employer,
    Medical,
    Legal,
}

impl StakeholderRole {
    /// Role whose questions and script are used when a role has none of its own
    pub const FALLBACK: StakeholderRole = StakeholderRole::Worker;

    pub fn as_str(&self) -> &'static str {
        match self {
            StakeholderRole::Worker => "worker",
            StakeholderRole::Employer => "employer",
            StakeholderRole::Medical => "medical",
            StakeholderRole::Legal => "legal",
        }
    }

    /// Display label, also used for the counterpart speaker in live calls
    pub fn label(&self) -> &'static str {
        match self {
            StakeholderRole::Worker => "Injured Worker",
            StakeholderRole::Employer => "Employer / HR",
            StakeholderRole::Medical => "Medical Provider",
            StakeholderRole::Legal => "Legal Representative",
        }
    }

    /// Speaker label for scripted counterpart lines
    pub fn responder_label(&self) -> &'static str {
        match self {
            StakeholderRole::Worker => "Worker",
            StakeholderRole::Employer => "Employer",
            StakeholderRole::Medical => "Medical",
            StakeholderRole::Legal => "Legal",
        }
    }
}

impl fmt::Display for StakeholderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StakeholderRole {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "worker" => Ok(StakeholderRole::Worker),
            "employer" => Ok(StakeholderRole::Employer),
            "medical" => Ok(StakeholderRole::Medical),
            "legal" => Ok(StakeholderRole::Legal),
            _ => Err(ContentError::UnknownValue {
                field: "role",
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for StakeholderRole {
    type Error = ContentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
