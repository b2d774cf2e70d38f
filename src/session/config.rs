use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::care::StakeholderRole;
use crate::timeline::TimelineDelays;

/// How conversation lines reach the transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallMode {
    /// Scripted dialogue dripped by the timeline scheduler
    #[default]
    Demo,
    /// Lines recognized from live speech
    Live,
}

/// Configuration for a call session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Unique call identifier (e.g., "call-2025-10-28-jamie")
    pub call_id: String,

    /// Stakeholder on the other end of the call
    pub role: StakeholderRole,

    pub mode: CallMode,

    /// Delays for the scripted timeline
    pub delays: TimelineDelays,

    /// Silence gap that switches the live speaker
    /// Default: 2200 ms
    pub silence_gap: Duration,

    /// Recognition locale for live calls
    pub locale: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            call_id: format!("call-{}", uuid::Uuid::new_v4()),
            role: StakeholderRole::Worker,
            mode: CallMode::Demo,
            delays: TimelineDelays::default(),
            silence_gap: Duration::from_millis(2200),
            locale: "en-AU".to_string(),
        }
    }
}
