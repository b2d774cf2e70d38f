use chrono::{DateTime, Utc};
use serde::Serialize;

use super::config::CallMode;
use super::transcript::{SpeakerLabels, TranscriptLine};
use crate::care::{CoverageReport, PillarKey, RedFlagAlert, StakeholderRole};
use crate::speech::MicState;
use crate::timeline::TimelineState;

/// Coarse call lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Active,
    /// Terminal: no further lines are accepted
    Ended,
}

/// Snapshot of everything a presentation or report needs about a call
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub call_id: String,
    pub role: StakeholderRole,
    pub mode: CallMode,
    pub phase: SessionPhase,

    /// When the call started
    pub started_at: DateTime<Utc>,

    /// Whole seconds on the call, frozen once ended
    pub elapsed_secs: u64,

    /// Elapsed time as MM:SS
    pub elapsed: String,

    pub coverage: CoverageReport,

    /// Percentage of pillars at least partially covered
    pub completeness: u8,

    /// Pillar whose questions should be shown by default
    pub suggested_pillar: PillarKey,

    pub red_flags: Vec<RedFlagAlert>,

    pub timeline: TimelineState,

    /// Position in the demo script
    pub script_index: usize,

    /// A scripted line is on its way (demo typing indicator)
    pub typing: bool,

    pub mic_state: MicState,

    pub listening: bool,

    /// Inferred speaker labels for live calls
    pub speakers: SpeakerLabels,

    /// Number of final transcript lines
    pub transcript_lines: usize,

    pub actions: Vec<String>,
}

/// Notifications published while a call runs
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    LineAppended { index: usize, line: TranscriptLine },
    InterimUpdated { line: TranscriptLine },
    RedFlagRaised { alert: RedFlagAlert },
    ScriptFinished,
    Ended { elapsed_secs: u64 },
}

/// Format whole seconds as MM:SS
pub fn format_elapsed(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
