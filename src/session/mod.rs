//! Call session management
//!
//! This module provides the `CallSession` engine that manages:
//! - The append-only transcript
//! - Coverage, question and red-flag signals derived from it
//! - The scripted timeline (demo calls) or live speech ingestion
//! - Session phase, elapsed time and follow-up actions

mod config;
mod session;
mod status;
mod transcript;

pub use config::{CallMode, SessionConfig};
pub use session::{CallSession, SessionHandle};
pub use status::{format_elapsed, SessionEvent, SessionPhase, SessionStatus};
pub use transcript::{SpeakerLabels, TranscriptLine, TranscriptStore, CASE_MANAGER, UNKNOWN_CALLER};
