//! Error types for the call-session engine

use thiserror::Error;

use crate::care::PillarKey;

/// Result type alias for speech capability operations
pub type SpeechResult<T> = Result<T, SpeechError>;

/// Result type alias for content loading
pub type ContentResult<T> = Result<T, ContentError>;

/// Result type alias for session handle operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Failures reported by a speech recognition capability.
///
/// Neither is fatal to a call: live ingestion is disabled and the
/// microphone status reflects the failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpeechError {
    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("speech recognition unsupported: {0}")]
    Unsupported(String),
}

/// Errors raised while loading the C.A.R.E. content tables
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("failed to read content: {0}")]
    Load(#[from] config::ConfigError),

    #[error("pillar {0:?} is not defined")]
    MissingPillar(PillarKey),

    #[error("pillar {0:?} is defined more than once")]
    DuplicatePillar(PillarKey),

    #[error("pillar {0:?} has no keywords")]
    EmptyKeywords(PillarKey),

    #[error("invalid red-flag pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("unknown value {value:?} for {field}")]
    UnknownValue { field: &'static str, value: String },
}

/// Errors surfaced by a `SessionHandle`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("call {0} is no longer running")]
    Closed(String),
}
