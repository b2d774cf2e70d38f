//! Live speech ingestion
//!
//! This module wraps an external continuous speech-recognition capability:
//! - `SpeechRecognizer` trait for the capability (start/stop/events)
//! - `SpeechIngestion` adapter with silence-gap diarization and
//!   restart-on-end handling
//! - NATS-backed recognizer fed by an external STT service
//! - Scripted recognizer for tests and simulations

mod adapter;
mod nats;
mod recognizer;
mod scripted;

pub use adapter::{IngestionConfig, SpeechIngestion};
pub use nats::{NatsRecognizer, NatsSpeechSource};
pub use recognizer::{
    MicState, RecognitionError, RecognitionEvent, SpeechRecognizer, SpeechSource,
};
pub use scripted::{ScriptedFeed, ScriptedRecognizer};
