use serde::Serialize;
use tokio::sync::mpsc;

use crate::error::SpeechResult;

/// Error codes a recognizer can report mid-stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionError {
    /// Microphone access was refused; fatal for live ingestion
    NotAllowed,
    /// Nothing was heard for a while
    NoSpeech,
    /// Recognition was interrupted
    Aborted,
    Other(String),
}

/// A single event from a continuous recognizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// Recognized text, provisional unless `is_final`
    Result { text: String, is_final: bool },
    Error(RecognitionError),
    /// The recognition stream ended
    End,
}

/// Microphone lifecycle as seen by the call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MicState {
    Idle,
    Requesting,
    Granted,
    Denied,
    Unsupported,
}

/// Continuous, interim-capable speech recognition capability
///
/// Implementations:
/// - NATS: transcripts from an external STT service
/// - Scripted: events pushed by a test or simulator
#[async_trait::async_trait]
pub trait SpeechRecognizer: Send {
    /// Start recognizing in continuous mode with interim results.
    ///
    /// Returns a channel of recognition events. Fails with
    /// `PermissionDenied` or `Unsupported`.
    async fn start(&mut self, locale: &str) -> SpeechResult<mpsc::Receiver<RecognitionEvent>>;

    /// Stop recognizing
    async fn stop(&mut self);

    /// Get recognizer name for logging
    fn name(&self) -> &str;
}

/// Creates a recognizer for each live call
pub trait SpeechSource: Send + Sync {
    fn recognizer(&self, call_id: &str) -> Box<dyn SpeechRecognizer>;
}
