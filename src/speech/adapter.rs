use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::recognizer::{MicState, RecognitionError, RecognitionEvent, SpeechRecognizer};
use crate::error::{SpeechError, SpeechResult};
use crate::session::TranscriptLine;

/// Which side of the call is assumed to be talking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Turn {
    CaseManager,
    Counterpart,
}

impl Turn {
    fn flipped(self) -> Self {
        match self {
            Turn::CaseManager => Turn::Counterpart,
            Turn::Counterpart => Turn::CaseManager,
        }
    }
}

/// Settings for live speech ingestion
#[derive(Debug, Clone)]
pub struct IngestionConfig {
    pub locale: String,
    /// Silence after which the next utterance is attributed to the other side
    pub silence_gap: Duration,
    pub case_manager_label: String,
    pub counterpart_label: String,
}

/// Turns recognizer events into transcript lines for a two-party call.
///
/// Diarization is naive: the first utterance belongs to the case manager
/// and the speaker flips whenever a silence gap elapses.
pub struct SpeechIngestion {
    recognizer: Box<dyn SpeechRecognizer>,
    config: IngestionConfig,
    mic_state: MicState,
    /// True between a successful `start` and `stop`
    listening: bool,
    events: Option<mpsc::Receiver<RecognitionEvent>>,
    turn: Turn,
    silence_due: Option<Instant>,
    interim: Option<String>,
    restarts: usize,
}

impl SpeechIngestion {
    pub fn new(recognizer: Box<dyn SpeechRecognizer>, config: IngestionConfig) -> Self {
        Self {
            recognizer,
            config,
            mic_state: MicState::Idle,
            listening: false,
            events: None,
            turn: Turn::CaseManager,
            silence_due: None,
            interim: None,
            restarts: 0,
        }
    }

    /// Request the microphone and begin listening
    pub async fn start(&mut self) -> SpeechResult<()> {
        if self.listening {
            warn!("Speech ingestion already started");
            return Ok(());
        }

        info!(
            "Starting speech recognition via {} ({})",
            self.recognizer.name(),
            self.config.locale
        );
        self.mic_state = MicState::Requesting;

        match self.recognizer.start(&self.config.locale).await {
            Ok(events) => {
                self.events = Some(events);
                self.listening = true;
                self.mic_state = MicState::Granted;
                self.turn = Turn::CaseManager;
                self.interim = None;
                Ok(())
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Stop listening. The recognizer is not restarted afterwards.
    pub async fn stop(&mut self) {
        if !self.listening && self.events.is_none() {
            return;
        }

        info!("Stopping speech recognition via {}", self.recognizer.name());
        self.listening = false;
        self.events = None;
        self.silence_due = None;
        self.interim = None;
        self.recognizer.stop().await;
    }

    /// Wait for the next recognizer event.
    ///
    /// `None` means the event stream closed. Never resolves while no
    /// stream is open.
    pub async fn next_event(&mut self) -> Option<RecognitionEvent> {
        match self.events.as_mut() {
            Some(events) => events.recv().await,
            None => std::future::pending().await,
        }
    }

    /// Apply one recognizer event; returns the line to show, if any
    pub async fn handle_event(
        &mut self,
        event: Option<RecognitionEvent>,
        now: Instant,
    ) -> Option<TranscriptLine> {
        match event {
            Some(RecognitionEvent::Result { text, is_final }) => {
                self.silence_due = Some(now + self.config.silence_gap);

                let text = text.trim();
                if text.is_empty() {
                    return None;
                }

                let line = TranscriptLine {
                    speaker: self.current_speaker().to_string(),
                    text: text.to_string(),
                    is_final,
                };
                self.interim = if is_final { None } else { Some(line.text.clone()) };
                Some(line)
            }
            Some(RecognitionEvent::Error(RecognitionError::NotAllowed)) => {
                warn!("Microphone access revoked, stopping live ingestion");
                self.stop().await;
                self.mic_state = MicState::Denied;
                None
            }
            Some(RecognitionEvent::Error(error)) => {
                debug!("Recognition error tolerated: {:?}", error);
                None
            }
            Some(RecognitionEvent::End) | None => {
                self.restart().await;
                None
            }
        }
    }

    /// The silence gap elapsed: the next utterance is the other speaker's
    pub fn on_silence(&mut self) {
        self.silence_due = None;
        self.turn = self.turn.flipped();
        debug!("Silence gap, next speaker is {}", self.current_speaker());
    }

    pub fn silence_due(&self) -> Option<Instant> {
        self.silence_due
    }

    pub fn mic_state(&self) -> MicState {
        self.mic_state
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Whether an event stream is open
    pub fn has_stream(&self) -> bool {
        self.events.is_some()
    }

    pub fn interim(&self) -> Option<&str> {
        self.interim.as_deref()
    }

    pub fn restarts(&self) -> usize {
        self.restarts
    }

    pub fn current_speaker(&self) -> &str {
        match self.turn {
            Turn::CaseManager => &self.config.case_manager_label,
            Turn::Counterpart => &self.config.counterpart_label,
        }
    }

    async fn restart(&mut self) {
        self.events = None;
        if !self.listening {
            debug!("Recognition ended after stop");
            return;
        }

        self.restarts += 1;
        info!(
            "Recognition ended unexpectedly, restarting {} (restart #{})",
            self.recognizer.name(),
            self.restarts
        );
        match self.recognizer.start(&self.config.locale).await {
            Ok(events) => {
                // Every fresh recognition stream starts with the case manager
                self.events = Some(events);
                self.turn = Turn::CaseManager;
            }
            Err(e) => self.fail(&e),
        }
    }

    fn fail(&mut self, error: &SpeechError) {
        warn!("Speech recognition unavailable: {}", error);
        self.listening = false;
        self.events = None;
        self.silence_due = None;
        self.mic_state = match error {
            SpeechError::PermissionDenied => MicState::Denied,
            SpeechError::Unsupported(_) => MicState::Unsupported,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::ScriptedRecognizer;

    fn config() -> IngestionConfig {
        IngestionConfig {
            locale: "en-AU".to_string(),
            silence_gap: Duration::from_millis(2200),
            case_manager_label: "CM".to_string(),
            counterpart_label: "Injured Worker".to_string(),
        }
    }

    fn result(text: &str, is_final: bool) -> Option<RecognitionEvent> {
        Some(RecognitionEvent::Result {
            text: text.to_string(),
            is_final,
        })
    }

    #[tokio::test]
    async fn test_start_grants_microphone() {
        let (recognizer, feed) = ScriptedRecognizer::new();
        let mut ingestion = SpeechIngestion::new(Box::new(recognizer), config());

        ingestion.start().await.unwrap();
        assert_eq!(ingestion.mic_state(), MicState::Granted);
        assert!(ingestion.is_listening());
        assert_eq!(feed.starts(), 1);
        assert_eq!(feed.last_locale().as_deref(), Some("en-AU"));
    }

    #[tokio::test]
    async fn test_start_failures_degrade_mic_state() {
        let (recognizer, feed) = ScriptedRecognizer::new();
        feed.fail_next_start(SpeechError::PermissionDenied);
        let mut ingestion = SpeechIngestion::new(Box::new(recognizer), config());

        assert_eq!(ingestion.start().await, Err(SpeechError::PermissionDenied));
        assert_eq!(ingestion.mic_state(), MicState::Denied);
        assert!(!ingestion.is_listening());

        let (recognizer, feed) = ScriptedRecognizer::new();
        feed.fail_next_start(SpeechError::Unsupported("no engine".to_string()));
        let mut ingestion = SpeechIngestion::new(Box::new(recognizer), config());
        assert!(ingestion.start().await.is_err());
        assert_eq!(ingestion.mic_state(), MicState::Unsupported);
    }

    #[tokio::test]
    async fn test_silence_flips_speaker_for_next_utterance() {
        let (recognizer, _feed) = ScriptedRecognizer::new();
        let mut ingestion = SpeechIngestion::new(Box::new(recognizer), config());
        ingestion.start().await.unwrap();
        let t0 = Instant::now();

        let line = ingestion.handle_event(result("Hi Jamie", true), t0).await.unwrap();
        assert_eq!(line.speaker, "CM");
        assert_eq!(ingestion.silence_due(), Some(t0 + Duration::from_millis(2200)));

        ingestion.on_silence();
        assert!(ingestion.silence_due().is_none());

        let line = ingestion.handle_event(result("Hi Alex", true), t0).await.unwrap();
        assert_eq!(line.speaker, "Injured Worker");

        ingestion.on_silence();
        let line = ingestion.handle_event(result("How are you", true), t0).await.unwrap();
        assert_eq!(line.speaker, "CM");
    }

    #[tokio::test]
    async fn test_interim_then_final() {
        let (recognizer, _feed) = ScriptedRecognizer::new();
        let mut ingestion = SpeechIngestion::new(Box::new(recognizer), config());
        ingestion.start().await.unwrap();
        let now = Instant::now();

        let interim = ingestion.handle_event(result(" still sore ", false), now).await.unwrap();
        assert!(!interim.is_final);
        assert_eq!(interim.text, "still sore");
        assert_eq!(ingestion.interim(), Some("still sore"));

        let final_line = ingestion
            .handle_event(result("Still sore in the mornings", true), now)
            .await
            .unwrap();
        assert!(final_line.is_final);
        assert!(ingestion.interim().is_none());

        assert!(ingestion.handle_event(result("   ", true), now).await.is_none());
    }

    #[tokio::test]
    async fn test_unexpected_end_restarts_recognition() {
        let (recognizer, feed) = ScriptedRecognizer::new();
        let mut ingestion = SpeechIngestion::new(Box::new(recognizer), config());
        ingestion.start().await.unwrap();

        let now = Instant::now();
        ingestion
            .handle_event(Some(RecognitionEvent::Error(RecognitionError::NoSpeech)), now)
            .await;
        assert_eq!(ingestion.mic_state(), MicState::Granted);

        ingestion.handle_event(Some(RecognitionEvent::End), now).await;
        assert_eq!(feed.starts(), 2);
        assert!(ingestion.has_stream());
        assert_eq!(ingestion.restarts(), 1);

        // A closed channel counts as end of stream too
        ingestion.handle_event(None, now).await;
        assert_eq!(feed.starts(), 3);
    }

    #[tokio::test]
    async fn test_restart_hands_turn_back_to_case_manager() {
        let (recognizer, _feed) = ScriptedRecognizer::new();
        let mut ingestion = SpeechIngestion::new(Box::new(recognizer), config());
        ingestion.start().await.unwrap();
        let now = Instant::now();

        ingestion.on_silence();
        assert_eq!(ingestion.current_speaker(), "Injured Worker");

        ingestion.handle_event(Some(RecognitionEvent::End), now).await;
        assert_eq!(ingestion.current_speaker(), "CM");
        let line = ingestion.handle_event(result("Are you still there?", true), now).await.unwrap();
        assert_eq!(line.speaker, "CM");
    }

    #[tokio::test]
    async fn test_no_restart_after_stop() {
        let (recognizer, feed) = ScriptedRecognizer::new();
        let mut ingestion = SpeechIngestion::new(Box::new(recognizer), config());
        ingestion.start().await.unwrap();

        ingestion.stop().await;
        assert_eq!(feed.stops(), 1);
        ingestion.handle_event(Some(RecognitionEvent::End), Instant::now()).await;

        assert_eq!(feed.starts(), 1);
        assert!(!ingestion.is_listening());
        assert!(!ingestion.has_stream());
    }

    #[tokio::test]
    async fn test_not_allowed_forces_stop() {
        let (recognizer, feed) = ScriptedRecognizer::new();
        let mut ingestion = SpeechIngestion::new(Box::new(recognizer), config());
        ingestion.start().await.unwrap();

        let now = Instant::now();
        ingestion
            .handle_event(Some(RecognitionEvent::Error(RecognitionError::NotAllowed)), now)
            .await;
        assert_eq!(ingestion.mic_state(), MicState::Denied);
        assert!(!ingestion.is_listening());
        assert_eq!(feed.stops(), 1);

        ingestion.handle_event(Some(RecognitionEvent::End), now).await;
        assert_eq!(feed.starts(), 1);
    }
}
