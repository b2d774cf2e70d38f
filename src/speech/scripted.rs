use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

use super::recognizer::{RecognitionEvent, SpeechRecognizer};
use crate::error::{SpeechError, SpeechResult};

#[derive(Debug, Default)]
struct FeedState {
    sender: Option<mpsc::Sender<RecognitionEvent>>,
    fail_next_start: Option<SpeechError>,
    last_locale: Option<String>,
    starts: usize,
    stops: usize,
}

/// Recognizer whose events are pushed through a `ScriptedFeed`.
///
/// Used to simulate a microphone in tests and offline runs.
pub struct ScriptedRecognizer {
    state: Arc<Mutex<FeedState>>,
}

/// Control side of a `ScriptedRecognizer`
#[derive(Clone)]
pub struct ScriptedFeed {
    state: Arc<Mutex<FeedState>>,
}

impl ScriptedRecognizer {
    pub fn new() -> (Self, ScriptedFeed) {
        let state = Arc::new(Mutex::new(FeedState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            ScriptedFeed { state },
        )
    }
}

fn lock(state: &Mutex<FeedState>) -> MutexGuard<'_, FeedState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait::async_trait]
impl SpeechRecognizer for ScriptedRecognizer {
    async fn start(&mut self, locale: &str) -> SpeechResult<mpsc::Receiver<RecognitionEvent>> {
        let mut state = lock(&self.state);
        state.starts += 1;
        state.last_locale = Some(locale.to_string());
        if let Some(error) = state.fail_next_start.take() {
            return Err(error);
        }

        let (tx, rx) = mpsc::channel(64);
        state.sender = Some(tx);
        Ok(rx)
    }

    async fn stop(&mut self) {
        let mut state = lock(&self.state);
        state.stops += 1;
        state.sender = None;
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

impl ScriptedFeed {
    /// Deliver an event on the current stream. Returns false if no
    /// stream is open.
    pub async fn send(&self, event: RecognitionEvent) -> bool {
        let sender = lock(&self.state).sender.clone();
        match sender {
            Some(sender) => sender.send(event).await.is_ok(),
            None => false,
        }
    }

    pub async fn say(&self, text: &str, is_final: bool) -> bool {
        self.send(RecognitionEvent::Result {
            text: text.to_string(),
            is_final,
        })
        .await
    }

    /// Make the next `start` call fail
    pub fn fail_next_start(&self, error: SpeechError) {
        lock(&self.state).fail_next_start = Some(error);
    }

    pub fn starts(&self) -> usize {
        lock(&self.state).starts
    }

    pub fn stops(&self) -> usize {
        lock(&self.state).stops
    }

    pub fn last_locale(&self) -> Option<String> {
        lock(&self.state).last_locale.clone()
    }
}
