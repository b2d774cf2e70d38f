use crate::content::CareContent;
use crate::session::{SessionConfig, SessionHandle};
use crate::speech::SpeechSource;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Calls started since the process came up (call_id → handle)
    pub sessions: Arc<RwLock<HashMap<String, SessionHandle>>>,

    /// Content shared by every call
    pub content: Arc<CareContent>,

    /// Template for new sessions (delays, silence gap, locale)
    pub defaults: SessionConfig,

    /// Recognizer factory for live calls; live calls degrade without one
    pub speech: Option<Arc<dyn SpeechSource>>,
}

impl AppState {
    pub fn new(content: Arc<CareContent>, defaults: SessionConfig) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            content,
            defaults,
            speech: None,
        }
    }

    pub fn with_speech_source(mut self, source: Arc<dyn SpeechSource>) -> Self {
        self.speech = Some(source);
        self
    }

    /// Look up a call by id
    pub async fn session(&self, call_id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(call_id).cloned()
    }
}
