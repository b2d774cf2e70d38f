use futures::stream::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::recognizer::{RecognitionEvent, SpeechRecognizer, SpeechSource};
use crate::error::{SpeechError, SpeechResult};
use crate::nats::{NatsClient, TranscriptMessage};

/// Live recognizer backed by an STT service publishing on NATS
pub struct NatsRecognizer {
    url: String,
    session_id: String,
    client: Option<NatsClient>,
    forwarder: Option<JoinHandle<()>>,
}

impl NatsRecognizer {
    pub fn new(url: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            session_id: session_id.into(),
            client: None,
            forwarder: None,
        }
    }
}

#[async_trait::async_trait]
impl SpeechRecognizer for NatsRecognizer {
    async fn start(&mut self, locale: &str) -> SpeechResult<mpsc::Receiver<RecognitionEvent>> {
        if self.client.is_none() {
            let client = NatsClient::connect(&self.url, self.session_id.clone())
                .await
                .map_err(|e| SpeechError::Unsupported(format!("{:#}", e)))?;
            self.client = Some(client);
        }
        let Some(client) = self.client.as_ref() else {
            return Err(SpeechError::Unsupported("NATS client unavailable".to_string()));
        };

        info!(
            "Listening for {} transcripts for session {}",
            locale, self.session_id
        );
        let subscriber = client
            .subscribe_transcripts()
            .await
            .map_err(|e| SpeechError::Unsupported(format!("{:#}", e)))?;

        let (tx, rx) = mpsc::channel(100);
        let session_id = self.session_id.clone();

        let forwarder = tokio::spawn(async move {
            forward(subscriber.map(|msg| msg.payload), &session_id, tx).await;
        });

        if let Some(previous) = self.forwarder.replace(forwarder) {
            previous.abort();
        }

        Ok(rx)
    }

    async fn stop(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
    }

    fn name(&self) -> &str {
        "nats"
    }
}

/// Map one STT payload to a recognition event for `session_id`.
///
/// Other sessions' transcripts and malformed payloads yield `None`.
fn to_event(payload: &[u8], session_id: &str) -> Option<RecognitionEvent> {
    let transcript = match serde_json::from_slice::<TranscriptMessage>(payload) {
        Ok(transcript) => transcript,
        Err(e) => {
            warn!("Failed to parse transcript message: {}", e);
            return None;
        }
    };

    if transcript.session_id != session_id {
        return None;
    }

    Some(RecognitionEvent::Result {
        text: transcript.text,
        is_final: !transcript.partial,
    })
}

/// Forward this call's transcripts until the subscription closes, then
/// report the end of the stream
async fn forward<S, P>(payloads: S, session_id: &str, tx: mpsc::Sender<RecognitionEvent>)
where
    S: Stream<Item = P>,
    P: AsRef<[u8]>,
{
    futures::pin_mut!(payloads);
    while let Some(payload) = payloads.next().await {
        let Some(event) = to_event(payload.as_ref(), session_id) else {
            continue;
        };
        if tx.send(event).await.is_err() {
            return;
        }
    }

    let _ = tx.send(RecognitionEvent::End).await;
}

/// Creates a NATS recognizer per live call
#[derive(Debug, Clone)]
pub struct NatsSpeechSource {
    url: String,
}

impl NatsSpeechSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl SpeechSource for NatsSpeechSource {
    fn recognizer(&self, call_id: &str) -> Box<dyn SpeechRecognizer> {
        Box::new(NatsRecognizer::new(self.url.clone(), call_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(session_id: &str, text: &str, partial: bool) -> Vec<u8> {
        serde_json::to_vec(&TranscriptMessage {
            session_id: session_id.to_string(),
            text: text.to_string(),
            partial,
            timestamp: "2025-10-27T14:30:05Z".to_string(),
            confidence: Some(0.9),
        })
        .unwrap()
    }

    #[test]
    fn test_final_transcript_for_this_call() {
        let event = to_event(&payload("call-jamie", "Still sore", false), "call-jamie");
        assert_eq!(
            event,
            Some(RecognitionEvent::Result {
                text: "Still sore".to_string(),
                is_final: true,
            })
        );
    }

    #[test]
    fn test_partial_transcript_is_interim() {
        let event = to_event(&payload("call-jamie", "still", true), "call-jamie");
        assert_eq!(
            event,
            Some(RecognitionEvent::Result {
                text: "still".to_string(),
                is_final: false,
            })
        );
    }

    #[test]
    fn test_other_sessions_are_dropped() {
        assert_eq!(to_event(&payload("call-other", "Hello", false), "call-jamie"), None);
    }

    #[tokio::test]
    async fn test_forward_filters_and_ends_stream() {
        let payloads = futures::stream::iter(vec![
            payload("call-jamie", "still", true),
            payload("call-other", "Hello", false),
            b"garbage".to_vec(),
            payload("call-jamie", "Still sore", false),
        ]);
        let (tx, mut rx) = mpsc::channel(8);

        forward(payloads, "call-jamie", tx).await;

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                RecognitionEvent::Result {
                    text: "still".to_string(),
                    is_final: false,
                },
                RecognitionEvent::Result {
                    text: "Still sore".to_string(),
                    is_final: true,
                },
                RecognitionEvent::End,
            ]
        );
    }

    #[test]
    fn test_malformed_payload_is_skipped() {
        assert_eq!(to_event(b"not json", "call-jamie"), None);
        assert_eq!(to_event(br#"{"session_id":"call-jamie"}"#, "call-jamie"), None);
    }
}
