use anyhow::{Context, Result};
use async_nats::Client;
use tracing::info;

/// Subject the STT service publishes partial and final transcripts on
pub const TRANSCRIPT_SUBJECT: &str = "stt.text.>";

pub struct NatsClient {
    client: Client,
    call_id: String,
}

impl NatsClient {
    /// Connect to NATS server
    pub async fn connect(url: &str, call_id: String) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully (call {})", call_id);

        Ok(Self { client, call_id })
    }

    /// Subscribe to transcript messages
    pub async fn subscribe_transcripts(&self) -> Result<async_nats::Subscriber> {
        // The STT service publishes to stt.text.partial and stt.text.final
        // for every session; callers filter by session_id in the payload
        info!(
            "Subscribing to transcripts on {} for call {}",
            TRANSCRIPT_SUBJECT, self.call_id
        );

        let subscriber = self
            .client
            .subscribe(TRANSCRIPT_SUBJECT)
            .await
            .context("Failed to subscribe to transcripts")?;

        Ok(subscriber)
    }
}
