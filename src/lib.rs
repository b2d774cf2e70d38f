pub mod care;
pub mod config;
pub mod content;
pub mod error;
pub mod http;
pub mod nats;
pub mod session;
pub mod speech;
pub mod timeline;

pub use care::{CoverageReport, CoverageScorer, PillarKey, RedFlagDetector, StakeholderRole};
pub use config::Config;
pub use content::CareContent;
pub use error::{ContentError, SessionError, SpeechError};
pub use http::{create_router, AppState};
pub use nats::{NatsClient, TranscriptMessage};
pub use session::{CallMode, CallSession, SessionConfig, SessionHandle, SessionStatus};
pub use speech::{NatsSpeechSource, ScriptedRecognizer, SpeechRecognizer, SpeechSource};
pub use timeline::{InjectOutcome, TimelineScheduler};
