use super::config::{CallMode, SessionConfig};
use super::status::{format_elapsed, SessionEvent, SessionPhase, SessionStatus};
use super::transcript::{SpeakerLabels, TranscriptLine, TranscriptStore, CASE_MANAGER};
use crate::care::{
    CoverageReport, CoverageScorer, PillarKey, QuestionCoverage, RedFlagDetector,
};
use crate::content::CareContent;
use crate::error::{SessionError, SessionResult};
use crate::speech::{
    IngestionConfig, MicState, RecognitionEvent, SpeechIngestion, SpeechRecognizer,
};
use crate::timeline::{IgnoreReason, InjectOutcome, TimelineScheduler, TimerToken};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

/// Requests handled by the session event loop
enum SessionCommand {
    Inject {
        question: String,
        reply: oneshot::Sender<InjectOutcome>,
    },
    AddAction {
        text: String,
        reply: oneshot::Sender<bool>,
    },
    End {
        reply: oneshot::Sender<SessionStatus>,
    },
    Status {
        reply: oneshot::Sender<SessionStatus>,
    },
    Transcript {
        reply: oneshot::Sender<Vec<TranscriptLine>>,
    },
    Questions {
        pillar: Option<PillarKey>,
        reply: oneshot::Sender<QuestionCoverage>,
    },
}

/// A live or simulated call.
///
/// All state is owned by a single event-loop task. Timer expiries,
/// recognizer events and commands from `SessionHandle`s are handled one
/// at a time, so no locking is needed.
pub struct CallSession {
    /// Session configuration
    config: SessionConfig,

    content: Arc<CareContent>,

    /// When the session started
    started_at: DateTime<Utc>,
    started: Instant,
    ended: Option<Instant>,

    phase: SessionPhase,

    transcript: TranscriptStore,
    scorer: CoverageScorer,
    coverage: CoverageReport,
    red_flags: RedFlagDetector,

    scheduler: TimelineScheduler,
    script_announced: bool,

    /// Live speech ingestion, if a recognizer was supplied
    speech: Option<SpeechIngestion>,

    /// Case-manager follow-up actions
    actions: Vec<String>,

    events: broadcast::Sender<SessionEvent>,
}

impl CallSession {
    /// Start a call and spawn its event loop.
    ///
    /// Demo calls show the opening lines immediately and start the script
    /// timer. Live calls start the recognizer; if it is missing or fails
    /// the call continues with a degraded microphone status.
    pub async fn start(
        config: SessionConfig,
        content: Arc<CareContent>,
        recognizer: Option<Box<dyn SpeechRecognizer>>,
    ) -> SessionHandle {
        info!(
            "Starting {:?} call {} with {}",
            config.mode, config.call_id, config.role
        );

        let (commands_tx, commands_rx) = mpsc::channel(64);
        let (events, _) = broadcast::channel(256);

        let mut session = Self::new(config, content, events.clone());
        session.begin(recognizer).await;

        let handle = SessionHandle {
            call_id: session.config.call_id.clone(),
            commands: commands_tx,
            events,
        };

        tokio::spawn(session.run(commands_rx));

        handle
    }

    fn new(
        config: SessionConfig,
        content: Arc<CareContent>,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        let scorer = CoverageScorer::new(content.pillars().to_vec());
        let coverage = scorer.score("");
        let scheduler = TimelineScheduler::new(
            Arc::clone(&content),
            config.role,
            config.mode,
            config.delays,
        );

        Self {
            config,
            content,
            started_at: Utc::now(),
            started: Instant::now(),
            ended: None,
            phase: SessionPhase::Active,
            transcript: TranscriptStore::new(),
            scorer,
            coverage,
            red_flags: RedFlagDetector::new(),
            scheduler,
            script_announced: false,
            speech: None,
            actions: Vec::new(),
            events,
        }
    }

    async fn begin(&mut self, recognizer: Option<Box<dyn SpeechRecognizer>>) {
        match self.config.mode {
            CallMode::Demo => {
                let content = Arc::clone(&self.content);
                for line in &content.script_for(self.config.role).opening {
                    self.append_final(&line.speaker, &line.text);
                }
                if self.scheduler.start(Instant::now()).is_some() {
                    debug!(
                        "First scripted line due in {:?}",
                        self.config.delays.cm_line
                    );
                }
            }
            CallMode::Live => {
                self.scheduler.start(Instant::now());

                let Some(recognizer) = recognizer else {
                    warn!("No speech recognizer available for call {}", self.config.call_id);
                    return;
                };

                let mut speech = SpeechIngestion::new(
                    recognizer,
                    IngestionConfig {
                        locale: self.config.locale.clone(),
                        silence_gap: self.config.silence_gap,
                        case_manager_label: CASE_MANAGER.to_string(),
                        counterpart_label: self.config.role.label().to_string(),
                    },
                );
                if let Err(e) = speech.start().await {
                    warn!("Live ingestion disabled for call {}: {}", self.config.call_id, e);
                }
                self.speech = Some(speech);
            }
        }
    }

    /// Event loop: runs until every handle is dropped
    async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        info!("Call session loop started: {}", self.config.call_id);

        loop {
            let timeline = self.scheduler.pending();
            let silence_due = self.speech.as_ref().and_then(|s| s.silence_due());
            let has_stream = self.speech.as_ref().is_some_and(|s| s.has_stream());

            tokio::select! {
                biased;

                _ = sleep_until_opt(timeline.map(|t| t.due)), if timeline.is_some() => {
                    if let Some(timer) = timeline {
                        self.on_timeline_timer(timer.token);
                    }
                }
                _ = sleep_until_opt(silence_due), if silence_due.is_some() => {
                    if let Some(speech) = self.speech.as_mut() {
                        speech.on_silence();
                    }
                }
                event = next_speech_event(&mut self.speech), if has_stream => {
                    self.on_speech_event(event).await;
                }
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        self.end().await;
                        break;
                    }
                },
            }
        }

        info!("Call session loop stopped: {}", self.config.call_id);
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Inject { question, reply } => {
                let outcome = if self.phase == SessionPhase::Ended {
                    InjectOutcome::Ignored {
                        reason: IgnoreReason::CallEnded,
                    }
                } else {
                    self.scheduler.inject(&question, Instant::now())
                };
                let _ = reply.send(outcome);
            }
            SessionCommand::AddAction { text, reply } => {
                let text = text.trim();
                let added = !text.is_empty();
                if added {
                    self.actions.push(text.to_string());
                }
                let _ = reply.send(added);
            }
            SessionCommand::End { reply } => {
                self.end().await;
                let _ = reply.send(self.status());
            }
            SessionCommand::Status { reply } => {
                let _ = reply.send(self.status());
            }
            SessionCommand::Transcript { reply } => {
                let _ = reply.send(self.transcript.snapshot());
            }
            SessionCommand::Questions { pillar, reply } => {
                let pillar = pillar.unwrap_or_else(|| self.coverage.suggested_pillar());
                let questions = self.content.questions_for(pillar, self.config.role);
                let _ = reply.send(QuestionCoverage::classify(
                    pillar,
                    self.config.role,
                    questions,
                    &self.transcript.full_text(),
                ));
            }
        }
    }

    fn on_timeline_timer(&mut self, token: TimerToken) {
        if self.phase == SessionPhase::Ended {
            return;
        }

        if let Some(line) = self.scheduler.fire(token, Instant::now()) {
            self.append_final(&line.speaker, &line.text);
        }

        if !self.script_announced && self.scheduler.script_finished() {
            self.script_announced = true;
            info!("Demo script finished for call {}", self.config.call_id);
            let _ = self.events.send(SessionEvent::ScriptFinished);
        }
    }

    async fn on_speech_event(&mut self, event: Option<RecognitionEvent>) {
        if self.phase == SessionPhase::Ended {
            return;
        }
        let Some(speech) = self.speech.as_mut() else {
            return;
        };

        let Some(line) = speech.handle_event(event, Instant::now()).await else {
            return;
        };

        if line.is_final {
            self.append_final(&line.speaker, &line.text);
        } else if let Some(index) = self.transcript.replace_interim(&line.speaker, &line.text) {
            let line = self.transcript.lines()[index].clone();
            let _ = self.events.send(SessionEvent::InterimUpdated { line });
        }
    }

    /// Append a final line and re-derive coverage and red flags
    fn append_final(&mut self, speaker: &str, text: &str) {
        let Some(index) = self.transcript.append(speaker, text) else {
            return;
        };
        let line = self.transcript.lines()[index].clone();

        self.coverage = self.scorer.score(&self.transcript.full_text());
        let raised = self
            .red_flags
            .scan(self.content.red_flags(), &line, index);

        let _ = self.events.send(SessionEvent::LineAppended { index, line });
        for alert in raised {
            let _ = self.events.send(SessionEvent::RedFlagRaised { alert });
        }
    }

    /// End the call: revoke the timer, stop the microphone, freeze the
    /// transcript. Idempotent.
    async fn end(&mut self) {
        if self.phase == SessionPhase::Ended {
            return;
        }

        if let Some(token) = self.scheduler.end() {
            debug!("Cancelled pending timer {:?}", token);
        }
        if let Some(speech) = self.speech.as_mut() {
            speech.stop().await;
        }
        self.transcript.freeze();
        self.phase = SessionPhase::Ended;
        self.ended = Some(Instant::now());

        let elapsed_secs = self.elapsed_secs();
        info!(
            "Call {} ended after {} ({} lines, {} red flags)",
            self.config.call_id,
            format_elapsed(elapsed_secs),
            self.transcript.final_count(),
            self.red_flags.alerts().len()
        );
        let _ = self.events.send(SessionEvent::Ended { elapsed_secs });
    }

    fn elapsed_secs(&self) -> u64 {
        let until = self.ended.unwrap_or_else(Instant::now);
        until.saturating_duration_since(self.started).as_secs()
    }

    fn mic_state(&self) -> MicState {
        match (&self.speech, self.config.mode) {
            (Some(speech), _) => speech.mic_state(),
            (None, CallMode::Live) => MicState::Unsupported,
            (None, CallMode::Demo) => MicState::Idle,
        }
    }

    fn status(&self) -> SessionStatus {
        let elapsed_secs = self.elapsed_secs();

        SessionStatus {
            call_id: self.config.call_id.clone(),
            role: self.config.role,
            mode: self.config.mode,
            phase: self.phase,
            started_at: self.started_at,
            elapsed_secs,
            elapsed: format_elapsed(elapsed_secs),
            completeness: self.coverage.completeness(),
            suggested_pillar: self.coverage.suggested_pillar(),
            coverage: self.coverage.clone(),
            red_flags: self.red_flags.alerts().to_vec(),
            timeline: self.scheduler.state().clone(),
            script_index: self.scheduler.script_index(),
            typing: self.config.mode == CallMode::Demo
                && self.phase == SessionPhase::Active
                && self.scheduler.pending().is_some(),
            mic_state: self.mic_state(),
            listening: self.speech.as_ref().is_some_and(|s| s.is_listening()),
            speakers: SpeakerLabels::infer(self.transcript.lines()),
            transcript_lines: self.transcript.final_count(),
            actions: self.actions.clone(),
        }
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn next_speech_event(speech: &mut Option<SpeechIngestion>) -> Option<RecognitionEvent> {
    match speech {
        Some(speech) => speech.next_event().await,
        None => std::future::pending().await,
    }
}

/// Cloneable handle for controlling and querying a running call
#[derive(Clone)]
pub struct SessionHandle {
    call_id: String,
    commands: mpsc::Sender<SessionCommand>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    /// Receive lines, red flags and lifecycle notifications
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Ask an ad-hoc question, preempting the demo script
    pub async fn inject(&self, question: impl Into<String>) -> SessionResult<InjectOutcome> {
        let question = question.into();
        self.request(|reply| SessionCommand::Inject { question, reply })
            .await
    }

    /// Record a follow-up action. Returns false for blank text.
    pub async fn add_action(&self, text: impl Into<String>) -> SessionResult<bool> {
        let text = text.into();
        self.request(|reply| SessionCommand::AddAction { text, reply })
            .await
    }

    /// End the call and return the final status
    pub async fn end(&self) -> SessionResult<SessionStatus> {
        self.request(|reply| SessionCommand::End { reply }).await
    }

    pub async fn status(&self) -> SessionResult<SessionStatus> {
        self.request(|reply| SessionCommand::Status { reply }).await
    }

    pub async fn transcript(&self) -> SessionResult<Vec<TranscriptLine>> {
        self.request(|reply| SessionCommand::Transcript { reply })
            .await
    }

    /// Suggested questions for a pillar (default: the suggested pillar)
    pub async fn questions(&self, pillar: Option<PillarKey>) -> SessionResult<QuestionCoverage> {
        self.request(|reply| SessionCommand::Questions { pillar, reply })
            .await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> SessionResult<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| SessionError::Closed(self.call_id.clone()))?;
        response
            .await
            .map_err(|_| SessionError::Closed(self.call_id.clone()))
    }
}
