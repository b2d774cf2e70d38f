use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::care::StakeholderRole;
use crate::content::{CareContent, ScriptedLine};
use crate::session::{CallMode, CASE_MANAGER};

/// Delays between scripted transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineDelays {
    /// Before the next case-manager line is shown
    pub cm_line: Duration,
    /// Before the counterpart replies
    pub response: Duration,
    /// Before an injected question is shown
    pub injected: Duration,
}

impl Default for TimelineDelays {
    fn default() -> Self {
        Self {
            cm_line: Duration::from_millis(4000),
            response: Duration::from_millis(2500),
            injected: Duration::from_millis(800),
        }
    }
}

/// Scheduler state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum TimelineState {
    /// The case-manager line for the current script index is due
    CmPending,
    /// The case-manager line is shown, the scripted reply is due
    AwaitingResponse,
    /// A user question has displaced the script and is about to be asked
    InjectedPending { question: String },
    /// The injected question is shown, its reply is due
    InjectedAwaitingResponse { reply: String },
    /// Script exhausted, live call, or call ended
    Idle,
}

impl TimelineState {
    /// Whether a question has been asked and its reply is in flight
    pub fn response_pending(&self) -> bool {
        matches!(
            self,
            TimelineState::AwaitingResponse | TimelineState::InjectedAwaitingResponse { .. }
        )
    }
}

/// Identifies one armed timer. A fired token that is no longer the
/// pending one is stale and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimerToken(u64);

/// The single outstanding timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTimer {
    pub token: TimerToken,
    pub due: Instant,
}

/// Why an injected question was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    CallEnded,
    ResponsePending,
    LiveCall,
    EmptyQuestion,
}

/// Result of injecting a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InjectOutcome {
    Accepted,
    Ignored { reason: IgnoreReason },
}

/// Drives the scripted demo dialogue and user-injected questions.
///
/// Pure state machine: the owner sleeps until `pending().due` and then
/// calls `fire` with the token. Arming a timer always revokes the
/// previous one, so at most one transition is ever outstanding.
#[derive(Debug)]
pub struct TimelineScheduler {
    content: Arc<CareContent>,
    role: StakeholderRole,
    mode: CallMode,
    delays: TimelineDelays,
    state: TimelineState,
    script_index: usize,
    ended: bool,
    generation: u64,
    pending: Option<PendingTimer>,
}

impl TimelineScheduler {
    pub fn new(
        content: Arc<CareContent>,
        role: StakeholderRole,
        mode: CallMode,
        delays: TimelineDelays,
    ) -> Self {
        Self {
            content,
            role,
            mode,
            delays,
            state: TimelineState::Idle,
            script_index: 0,
            ended: false,
            generation: 0,
            pending: None,
        }
    }

    /// Begin the timeline: demo calls wait for the first case-manager
    /// line, live calls stay idle.
    pub fn start(&mut self, now: Instant) -> Option<PendingTimer> {
        if self.ended || self.mode == CallMode::Live {
            self.state = TimelineState::Idle;
            return None;
        }

        self.script_index = 0;
        self.enter_cm_pending(now)
    }

    /// Handle an expired timer. Returns the line to append, if any.
    pub fn fire(&mut self, token: TimerToken, now: Instant) -> Option<ScriptedLine> {
        if self.ended {
            return None;
        }
        match self.pending {
            Some(pending) if pending.token == token => self.pending = None,
            _ => {
                debug!("Ignoring stale timer {:?}", token);
                return None;
            }
        }

        let content = Arc::clone(&self.content);
        let script = content.script_for(self.role);

        match std::mem::replace(&mut self.state, TimelineState::Idle) {
            TimelineState::CmPending => {
                let pair = script.pairs.get(self.script_index)?;
                self.state = TimelineState::AwaitingResponse;
                self.arm(self.delays.response, now);
                Some(self.case_manager_line(&pair.cm))
            }
            TimelineState::AwaitingResponse => {
                let pair = script.pairs.get(self.script_index)?;
                self.script_index += 1;
                self.enter_cm_pending(now);
                Some(self.counterpart_line(&pair.response))
            }
            TimelineState::InjectedPending { question } => {
                let reply = content.replies().resolve(&question).reply().to_string();
                self.state = TimelineState::InjectedAwaitingResponse { reply };
                self.arm(self.delays.response, now);
                Some(self.case_manager_line(&question))
            }
            TimelineState::InjectedAwaitingResponse { reply } => {
                self.enter_cm_pending(now);
                Some(self.counterpart_line(&reply))
            }
            TimelineState::Idle => None,
        }
    }

    /// Preempt the script with a user question.
    ///
    /// Ignored while a reply is pending. A question that has not been asked
    /// yet is replaced and its delay restarts. The script index never moves.
    pub fn inject(&mut self, question: &str, now: Instant) -> InjectOutcome {
        let reason = if self.ended {
            Some(IgnoreReason::CallEnded)
        } else if self.mode == CallMode::Live {
            Some(IgnoreReason::LiveCall)
        } else if question.trim().is_empty() {
            Some(IgnoreReason::EmptyQuestion)
        } else if self.state.response_pending() {
            Some(IgnoreReason::ResponsePending)
        } else {
            None
        };

        if let Some(reason) = reason {
            debug!("Injected question ignored: {:?}", reason);
            return InjectOutcome::Ignored { reason };
        }

        info!(
            "Injecting question at script index {}: {}",
            self.script_index,
            question.trim()
        );
        self.state = TimelineState::InjectedPending {
            question: question.trim().to_string(),
        };
        self.arm(self.delays.injected, now);
        InjectOutcome::Accepted
    }

    /// End the timeline. Returns the revoked timer, if one was pending.
    pub fn end(&mut self) -> Option<TimerToken> {
        self.ended = true;
        self.state = TimelineState::Idle;
        self.pending.take().map(|pending| pending.token)
    }

    pub fn pending(&self) -> Option<PendingTimer> {
        self.pending
    }

    pub fn state(&self) -> &TimelineState {
        &self.state
    }

    pub fn script_index(&self) -> usize {
        self.script_index
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Whether a demo script has played out completely
    pub fn script_finished(&self) -> bool {
        self.mode == CallMode::Demo
            && self.state == TimelineState::Idle
            && self.script_index >= self.content.script_for(self.role).pairs.len()
    }

    fn enter_cm_pending(&mut self, now: Instant) -> Option<PendingTimer> {
        if self.script_index >= self.content.script_for(self.role).pairs.len() {
            info!("Demo script finished after {} pairs", self.script_index);
            self.state = TimelineState::Idle;
            self.pending = None;
            return None;
        }

        self.state = TimelineState::CmPending;
        Some(self.arm(self.delays.cm_line, now))
    }

    fn arm(&mut self, delay: Duration, now: Instant) -> PendingTimer {
        self.generation += 1;
        let timer = PendingTimer {
            token: TimerToken(self.generation),
            due: now + delay,
        };
        if let Some(previous) = self.pending.replace(timer) {
            debug!("Revoked timer {:?}", previous.token);
        }
        timer
    }

    fn case_manager_line(&self, text: &str) -> ScriptedLine {
        ScriptedLine {
            speaker: CASE_MANAGER.to_string(),
            text: text.to_string(),
        }
    }

    fn counterpart_line(&self, text: &str) -> ScriptedLine {
        ScriptedLine {
            speaker: self.role.responder_label().to_string(),
            text: text.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPLOYER_QUESTION: &str = "Have you had any contact with your employer since the injury?";

    fn scheduler(mode: CallMode) -> TimelineScheduler {
        let content = Arc::new(CareContent::builtin().unwrap());
        TimelineScheduler::new(content, StakeholderRole::Worker, mode, TimelineDelays::default())
    }

    /// Fire the pending timer at its due time
    fn fire_next(s: &mut TimelineScheduler) -> (Instant, Option<ScriptedLine>) {
        let pending = s.pending().expect("a timer should be pending");
        (pending.due, s.fire(pending.token, pending.due))
    }

    #[test]
    fn test_demo_drip_sequence() {
        let mut s = scheduler(CallMode::Demo);
        let t0 = Instant::now();

        let first = s.start(t0).unwrap();
        assert_eq!(first.due, t0 + Duration::from_millis(4000));
        assert_eq!(s.state(), &TimelineState::CmPending);

        let (at, line) = fire_next(&mut s);
        let line = line.unwrap();
        assert_eq!(line.speaker, "CM");
        assert_eq!(line.text, "Thanks for picking up Jamie. How are you feeling today?");
        assert_eq!(s.state(), &TimelineState::AwaitingResponse);
        assert_eq!(s.pending().unwrap().due, at + Duration::from_millis(2500));

        let (_, line) = fire_next(&mut s);
        assert_eq!(line.unwrap().speaker, "Worker");
        assert_eq!(s.script_index(), 1);
        assert_eq!(s.state(), &TimelineState::CmPending);
    }

    #[test]
    fn test_script_runs_to_idle() {
        let mut s = scheduler(CallMode::Demo);
        s.start(Instant::now());

        let mut lines = 0;
        while s.pending().is_some() {
            let (_, line) = fire_next(&mut s);
            assert!(line.is_some());
            lines += 1;
        }

        assert_eq!(lines, 12);
        assert_eq!(s.state(), &TimelineState::Idle);
        assert_eq!(s.script_index(), 6);
        assert!(s.script_finished());
    }

    #[test]
    fn test_injection_preempts_and_resumes_script() {
        let mut s = scheduler(CallMode::Demo);
        let t0 = Instant::now();
        let original = s.start(t0).unwrap();

        let now = t0 + Duration::from_millis(1000);
        assert_eq!(s.inject(EMPLOYER_QUESTION, now), InjectOutcome::Accepted);
        assert_eq!(s.pending().unwrap().due, now + Duration::from_millis(800));

        // The displaced timer is dead
        assert!(s.fire(original.token, original.due).is_none());

        let (_, question) = fire_next(&mut s);
        assert_eq!(question.unwrap().text, EMPLOYER_QUESTION);

        let (_, reply) = fire_next(&mut s);
        assert_eq!(
            reply.unwrap().text,
            "Not really. My manager sent a message early on but I haven't replied. I didn't know what to say."
        );

        assert_eq!(s.state(), &TimelineState::CmPending);
        assert_eq!(s.script_index(), 0);
        let (_, resumed) = fire_next(&mut s);
        assert_eq!(resumed.unwrap().text, "Thanks for picking up Jamie. How are you feeling today?");
    }

    #[test]
    fn test_unmatched_injection_gets_filler() {
        let mut s = scheduler(CallMode::Demo);
        let t0 = Instant::now();
        s.start(t0);
        s.inject("What's your favourite colour?", t0);

        fire_next(&mut s);
        let (_, reply) = fire_next(&mut s);
        assert!(reply.unwrap().text.starts_with("That's a good question."));
    }

    #[test]
    fn test_injection_while_awaiting_response_is_noop() {
        let mut s = scheduler(CallMode::Demo);
        s.start(Instant::now());
        let (at, _) = fire_next(&mut s);
        let in_flight = s.pending().unwrap();

        let outcome = s.inject(EMPLOYER_QUESTION, at);
        assert_eq!(
            outcome,
            InjectOutcome::Ignored {
                reason: IgnoreReason::ResponsePending
            }
        );
        assert_eq!(s.pending(), Some(in_flight));
        assert_eq!(s.script_index(), 0);

        let (_, reply) = fire_next(&mut s);
        assert_eq!(reply.unwrap().speaker, "Worker");
        assert_eq!(s.script_index(), 1);
    }

    #[test]
    fn test_second_injection_replaces_unasked_question() {
        let mut s = scheduler(CallMode::Demo);
        let t0 = Instant::now();
        s.start(t0);

        assert_eq!(s.inject("First?", t0), InjectOutcome::Accepted);
        let first = s.pending().unwrap();

        let later = t0 + Duration::from_millis(300);
        assert_eq!(s.inject(EMPLOYER_QUESTION, later), InjectOutcome::Accepted);
        let second = s.pending().unwrap();
        assert_ne!(second.token, first.token);
        assert_eq!(second.due, later + Duration::from_millis(800));
        assert!(s.fire(first.token, first.due).is_none());

        let (_, question) = fire_next(&mut s);
        assert_eq!(question.unwrap().text, EMPLOYER_QUESTION);

        // Asked: now the reply is in flight
        assert!(matches!(s.inject("Third?", t0), InjectOutcome::Ignored { .. }));
        fire_next(&mut s);
        assert_eq!(s.inject("Third?", t0), InjectOutcome::Accepted);
    }

    #[test]
    fn test_injection_after_script_returns_to_idle() {
        let mut s = scheduler(CallMode::Demo);
        s.start(Instant::now());
        while s.pending().is_some() {
            fire_next(&mut s);
        }

        assert_eq!(s.inject(EMPLOYER_QUESTION, Instant::now()), InjectOutcome::Accepted);
        fire_next(&mut s);
        fire_next(&mut s);
        assert_eq!(s.state(), &TimelineState::Idle);
        assert!(s.pending().is_none());
    }

    #[test]
    fn test_end_revokes_pending_timer() {
        let mut s = scheduler(CallMode::Demo);
        let timer = s.start(Instant::now()).unwrap();

        assert_eq!(s.end(), Some(timer.token));
        assert!(s.pending().is_none());
        assert!(s.fire(timer.token, timer.due).is_none());
        assert_eq!(
            s.inject(EMPLOYER_QUESTION, timer.due),
            InjectOutcome::Ignored {
                reason: IgnoreReason::CallEnded
            }
        );
        assert!(s.start(timer.due).is_none());
        assert_eq!(s.state(), &TimelineState::Idle);
    }

    #[test]
    fn test_live_mode_stays_idle() {
        let mut s = scheduler(CallMode::Live);
        assert!(s.start(Instant::now()).is_none());
        assert_eq!(s.state(), &TimelineState::Idle);
        assert_eq!(
            s.inject(EMPLOYER_QUESTION, Instant::now()),
            InjectOutcome::Ignored {
                reason: IgnoreReason::LiveCall
            }
        );
        assert!(!s.script_finished());
    }
}
