//! Conversation timeline for simulated calls
//!
//! Drips the demo script with fixed delays and lets a user-injected
//! question preempt it without losing the script position.

mod scheduler;

pub use scheduler::{
    IgnoreReason, InjectOutcome, PendingTimer, TimelineDelays, TimelineScheduler, TimelineState,
    TimerToken,
};
