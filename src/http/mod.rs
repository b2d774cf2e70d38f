//! HTTP API server for driving call sessions
//!
//! This module provides a REST API for a call-screen front end:
//! - POST /calls - Start a demo or live call
//! - POST /calls/:id/inject - Ask an ad-hoc question during a demo
//! - POST /calls/:id/actions - Record a follow-up action
//! - POST /calls/:id/end - End a call
//! - GET /calls/:id/status - Coverage, red flags, timeline and mic status
//! - GET /calls/:id/transcript - Transcript so far
//! - GET /calls/:id/questions - Suggested questions for a pillar
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use handlers::{
    ActionRequest, ActionResponse, ErrorResponse, InjectRequest, QuestionsQuery, StartCallRequest,
    StartCallResponse,
};
pub use routes::create_router;
pub use state::AppState;
