use super::state::AppState;
use crate::care::{PillarKey, StakeholderRole};
use crate::error::SessionError;
use crate::session::{CallMode, CallSession, SessionConfig, SessionStatus};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartCallRequest {
    /// Optional call ID (if not provided, generate UUID)
    pub call_id: Option<String>,

    /// Stakeholder role (default: worker)
    pub role: Option<String>,

    /// demo or live (default: demo)
    #[serde(default)]
    pub mode: CallMode,
}

#[derive(Debug, Serialize)]
pub struct StartCallResponse {
    pub call_id: String,
    pub status: String,
    pub message: String,
    pub session: SessionStatus,
}

#[derive(Debug, Deserialize)]
pub struct InjectRequest {
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub added: bool,
}

#[derive(Debug, Deserialize)]
pub struct QuestionsQuery {
    pub pillar: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

fn not_found(call_id: &str) -> Response {
    error_response(StatusCode::NOT_FOUND, format!("Call {} not found", call_id))
}

fn conflict(call_id: &str) -> Response {
    error_response(
        StatusCode::CONFLICT,
        format!("Call {} already exists", call_id),
    )
}

fn session_closed(e: SessionError) -> Response {
    error!("Session request failed: {}", e);
    error_response(StatusCode::GONE, e.to_string())
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /calls
/// Start a new call session
pub async fn start_call(
    State(state): State<AppState>,
    Json(req): Json<StartCallRequest>,
) -> Response {
    let role = match req.role.as_deref() {
        Some(role) => match role.parse::<StakeholderRole>() {
            Ok(role) => role,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
        },
        None => StakeholderRole::Worker,
    };

    // Generate or use provided call ID
    let call_id = req
        .call_id
        .unwrap_or_else(|| format!("call-{}", uuid::Uuid::new_v4()));

    info!("Starting {:?} call {} with {}", req.mode, call_id, role);

    if state.sessions.read().await.contains_key(&call_id) {
        return conflict(&call_id);
    }

    let config = SessionConfig {
        call_id: call_id.clone(),
        role,
        mode: req.mode,
        ..state.defaults.clone()
    };

    let recognizer = match (req.mode, &state.speech) {
        (CallMode::Live, Some(source)) => Some(source.recognizer(&call_id)),
        (CallMode::Live, None) => {
            warn!("No speech source configured; live call {} has no microphone", call_id);
            None
        }
        (CallMode::Demo, _) => None,
    };

    // Starting a live call may wait on the speech service; no lock is held
    let handle = CallSession::start(config, Arc::clone(&state.content), recognizer).await;
    let status = match handle.status().await {
        Ok(status) => status,
        Err(e) => return session_closed(e),
    };

    let duplicate = {
        let mut sessions = state.sessions.write().await;
        match sessions.entry(call_id.clone()) {
            Entry::Occupied(_) => Some(handle),
            Entry::Vacant(slot) => {
                slot.insert(handle);
                None
            }
        }
    };
    if let Some(handle) = duplicate {
        warn!("Call {} was started concurrently, discarding duplicate", call_id);
        let _ = handle.end().await;
        return conflict(&call_id);
    }

    (
        StatusCode::OK,
        Json(StartCallResponse {
            call_id: call_id.clone(),
            status: "active".to_string(),
            message: format!("Call {} started", call_id),
            session: status,
        }),
    )
        .into_response()
}

/// POST /calls/:call_id/inject
/// Ask an ad-hoc question during a demo call
pub async fn inject_question(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
    Json(req): Json<InjectRequest>,
) -> Response {
    let Some(session) = state.session(&call_id).await else {
        return not_found(&call_id);
    };

    match session.inject(req.question).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => session_closed(e),
    }
}

/// POST /calls/:call_id/actions
/// Record a case-manager follow-up action
pub async fn add_action(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
    Json(req): Json<ActionRequest>,
) -> Response {
    let Some(session) = state.session(&call_id).await else {
        return not_found(&call_id);
    };

    match session.add_action(req.text).await {
        Ok(true) => (StatusCode::OK, Json(ActionResponse { added: true })).into_response(),
        Ok(false) => error_response(StatusCode::BAD_REQUEST, "Action text is empty"),
        Err(e) => session_closed(e),
    }
}

/// POST /calls/:call_id/end
/// End a call; the session stays queryable
pub async fn end_call(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> Response {
    info!("Ending call: {}", call_id);

    let Some(session) = state.session(&call_id).await else {
        return not_found(&call_id);
    };

    match session.end().await {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(e) => session_closed(e),
    }
}

/// GET /calls/:call_id/status
/// Get status of a call session
pub async fn get_call_status(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> Response {
    let Some(session) = state.session(&call_id).await else {
        return not_found(&call_id);
    };

    match session.status().await {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(e) => session_closed(e),
    }
}

/// GET /calls/:call_id/transcript
/// Get transcript for a call (accumulated so far)
pub async fn get_call_transcript(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> Response {
    let Some(session) = state.session(&call_id).await else {
        return not_found(&call_id);
    };

    match session.transcript().await {
        Ok(transcript) => (StatusCode::OK, Json(transcript)).into_response(),
        Err(e) => session_closed(e),
    }
}

/// GET /calls/:call_id/questions?pillar=C
/// Suggested questions for a pillar, split into covered and uncovered
pub async fn get_call_questions(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
    Query(query): Query<QuestionsQuery>,
) -> Response {
    let pillar = match query.pillar.as_deref() {
        Some(pillar) => match pillar.parse::<PillarKey>() {
            Ok(pillar) => Some(pillar),
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
        },
        None => None,
    };

    let Some(session) = state.session(&call_id).await else {
        return not_found(&call_id);
    };

    match session.questions(pillar).await {
        Ok(questions) => (StatusCode::OK, Json(questions)).into_response(),
        Err(e) => session_closed(e),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
