//! Axum route handlers for the Interview API.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::driver::{Turn, TurnReport};
use crate::interview::machine::EXIT_KEYWORDS;
use crate::interview::profile::{
    ProfileForm, DEFAULT_TECH_STACK, EXPERIENCE_RANGE_YEARS, TECH_STACK_OPTIONS,
};
use crate::interview::session::{ExportStatus, InterviewSession, Phase, MAX_QUESTIONS};
use crate::models::transcript::Message;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct FormMetadata {
    pub tech_stack_options: &'static [&'static str],
    pub default_tech_stack: &'static [&'static str],
    pub experience_min_years: u32,
    pub experience_max_years: u32,
    pub exit_keywords: &'static [&'static str],
    pub max_questions: u32,
}

#[derive(Debug, Serialize)]
pub struct SessionCreatedResponse {
    pub session_id: Uuid,
    pub phase: Phase,
}

#[derive(Debug, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub phase: Phase,
    pub question_count: u32,
    pub started: bool,
    pub ended: bool,
    /// Transcript as the candidate sees it (system prompt omitted).
    pub messages: Vec<Message>,
    pub export: Option<ExportStatus>,
}

impl From<&InterviewSession> for SessionSnapshot {
    fn from(session: &InterviewSession) -> Self {
        Self {
            session_id: session.id,
            phase: session.state.phase(),
            question_count: session.state.question_count,
            started: session.state.started,
            ended: session.state.ended,
            messages: session.state.visible_messages().cloned().collect(),
            export: session.export.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub answer: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/interview/form
pub async fn handle_form_metadata() -> Json<FormMetadata> {
    Json(FormMetadata {
        tech_stack_options: TECH_STACK_OPTIONS,
        default_tech_stack: DEFAULT_TECH_STACK,
        experience_min_years: EXPERIENCE_RANGE_YEARS.0,
        experience_max_years: EXPERIENCE_RANGE_YEARS.1,
        exit_keywords: EXIT_KEYWORDS,
        max_questions: MAX_QUESTIONS,
    })
}

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionCreatedResponse>) {
    let session_id = state.sessions.create();
    tracing::info!("Opened interview session {session_id}");
    (
        StatusCode::CREATED,
        Json(SessionCreatedResponse {
            session_id,
            phase: Phase::NotStarted,
        }),
    )
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let handle = session_handle(&state, id)?;
    let session = handle.lock().await;
    Ok(Json(SessionSnapshot::from(&*session)))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.sessions.remove(id) {
        return Err(not_found(id));
    }
    tracing::info!("Discarded interview session {id}");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/sessions/:id/profile
pub async fn handle_submit_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<ProfileForm>, JsonRejection>,
) -> Result<Json<TurnReport>, AppError> {
    let Json(form) = payload?;
    let handle = session_handle(&state, id)?;
    let report = state
        .driver
        .run_detached(handle, Turn::Profile(form))
        .await?;
    Ok(Json(report))
}

/// POST /api/v1/sessions/:id/answer
pub async fn handle_submit_answer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<AnswerRequest>, JsonRejection>,
) -> Result<Json<TurnReport>, AppError> {
    let Json(req) = payload?;
    let handle = session_handle(&state, id)?;
    let report = state
        .driver
        .run_detached(handle, Turn::Answer(req.answer))
        .await?;
    Ok(Json(report))
}

/// POST /api/v1/sessions/:id/refresh
pub async fn handle_refresh(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TurnReport>, AppError> {
    let handle = session_handle(&state, id)?;
    let report = state.driver.run_detached(handle, Turn::Refresh).await?;
    Ok(Json(report))
}

/// POST /api/v1/sessions/:id/reset
pub async fn handle_reset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let handle = session_handle(&state, id)?;
    let mut session = handle.lock().await;
    session.reset();
    tracing::info!("Reset interview session {id}");
    Ok(Json(SessionSnapshot::from(&*session)))
}

fn session_handle(
    state: &AppState,
    id: Uuid,
) -> Result<std::sync::Arc<tokio::sync::Mutex<InterviewSession>>, AppError> {
    state.sessions.get(id).ok_or_else(|| not_found(id))
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Session {id} not found"))
}
