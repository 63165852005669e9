//! Diagram session routes: generation, manual edits, copy, render, download.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{Html, IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::diagram::{self, DiagramKind, ValidationResult};
use crate::error::ApiError;
use crate::render::{self, TEXT_PLAIN_UTF8};
use crate::services::generate::{self, GenerateError};
use crate::state::{AppState, DiagramSession, SessionSnapshot};

#[derive(Debug, Deserialize)]
pub struct GenerateBody {
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct DefinitionBody {
    pub definition: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    /// Keyword-substring label.
    pub label: DiagramKind,
    /// Kind the parser detected, when it accepted the text.
    pub parsed_kind: Option<DiagramKind>,
    /// Parser's own diagram id (`flowchart-v2`, `er`, ...).
    pub diagram_type: Option<String>,
    pub validation: ValidationResult,
}

pub(crate) fn generate_error_status(err: &GenerateError) -> StatusCode {
    match err {
        GenerateError::EmptyInput => StatusCode::BAD_REQUEST,
        GenerateError::UpstreamInvalidResponse | GenerateError::UpstreamTransportFailure(_) => {
            StatusCode::BAD_GATEWAY
        }
        GenerateError::LlmNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        GenerateError::AlreadyGenerating => StatusCode::CONFLICT,
        GenerateError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        GenerateError::TaskFailed => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<GenerateError> for ApiError {
    fn from(err: GenerateError) -> Self {
        Self::new(generate_error_status(&err), &err)
    }
}

/// Apply `f` to the session under the write lock.
async fn with_session<T>(
    state: &AppState,
    id: Uuid,
    f: impl FnOnce(&mut DiagramSession) -> T,
) -> Result<T, ApiError> {
    let mut sessions = state.sessions.write().await;
    let session = sessions.get_mut(&id).ok_or(GenerateError::SessionNotFound(id))?;
    Ok(f(session))
}

// =============================================================================
// SESSION LIFECYCLE
// =============================================================================

/// `POST /api/sessions` — create an empty session.
pub async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionSnapshot>) {
    let id = Uuid::new_v4();
    let session = DiagramSession::new();
    let snapshot = SessionSnapshot::new(id, &session);
    state.sessions.write().await.insert(id, session);

    info!(session_id = %id, "session: created");
    (StatusCode::CREATED, Json(snapshot))
}

/// `GET /api/sessions/:id` — current snapshot.
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let snapshot = with_session(&state, id, |session| SessionSnapshot::new(id, session)).await?;
    Ok(Json(snapshot))
}

/// `DELETE /api/sessions/:id` — drop a session.
pub async fn delete_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError> {
    if state.sessions.write().await.remove(&id).is_none() {
        return Err(GenerateError::SessionNotFound(id).into());
    }
    info!(session_id = %id, "session: deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/sessions/:id/reset` — clear description, definition and error.
pub async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let snapshot = with_session(&state, id, |session| {
        *session = session.reset();
        SessionSnapshot::new(id, session)
    })
    .await?;

    info!(session_id = %id, sequence = snapshot.sequence, "session: reset");
    Ok(Json(snapshot))
}

// =============================================================================
// GENERATION & EDITING
// =============================================================================

/// `POST /api/sessions/:id/generate` — run the pipeline for a description.
pub async fn generate_diagram(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<GenerateBody>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let snapshot = generate::generate_for_session(&state, id, &body.description).await?;
    Ok(Json(snapshot))
}

/// `PUT /api/sessions/:id/definition` — replace the definition wholesale.
pub async fn replace_definition(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<DefinitionBody>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let validation = diagram::validate(&body.definition, state.parser.as_ref());
    let snapshot = with_session(&state, id, move |session| {
        *session = session.replace_definition(body.definition, validation);
        SessionSnapshot::new(id, session)
    })
    .await?;

    info!(session_id = %id, sequence = snapshot.sequence, valid = snapshot.validation.is_valid, "session: definition replaced");
    Ok(Json(snapshot))
}

// =============================================================================
// PRESENTATION
// =============================================================================

/// `GET /api/sessions/:id/definition` — plain-text definition for the clipboard.
pub async fn copy_definition(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Response, ApiError> {
    let definition = with_session(&state, id, |session| session.definition.clone()).await?;
    if definition.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    Ok(([(CONTENT_TYPE, TEXT_PLAIN_UTF8)], definition).into_response())
}

/// `GET /api/sessions/:id/render` — diagram container fragment.
pub async fn render_diagram(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Html<String>, ApiError> {
    let html = with_session(&state, id, |session| render::render_fragment(&session.definition, &session.validation))
        .await?;
    Ok(Html(html))
}

/// `GET /api/sessions/:id/download` — definition as a `.mmd` attachment.
pub async fn download_definition(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Response, ApiError> {
    let file = with_session(&state, id, |session| render::download(&session.definition, session.kind())).await?;
    let Some(file) = file else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    info!(session_id = %id, filename = file.filename, bytes = file.body.len(), "session: download");
    Ok((
        [
            (CONTENT_TYPE, TEXT_PLAIN_UTF8.to_owned()),
            (CONTENT_DISPOSITION, render::attachment_header(file.filename)),
        ],
        file.body,
    )
        .into_response())
}

// =============================================================================
// VALIDATION
// =============================================================================

/// `POST /api/validate` — classify and validate an arbitrary definition.
pub async fn validate_definition(
    State(state): State<AppState>,
    Json(body): Json<DefinitionBody>,
) -> Json<ValidateResponse> {
    let (validation, parsed) = diagram::check::inspect(&body.definition, state.parser.as_ref());
    let (parsed_kind, diagram_type) = match parsed {
        Some(p) => (Some(p.kind), Some(p.diagram_type)),
        None => (None, None),
    };
    Json(ValidateResponse { label: diagram::classify(&body.definition), parsed_kind, diagram_type, validation })
}

#[cfg(test)]
#[path = "sessions_test.rs"]
mod tests;
