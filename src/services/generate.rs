//! Generation service — description → prompt → completion → definition.
//!
//! DESIGN
//! ======
//! `run_pipeline` is the whole flow with no session involvement: compose,
//! complete (the only suspension point), normalize, classify, validate.
//! `generate_for_session` wraps it with the session bookkeeping: the session
//! lock is taken to begin and to settle, never across the completion call,
//! and a settle whose sequence number is no longer current is dropped. The
//! pipeline and settle run on a spawned task, so a caller that goes away
//! mid-completion cannot leave the session stuck in `generating`.

use std::sync::{Arc, OnceLock};

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::diagram::parser::DiagramParser;
use crate::diagram::{self, DiagramKind, EmptyInput, ValidationResult};
use crate::error::ErrorCode;
use crate::llm::LlmChat;
use crate::llm::types::{LlmError, Message};
use crate::state::{AppState, SessionSnapshot};

const DEFAULT_DIAGRAM_MAX_TOKENS: u32 = 2048;

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn diagram_max_tokens() -> u32 {
    static VALUE: OnceLock<u32> = OnceLock::new();
    *VALUE.get_or_init(|| env_parse("DIAGRAM_MAX_TOKENS", DEFAULT_DIAGRAM_MAX_TOKENS))
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("description is empty")]
    EmptyInput,
    #[error("completion returned no text content")]
    UpstreamInvalidResponse,
    #[error("completion request failed: {0}")]
    UpstreamTransportFailure(#[from] LlmError),
    #[error("LLM not configured")]
    LlmNotConfigured,
    #[error("a diagram is already being generated for this session")]
    AlreadyGenerating,
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),
    #[error("generation task failed")]
    TaskFailed,
}

impl ErrorCode for GenerateError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyInput => "E_EMPTY_INPUT",
            Self::UpstreamInvalidResponse => "E_UPSTREAM_INVALID_RESPONSE",
            Self::UpstreamTransportFailure(_) => "E_UPSTREAM_TRANSPORT",
            Self::LlmNotConfigured => "E_LLM_NOT_CONFIGURED",
            Self::AlreadyGenerating => "E_ALREADY_GENERATING",
            Self::SessionNotFound(_) => "E_SESSION_NOT_FOUND",
            Self::TaskFailed => "E_GENERATION_TASK",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::UpstreamTransportFailure(e) if e.retryable())
    }
}

impl From<EmptyInput> for GenerateError {
    fn from(_: EmptyInput) -> Self {
        Self::EmptyInput
    }
}

/// A definition produced by the pipeline, with everything derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedDiagram {
    pub definition: String,
    pub kind: DiagramKind,
    pub validation: ValidationResult,
}

impl GeneratedDiagram {
    /// Derive kind and validation for `definition`.
    #[must_use]
    pub fn from_definition(definition: String, parser: &dyn DiagramParser) -> Self {
        let kind = diagram::classify(&definition);
        let validation = diagram::validate(&definition, parser);
        Self { definition, kind, validation }
    }
}

// =============================================================================
// PIPELINE
// =============================================================================

/// Send `prompt` to the completion service and return its raw text.
///
/// # Errors
///
/// `UpstreamTransportFailure` if the call fails, `UpstreamInvalidResponse`
/// if the reply carries no text content.
pub async fn complete(llm: &dyn LlmChat, prompt: &str, allow_web_search: bool) -> Result<String, GenerateError> {
    let messages = [Message::user(prompt)];
    let response = llm
        .chat(diagram_max_tokens(), diagram::prompt::SYSTEM_PROMPT, &messages, allow_web_search)
        .await?;

    info!(
        model = %response.model,
        stop_reason = %response.stop_reason,
        input_tokens = response.input_tokens,
        output_tokens = response.output_tokens,
        "generate: completion received"
    );

    response.text().ok_or(GenerateError::UpstreamInvalidResponse)
}

/// Run the full generation flow for `description`.
///
/// # Errors
///
/// `EmptyInput` before any network call for a blank description; otherwise
/// any error from [`complete`]. Parse failures are not errors: they are
/// recorded in the returned validation result.
pub async fn run_pipeline(
    llm: &dyn LlmChat,
    parser: &dyn DiagramParser,
    description: &str,
) -> Result<GeneratedDiagram, GenerateError> {
    let prompt = diagram::compose_prompt(description)?;
    debug!(prompt_len = prompt.len(), "generate: prompt composed");

    let raw = complete(llm, &prompt, false).await?;
    let definition = diagram::normalize(&raw);
    let generated = GeneratedDiagram::from_definition(definition, parser);

    info!(
        kind = %generated.kind,
        valid = generated.validation.is_valid,
        warnings = generated.validation.warnings.len(),
        "generate: definition ready"
    );
    Ok(generated)
}

// =============================================================================
// SESSION ENTRY POINT
// =============================================================================

/// Generate a diagram for a session and return the settled snapshot.
///
/// # Errors
///
/// `SessionNotFound`, `EmptyInput`, `LlmNotConfigured` and
/// `AlreadyGenerating` are checked before the completion call; pipeline
/// errors are also stored on the session as its inline error.
pub async fn generate_for_session(
    state: &AppState,
    session_id: Uuid,
    description: &str,
) -> Result<SessionSnapshot, GenerateError> {
    info!(%session_id, description_len = description.len(), "generate: request received");

    let (llm, ticket) = {
        let mut sessions = state.sessions.write().await;
        let session = sessions.get_mut(&session_id).ok_or(GenerateError::SessionNotFound(session_id))?;
        if description.trim().is_empty() {
            return Err(GenerateError::EmptyInput);
        }
        let llm = state.llm.clone().ok_or(GenerateError::LlmNotConfigured)?;
        let (next, ticket) = session.begin_generation(description)?;
        *session = next;
        info!(%session_id, sequence = ticket, "generate: started");
        (llm, ticket)
    };

    // Detached so the session still settles if the request future is dropped.
    let task = tokio::spawn(settle_pipeline(state.clone(), session_id, description.to_owned(), llm, ticket));
    match task.await {
        Ok(result) => result,
        Err(e) => {
            error!(%session_id, sequence = ticket, error = %e, "generate: task failed");
            let err = GenerateError::TaskFailed;
            let mut sessions = state.sessions.write().await;
            if let Some(session) = sessions.get_mut(&session_id) {
                if let Some(next) = session.settle_generation(ticket, Err(err.to_string())) {
                    *session = next;
                }
            }
            Err(err)
        }
    }
}

/// Run the pipeline for a begun generation and settle it on the session.
async fn settle_pipeline(
    state: AppState,
    session_id: Uuid,
    description: String,
    llm: Arc<dyn LlmChat>,
    ticket: u64,
) -> Result<SessionSnapshot, GenerateError> {
    let outcome = run_pipeline(llm.as_ref(), state.parser.as_ref(), &description).await;

    let mut sessions = state.sessions.write().await;
    let Some(session) = sessions.get_mut(&session_id) else {
        warn!(%session_id, sequence = ticket, "generate: session dropped before completion settled");
        return Err(GenerateError::SessionNotFound(session_id));
    };

    let settled = session.settle_generation(ticket, outcome.as_ref().map_err(ToString::to_string).cloned());
    match settled {
        Some(next) => {
            *session = next;
            info!(%session_id, sequence = ticket, ok = outcome.is_ok(), "generate: settled");
        }
        None => {
            warn!(%session_id, sequence = ticket, current = session.sequence, "generate: stale completion discarded");
            return Ok(SessionSnapshot::new(session_id, session));
        }
    }

    outcome.map(|_| SessionSnapshot::new(session_id, session))
}

#[cfg(test)]
#[path = "generate_test.rs"]
mod tests;
