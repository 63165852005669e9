//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the optional LLM client, the Mermaid parser, and the map of live
//! diagram sessions. Sessions are in memory only.
//!
//! `DiagramSession` transitions are pure: each returns the next session value
//! and the handler that holds the lock stores it. Every transition that
//! invalidates an in-flight completion bumps `sequence`.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::diagram::parser::{DiagramParser, MermaidParser};
use crate::diagram::{self, DiagramKind, ValidationResult};
use crate::llm::LlmChat;
use crate::services::generate::{GenerateError, GeneratedDiagram};

// =============================================================================
// DIAGRAM SESSION
// =============================================================================

/// Per-browser-session diagram state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagramSession {
    pub description: String,
    /// Current definition; only ever replaced whole.
    pub definition: String,
    pub validation: ValidationResult,
    /// True while a completion call is pending.
    pub generating: bool,
    /// Inline error from the last failed generation.
    pub error: Option<String>,
    /// Monotonic; a settle carrying an older value is stale.
    pub sequence: u64,
}

impl DiagramSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a generation. The previous definition is discarded.
    ///
    /// Returns the next session and the sequence number the settle must carry.
    ///
    /// # Errors
    ///
    /// `AlreadyGenerating` while a previous call is pending.
    pub fn begin_generation(&self, description: &str) -> Result<(Self, u64), GenerateError> {
        if self.generating {
            return Err(GenerateError::AlreadyGenerating);
        }
        let sequence = self.sequence + 1;
        let next = Self {
            description: description.to_owned(),
            definition: String::new(),
            validation: ValidationResult::default(),
            generating: true,
            error: None,
            sequence,
        };
        Ok((next, sequence))
    }

    /// Apply a completed generation. `None` when `sequence` is stale, in
    /// which case the session must be left as is.
    #[must_use]
    pub fn settle_generation(&self, sequence: u64, outcome: Result<GeneratedDiagram, String>) -> Option<Self> {
        if sequence != self.sequence {
            return None;
        }
        let next = match outcome {
            Ok(generated) => Self {
                definition: generated.definition,
                validation: generated.validation,
                generating: false,
                error: None,
                ..self.clone()
            },
            Err(message) => Self { generating: false, error: Some(message), ..self.clone() },
        };
        Some(next)
    }

    /// Replace the definition wholesale (manual edit). Any pending generation
    /// becomes stale.
    #[must_use]
    pub fn replace_definition(&self, definition: String, validation: ValidationResult) -> Self {
        Self {
            description: self.description.clone(),
            definition,
            validation,
            generating: false,
            error: None,
            sequence: self.sequence + 1,
        }
    }

    /// Clear everything except the sequence counter, which advances.
    #[must_use]
    pub fn reset(&self) -> Self {
        Self { sequence: self.sequence + 1, ..Self::default() }
    }

    /// Label derived from the current definition.
    #[must_use]
    pub fn kind(&self) -> DiagramKind {
        diagram::classify(&self.definition)
    }
}

/// JSON view of a session returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub description: String,
    pub definition: String,
    pub label: DiagramKind,
    pub validation: ValidationResult,
    pub generating: bool,
    pub error: Option<String>,
    pub sequence: u64,
}

impl SessionSnapshot {
    #[must_use]
    pub fn new(id: Uuid, session: &DiagramSession) -> Self {
        Self {
            id,
            description: session.description.clone(),
            definition: session.definition.clone(),
            label: session.kind(),
            validation: session.validation.clone(),
            generating: session.generating,
            error: session.error.clone(),
            sequence: session.sequence,
        }
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum — all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    /// Optional LLM client. `None` if LLM env vars are not configured.
    pub llm: Option<Arc<dyn LlmChat>>,
    /// Authoritative Mermaid parse.
    pub parser: Arc<dyn DiagramParser>,
    pub sessions: Arc<RwLock<HashMap<Uuid, DiagramSession>>>,
}

impl AppState {
    #[must_use]
    pub fn new(llm: Option<Arc<dyn LlmChat>>) -> Self {
        Self::with_parser(llm, Arc::new(MermaidParser::new()))
    }

    #[must_use]
    pub fn with_parser(llm: Option<Arc<dyn LlmChat>>, parser: Arc<dyn DiagramParser>) -> Self {
        Self { llm, parser, sessions: Arc::new(RwLock::new(HashMap::new())) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use super::*;

    /// Create a test `AppState` without an LLM.
    #[must_use]
    pub fn test_app_state() -> AppState {
        AppState::new(None)
    }

    /// Create a test `AppState` with a mock LLM.
    #[must_use]
    pub fn test_app_state_with_llm(llm: Arc<dyn LlmChat>) -> AppState {
        AppState::new(Some(llm))
    }

    /// Seed an empty session and return its ID.
    pub async fn seed_session(state: &AppState) -> Uuid {
        let id = Uuid::new_v4();
        state.sessions.write().await.insert(id, DiagramSession::new());
        id
    }

    /// Seed a session holding `definition` (validated with the state's parser).
    pub async fn seed_session_with_definition(state: &AppState, definition: &str) -> Uuid {
        let id = Uuid::new_v4();
        let validation = diagram::validate(definition, state.parser.as_ref());
        let session = DiagramSession::new().replace_definition(definition.to_owned(), validation);
        state.sessions.write().await.insert(id, session);
        id
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
