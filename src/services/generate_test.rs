use super::*;
use crate::llm::types::{ChatResponse, ContentBlock};
use crate::state::test_helpers;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

// =========================================================================
// MockLlm
// =========================================================================

#[derive(Debug, Clone)]
struct RecordedCall {
    max_tokens: u32,
    system: String,
    messages: Vec<Message>,
    web_search: bool,
}

enum Reply {
    Text(&'static str),
    NoText,
    Fail(u16),
}

struct MockLlm {
    replies: Mutex<Vec<Reply>>,
    calls: Mutex<Vec<RecordedCall>>,
    /// When set, `chat` parks until notified.
    gate: Option<Arc<Notify>>,
}

impl MockLlm {
    fn new(replies: Vec<Reply>) -> Self {
        Self { replies: Mutex::new(replies), calls: Mutex::new(Vec::new()), gate: None }
    }

    fn gated(replies: Vec<Reply>, gate: Arc<Notify>) -> Self {
        Self { gate: Some(gate), ..Self::new(replies) }
    }

    fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

fn response(content: Vec<ContentBlock>) -> ChatResponse {
    ChatResponse { content, model: "mock".into(), stop_reason: "end_turn".into(), input_tokens: 10, output_tokens: 5 }
}

#[async_trait::async_trait]
impl LlmChat for MockLlm {
    async fn chat(
        &self,
        max_tokens: u32,
        system: &str,
        messages: &[Message],
        web_search: bool,
    ) -> Result<ChatResponse, LlmError> {
        self.calls.lock().unwrap().push(RecordedCall {
            max_tokens,
            system: system.to_owned(),
            messages: messages.to_vec(),
            web_search,
        });
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() { Reply::Text("flowchart TD\n  A-->B") } else { replies.remove(0) }
        };
        match reply {
            Reply::Text(text) => Ok(response(vec![ContentBlock::Text { text: text.into() }])),
            Reply::NoText => Ok(response(vec![ContentBlock::Thinking { thinking: "hmm".into() }])),
            Reply::Fail(status) => Err(LlmError::ApiResponse { status, body: "upstream".into() }),
        }
    }
}

const FENCED_FLOWCHART: &str = "```mermaid\nflowchart TD\n  A-->B\n```";

// =========================================================================
// complete
// =========================================================================

#[tokio::test]
async fn complete_sends_system_prompt_and_user_message() {
    let llm = MockLlm::new(vec![Reply::Text("graph LR\n  A --- B")]);
    let text = complete(&llm, "draw it", false).await.unwrap();
    assert_eq!(text, "graph LR\n  A --- B");

    let calls = llm.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].system, diagram::prompt::SYSTEM_PROMPT);
    assert_eq!(calls[0].messages, vec![Message::user("draw it")]);
    assert_eq!(calls[0].max_tokens, DEFAULT_DIAGRAM_MAX_TOKENS);
    assert!(!calls[0].web_search);
}

#[tokio::test]
async fn complete_without_text_is_invalid_response() {
    let llm = MockLlm::new(vec![Reply::NoText]);
    let err = complete(&llm, "draw it", false).await.unwrap_err();
    assert!(matches!(err, GenerateError::UpstreamInvalidResponse));
}

#[tokio::test]
async fn complete_transport_error_propagates() {
    let llm = MockLlm::new(vec![Reply::Fail(503)]);
    let err = complete(&llm, "draw it", false).await.unwrap_err();
    assert!(matches!(
        err,
        GenerateError::UpstreamTransportFailure(LlmError::ApiResponse { status: 503, .. })
    ));
    assert!(err.retryable());
}

// =========================================================================
// run_pipeline
// =========================================================================

#[tokio::test]
async fn pipeline_empty_description_never_calls_llm() {
    let llm = MockLlm::new(vec![]);
    let err = run_pipeline(&llm, &diagram::parser::MermaidParser::new(), "   ").await.unwrap_err();
    assert!(matches!(err, GenerateError::EmptyInput));
    assert!(llm.calls().is_empty());
}

#[tokio::test]
async fn pipeline_end_to_end_flowchart() {
    let llm = MockLlm::new(vec![Reply::Text(FENCED_FLOWCHART)]);
    let generated = run_pipeline(&llm, &diagram::parser::MermaidParser::new(), "User login with password check")
        .await
        .unwrap();

    assert_eq!(generated.definition, "flowchart TD\n  A-->B");
    assert_eq!(generated.kind.label(), "Flowchart");
    assert!(generated.validation.is_valid);
    assert!(generated.validation.errors.is_empty());
    assert!(!generated.validation.warnings.iter().any(|w| w.contains("unbalanced")));

    let calls = llm.calls();
    assert!(calls[0].messages[0].content.contains("User login with password check"));
    assert!(!calls[0].web_search);
}

#[tokio::test]
async fn pipeline_invalid_definition_is_not_an_error() {
    let llm = MockLlm::new(vec![Reply::Text("graph\nX(- My Text (")]);
    let generated = run_pipeline(&llm, &diagram::parser::MermaidParser::new(), "broken").await.unwrap();
    assert!(!generated.validation.is_valid);
    assert!(!generated.validation.errors.is_empty());
}

// =========================================================================
// generate_for_session
// =========================================================================

#[tokio::test]
async fn session_generation_stores_definition() {
    let state = test_helpers::test_app_state_with_llm(Arc::new(MockLlm::new(vec![Reply::Text(FENCED_FLOWCHART)])));
    let id = test_helpers::seed_session(&state).await;

    let snapshot = generate_for_session(&state, id, "User login with password check").await.unwrap();
    assert_eq!(snapshot.definition, "flowchart TD\n  A-->B");
    assert_eq!(snapshot.label, DiagramKind::Flowchart);
    assert!(!snapshot.generating);
    assert_eq!(snapshot.sequence, 1);

    let sessions = state.sessions.read().await;
    assert_eq!(sessions[&id].definition, "flowchart TD\n  A-->B");
}

#[tokio::test]
async fn session_generation_unknown_session() {
    let state = test_helpers::test_app_state_with_llm(Arc::new(MockLlm::new(vec![])));
    let err = generate_for_session(&state, Uuid::new_v4(), "x").await.unwrap_err();
    assert!(matches!(err, GenerateError::SessionNotFound(_)));
}

#[tokio::test]
async fn session_generation_without_llm() {
    let state = test_helpers::test_app_state();
    let id = test_helpers::seed_session(&state).await;
    let err = generate_for_session(&state, id, "x").await.unwrap_err();
    assert!(matches!(err, GenerateError::LlmNotConfigured));
    assert!(!state.sessions.read().await[&id].generating);
}

#[tokio::test]
async fn session_generation_empty_input_leaves_session_alone() {
    let llm = Arc::new(MockLlm::new(vec![]));
    let state = test_helpers::test_app_state_with_llm(llm.clone());
    let id = test_helpers::seed_session_with_definition(&state, "graph LR\n  A --- B").await;
    let before = state.sessions.read().await[&id].clone();

    let err = generate_for_session(&state, id, "").await.unwrap_err();
    assert!(matches!(err, GenerateError::EmptyInput));
    assert_eq!(state.sessions.read().await[&id], before);
    assert!(llm.calls().is_empty());
}

#[tokio::test]
async fn session_generation_failure_sets_inline_error() {
    let state = test_helpers::test_app_state_with_llm(Arc::new(MockLlm::new(vec![Reply::Fail(500)])));
    let id = test_helpers::seed_session(&state).await;

    let err = generate_for_session(&state, id, "x").await.unwrap_err();
    assert_eq!(err.error_code(), "E_UPSTREAM_TRANSPORT");

    let sessions = state.sessions.read().await;
    let session = &sessions[&id];
    assert!(!session.generating);
    assert_eq!(session.error.as_deref(), Some(err.to_string().as_str()));
}

#[tokio::test]
async fn concurrent_generation_is_rejected() {
    let gate = Arc::new(Notify::new());
    let llm = Arc::new(MockLlm::gated(vec![Reply::Text(FENCED_FLOWCHART)], gate.clone()));
    let state = test_helpers::test_app_state_with_llm(llm.clone());
    let id = test_helpers::seed_session(&state).await;

    let first = tokio::spawn({
        let state = state.clone();
        async move { generate_for_session(&state, id, "first").await }
    });
    while llm.calls().is_empty() {
        tokio::task::yield_now().await;
    }

    let err = generate_for_session(&state, id, "second").await.unwrap_err();
    assert!(matches!(err, GenerateError::AlreadyGenerating));

    gate.notify_one();
    let snapshot = first.await.unwrap().unwrap();
    assert_eq!(snapshot.definition, "flowchart TD\n  A-->B");
    assert_eq!(llm.calls().len(), 1);
}

#[tokio::test]
async fn edit_during_generation_makes_response_stale() {
    let gate = Arc::new(Notify::new());
    let llm = Arc::new(MockLlm::gated(vec![Reply::Text(FENCED_FLOWCHART)], gate.clone()));
    let state = test_helpers::test_app_state_with_llm(llm.clone());
    let id = test_helpers::seed_session(&state).await;

    let pending = tokio::spawn({
        let state = state.clone();
        async move { generate_for_session(&state, id, "first").await }
    });
    while llm.calls().is_empty() {
        tokio::task::yield_now().await;
    }

    let edited = {
        let mut sessions = state.sessions.write().await;
        let session = sessions.get_mut(&id).unwrap();
        *session = session.replace_definition("graph LR\n  X --- Y".into(), ValidationResult::default());
        session.clone()
    };

    gate.notify_one();
    let snapshot = pending.await.unwrap().unwrap();
    assert_eq!(snapshot.definition, "graph LR\n  X --- Y");
    assert_eq!(state.sessions.read().await[&id], edited);
}

#[tokio::test]
async fn dropped_request_still_settles_session() {
    let gate = Arc::new(Notify::new());
    let llm = Arc::new(MockLlm::gated(vec![Reply::Text(FENCED_FLOWCHART)], gate.clone()));
    let state = test_helpers::test_app_state_with_llm(llm.clone());
    let id = test_helpers::seed_session(&state).await;

    let abandoned = tokio::time::timeout(Duration::from_millis(20), generate_for_session(&state, id, "first")).await;
    assert!(abandoned.is_err());
    assert!(state.sessions.read().await[&id].generating);

    gate.notify_one();
    tokio::time::timeout(Duration::from_secs(5), async {
        while state.sessions.read().await[&id].generating {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
    assert_eq!(state.sessions.read().await[&id].definition, "flowchart TD\n  A-->B");

    gate.notify_one();
    let snapshot = generate_for_session(&state, id, "second").await.unwrap();
    assert!(!snapshot.generating);
    assert_eq!(llm.calls().len(), 2);
}

// =========================================================================
// ErrorCode
// =========================================================================

#[test]
fn error_codes_are_stable() {
    assert_eq!(GenerateError::EmptyInput.error_code(), "E_EMPTY_INPUT");
    assert_eq!(GenerateError::UpstreamInvalidResponse.error_code(), "E_UPSTREAM_INVALID_RESPONSE");
    assert_eq!(GenerateError::LlmNotConfigured.error_code(), "E_LLM_NOT_CONFIGURED");
    assert_eq!(GenerateError::AlreadyGenerating.error_code(), "E_ALREADY_GENERATING");
    assert_eq!(GenerateError::SessionNotFound(Uuid::nil()).error_code(), "E_SESSION_NOT_FOUND");
    assert_eq!(GenerateError::TaskFailed.error_code(), "E_GENERATION_TASK");
    assert!(!GenerateError::AlreadyGenerating.retryable());
}

#[test]
fn empty_input_converts() {
    assert!(matches!(GenerateError::from(EmptyInput), GenerateError::EmptyInput));
}
