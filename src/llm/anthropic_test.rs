use super::*;

fn make_response(content: serde_json::Value) -> String {
    serde_json::json!({
        "id": "msg_123",
        "type": "message",
        "role": "assistant",
        "content": content,
        "model": "claude-sonnet-4-5-20250929",
        "stop_reason": "end_turn",
        "usage": { "input_tokens": 100, "output_tokens": 50 }
    })
    .to_string()
}

#[test]
fn parse_text_response() {
    let json = make_response(serde_json::json!([
        { "type": "text", "text": "flowchart TD\n  A-->B" }
    ]));
    let resp = parse_response(&json).unwrap();
    assert_eq!(resp.content.len(), 1);
    assert_eq!(resp.text().as_deref(), Some("flowchart TD\n  A-->B"));
    assert_eq!(resp.model, "claude-sonnet-4-5-20250929");
    assert_eq!(resp.stop_reason, "end_turn");
    assert_eq!(resp.input_tokens, 100);
    assert_eq!(resp.output_tokens, 50);
}

#[test]
fn parse_server_tool_blocks_are_filtered() {
    let json = make_response(serde_json::json!([
        { "type": "server_tool_use", "id": "srv_1", "name": "web_search", "input": { "query": "x" } },
        { "type": "web_search_tool_result", "tool_use_id": "srv_1", "content": [] },
        { "type": "text", "text": "graph LR" }
    ]));
    let resp = parse_response(&json).unwrap();
    assert_eq!(resp.content.len(), 1);
    assert!(matches!(&resp.content[0], ContentBlock::Text { text } if text == "graph LR"));
}

#[test]
fn parse_thinking_only_response_has_no_text() {
    let json = make_response(serde_json::json!([
        { "type": "thinking", "thinking": "Let me think..." }
    ]));
    let resp = parse_response(&json).unwrap();
    assert!(resp.content.is_empty());
    assert!(resp.text().is_none());
}

#[test]
fn parse_missing_stop_reason_defaults() {
    let json = serde_json::json!({
        "content": [{ "type": "text", "text": "hi" }],
        "model": "m",
        "stop_reason": null,
        "usage": { "input_tokens": 1, "output_tokens": 1 }
    })
    .to_string();
    let resp = parse_response(&json).unwrap();
    assert_eq!(resp.stop_reason, "end_turn");
}

#[test]
fn parse_invalid_json() {
    let err = parse_response("not json").unwrap_err();
    assert!(matches!(err, LlmError::ApiParse(_)));
}

#[test]
fn request_omits_tools_without_web_search() {
    let messages = [Message::user("describe")];
    let body = ApiRequest { model: "m", max_tokens: 10, system: "sys", messages: &messages, tools: None };
    let value = serde_json::to_value(&body).unwrap();
    assert!(value.get("tools").is_none());
    assert_eq!(value["messages"][0]["role"], "user");
    assert_eq!(value["messages"][0]["content"], "describe");
}

#[test]
fn request_includes_web_search_tool_when_enabled() {
    let messages = [Message::user("describe")];
    let body = ApiRequest { model: "m", max_tokens: 10, system: "sys", messages: &messages, tools: Some(web_search_tools()) };
    let value = serde_json::to_value(&body).unwrap();
    assert_eq!(value["tools"][0]["name"], "web_search");
}
