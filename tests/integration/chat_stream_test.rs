//! Full query turn against a mocked SSE chat service.

use supplysense_chat::MessageRole;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::{analysis_stream_body, session_for};

#[tokio::test]
async fn query_turn_commits_normalized_analysis() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(header("authorization", "Bearer test-token"))
        .and(header("accept", "text/event-stream"))
        .and(body_partial_json(serde_json::json!({"userId": "ops@example.com"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(analysis_stream_body(), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    session.submit_query("Can I fulfill all orders this week?").await;

    let state = session.state();
    let analysis = state.analysis().expect("analysis committed");
    assert_eq!(analysis.can_fulfill, Some(true));
    assert_eq!(analysis.confidence, "81%");
    assert_eq!(analysis.risk_level, "Low");
    assert_eq!(analysis.summary, "OK");
    assert_eq!(analysis.next_steps, vec!["ship".to_string()]);
    assert_eq!(analysis.session_id.as_deref(), Some("s1"));

    // the analysis's own session id wins over the minted one
    assert_eq!(state.resolve_session_id(), "s1");

    // transcript: welcome, user query, two agent results, completion
    let messages = state.messages();
    assert_eq!(messages.len(), 5);
    assert_eq!(messages[1].role, MessageRole::User);
    assert_eq!(messages[2].text, "✅ Inventory agent responded");
    assert_eq!(messages[3].text, "✅ Risk agent responded");
    assert_eq!(
        messages[4].text,
        "Multi-agent analysis complete. See the summary below."
    );

    assert_eq!(state.progress(), None);
    assert!(!state.is_loading());
}

#[tokio::test]
async fn malformed_frames_do_not_abort_the_stream() {
    let server = MockServer::start().await;
    let body = [
        "data: {broken json",
        r#"data: {"type": "final_response", "response": {"summary": "Recovered"}}"#,
        r#"data: {"type": "complete"}"#,
        "",
    ]
    .join("\n\n");
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    session.submit_query("q").await;

    let analysis = session.state().analysis().expect("analysis committed");
    assert_eq!(analysis.summary, "Recovered");
}

#[tokio::test]
async fn string_encoded_final_response_is_normalized() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"type\": \"final_response\", \"response\": ",
        "\"{\\\"fusion\\\": {\\\"summary\\\": \\\"Encoded\\\", \\\"decision\\\": {\\\"confidence\\\": 0.5}}}\"}\n",
        "data: {\"type\": \"complete\"}\n",
    );
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    session.submit_query("q").await;

    let analysis = session.state().analysis().expect("analysis committed");
    assert_eq!(analysis.summary, "Encoded");
    assert_eq!(analysis.confidence, "50%");
}

#[tokio::test]
async fn stream_without_final_response_leaves_no_analysis() {
    let server = MockServer::start().await;
    let body = "data: {\"type\": \"status\", \"message\": \"working\"}\n\ndata: {\"type\": \"complete\"}\n\n";
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    session.submit_query("q").await;

    assert!(session.state().analysis().is_none());
    assert_eq!(session.state().progress(), None);
    assert!(!session.state().is_loading());
}
