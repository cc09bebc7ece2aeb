//! Retry, timeout, and upstream-error behavior of the query turn.

use std::time::Duration;

use supplysense_chat::{ChatSession, ClientConfig, RetryPolicy};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::{analysis_stream_body, session_for};

fn impatient_session(server: &MockServer) -> ChatSession {
    let config = ClientConfig::new(server.uri(), "test-token")
        .with_chat_timeout(Duration::from_millis(200))
        .with_retry(RetryPolicy {
            max_attempts: 2,
            backoff_base: Duration::from_millis(10),
        });
    ChatSession::new(config, "ops@example.com")
}

#[tokio::test]
async fn timeout_retries_once_then_surfaces_timeout_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(5))
                .set_body_raw(analysis_stream_body(), "text/event-stream"),
        )
        .expect(2)
        .mount(&server)
        .await;

    let mut session = impatient_session(&server);
    session.submit_query("q").await;

    let last = session.state().messages().last().unwrap();
    assert_eq!(last.text, "❌ Error: Network timeout. Please try again.");
    assert!(session.state().analysis().is_none());
}

#[tokio::test]
async fn second_attempt_can_succeed_after_a_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(5))
                .set_body_raw(analysis_stream_body(), "text/event-stream"),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(analysis_stream_body(), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let mut session = impatient_session(&server);
    session.submit_query("q").await;

    let analysis = session.state().analysis().expect("second attempt succeeded");
    assert_eq!(analysis.summary, "OK");
}

#[tokio::test]
async fn http_failure_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    session.submit_query("q").await;

    let last = session.state().messages().last().unwrap();
    assert_eq!(last.text, "❌ Error: HTTP error 502");
}

#[tokio::test]
async fn upstream_error_event_fails_immediately_without_retry() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"type\": \"status\", \"message\": \"routing\"}\n\n",
        "data: {\"type\": \"error\", \"error\": \"Orchestrator runtime ARN not found\"}\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    session.submit_query("q").await;

    let last = session.state().messages().last().unwrap();
    assert_eq!(last.text, "❌ Error: Orchestrator runtime ARN not found");
    // the failed turn forgets its in-flight session
    assert_eq!(session.state().resolve_session_id(), "");
}
