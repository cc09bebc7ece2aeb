//! Integration Tests Module
//!
//! End-to-end coverage for the chat session controller against a mock
//! chat service: streaming query turns, retry and timeout behavior, and
//! the workflow mutation flows.

// Full query turn over a mocked SSE stream
mod chat_stream_test;

// Retry, timeout, and upstream-error handling
mod retry_timeout_test;

// Action completion and approval decision flows
mod workflow_mutation_test;

use supplysense_chat::{ChatSession, ClientConfig};
use wiremock::MockServer;

/// Session pointed at the mock server with a valid token.
pub fn session_for(server: &MockServer) -> ChatSession {
    ChatSession::new(
        ClientConfig::new(server.uri(), "test-token"),
        "ops@example.com",
    )
}

/// SSE body for a representative successful query.
pub fn analysis_stream_body() -> String {
    [
        r#"data: {"type": "status", "message": "Routing to orchestrator...", "timestamp": "t0"}"#,
        r#"data: {"type": "agent_result", "message": "Inventory agent responded", "timestamp": "t1"}"#,
        r#"data: {"type": "agent_result", "message": "Risk agent responded", "timestamp": "t2"}"#,
        r#"data: {"type": "final_response", "response": {"fusion": {"decision": {"canFulfill": true, "confidence": 0.81, "riskLevel": "low"}, "summary": "OK", "agentFindings": [], "actions": [], "approvals": [], "nextSteps": ["ship"]}, "sessionId": "s1"}, "timestamp": "t3"}"#,
        r#"data: {"type": "complete", "message": "Analysis complete", "timestamp": "t4"}"#,
        "",
    ]
    .join("\n\n")
}
