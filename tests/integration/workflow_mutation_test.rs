//! Action completion and approval decision flows, end to end.

use serde_json::json;
use supplysense_chat::{ApprovalDecision, ChatSession, ToastKind};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::session_for;

/// Run a chat turn that seeds the session with one action and one
/// approval under session id `s1`.
async fn seeded_session(server: &MockServer) -> ChatSession {
    let body = [
        r#"data: {"type": "final_response", "response": {"fusion": {"summary": "Plan ready", "actions": [{"id": "a1", "description": "Draft emergency PO", "status": "pending"}, {"id": "a2", "description": "Notify customer service"}], "approvals": [{"id": "ap1", "title": "Approve emergency replenishment", "requires": "Supply Chain Director"}], "sessionId": "s1"}}}"#,
        r#"data: {"type": "complete"}"#,
        "",
    ]
    .join("\n\n");
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(server)
        .await;

    let mut session = session_for(server);
    session.submit_query("What should I do about the shortfall?").await;
    assert!(session.state().analysis().is_some());
    session
}

#[tokio::test]
async fn completing_an_action_patches_only_that_entry() {
    let server = MockServer::start().await;
    let mut session = seeded_session(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/actions/a1/complete"))
        .and(body_partial_json(json!({"sessionId": "s1", "userId": "ops@example.com"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "action": {
                "actionId": "a1",
                "status": "completed",
                "completedAt": "2026-02-01T00:00:00Z",
                "notification": {"subject": "Action Completed: Draft emergency PO"}
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let untouched = session.state().find_action("a2").unwrap().clone();
    session.mark_action_complete("a1", None).await;

    let state = session.state();
    let patched = state.find_action("a1").unwrap();
    assert_eq!(patched.status.as_deref(), Some("Completed"));
    assert_eq!(patched.completed_at.as_deref(), Some("2026-02-01T00:00:00Z"));
    assert_eq!(patched.description, "Draft emergency PO");
    assert_eq!(state.find_action("a2").unwrap(), &untouched);

    let toasts = state.toasts();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].kind, ToastKind::Success);
    assert!(toasts[0]
        .text
        .contains("Subject: \"Action Completed: Draft emergency PO\""));

    assert!(!state.busy().is_action_busy("a1"));
}

#[tokio::test]
async fn failed_completion_leaves_the_model_unchanged() {
    let server = MockServer::start().await;
    let mut session = seeded_session(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/actions/a1/complete"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "Action not found"})))
        .mount(&server)
        .await;

    let before = session.state().analysis().unwrap().clone();
    session.mark_action_complete("a1", None).await;

    let state = session.state();
    assert_eq!(state.analysis().unwrap(), &before);
    let toasts = state.toasts();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].kind, ToastKind::Error);
    assert_eq!(toasts[0].text, "Action not found");
    assert!(!state.busy().is_action_busy("a1"));
}

#[tokio::test]
async fn rejecting_an_approval_records_the_decision() {
    let server = MockServer::start().await;
    let mut session = seeded_session(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/approvals/ap1"))
        .and(body_partial_json(json!({"decision": "reject", "approver": "ops@example.com"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "approval": {
                "approvalId": "ap1",
                "status": "rejected",
                "decisionAt": "2026-02-01T00:00:00Z",
                "decidedBy": "ops@example.com"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    session
        .submit_approval_decision("ap1", ApprovalDecision::Reject, None)
        .await;

    let state = session.state();
    let approval = state.find_approval("ap1").unwrap();
    assert_eq!(approval.status.as_deref(), Some("Rejected"));
    assert_eq!(approval.decided_by.as_deref(), Some("ops@example.com"));
    assert_eq!(approval.decision_at.as_deref(), Some("2026-02-01T00:00:00Z"));

    let toasts = state.toasts();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].text, "Approval rejected.");
    assert!(!state.busy().is_approval_busy("ap1"));
}

#[tokio::test]
async fn comments_are_forwarded_to_the_service() {
    let server = MockServer::start().await;
    let mut session = seeded_session(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/actions/a1/complete"))
        .and(body_partial_json(json!({"comments": "verified in WMS"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "action": {"actionId": "a1", "status": "completed"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    session
        .mark_action_complete("a1", Some("verified in WMS"))
        .await;
    assert_eq!(session.state().toasts().len(), 1);
}

#[tokio::test]
async fn refresh_merges_persisted_records_into_the_analysis() {
    let server = MockServer::start().await;
    let mut session = seeded_session(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/actions"))
        .and(query_param("sessionId", "s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "actionId": "a1",
                "description": "Draft emergency PO",
                "status": "completed",
                "completedAt": "2026-02-01T00:00:00Z",
                "owner": "Operations Team",
                "workflowLog": [{"timestamp": "t", "event": "ACTION_COMPLETED", "message": "done", "actor": "ops"}]
            }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/approvals"))
        .and(query_param("sessionId", "s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"approvalId": "ap2", "title": "Approve expedited freight", "status": "pending_approval"}]
        })))
        .mount(&server)
        .await;

    session.refresh_workflow_state().await;

    let state = session.state();
    let analysis = state.analysis().unwrap();

    // existing action picked up the persisted fields in place
    let refreshed = state.find_action("a1").unwrap();
    assert_eq!(refreshed.status.as_deref(), Some("completed"));
    assert_eq!(refreshed.owner.as_deref(), Some("Operations Team"));
    assert_eq!(refreshed.description, "Draft emergency PO");
    assert_eq!(refreshed.workflow_log.as_ref().map(Vec::len), Some(1));

    // unseen approval appended, existing one untouched
    assert_eq!(analysis.approvals.len(), 2);
    assert_eq!(analysis.approvals[0].id, "ap1");
    assert_eq!(analysis.approvals[1].title, "Approve expedited freight");
}
