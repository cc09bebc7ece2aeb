//! Chat Session Controller
//!
//! Drives one user-facing chat session end to end: submitting a query
//! opens the SSE stream (with retry for transient failures) and applies
//! every event to the session state in arrival order; the workflow
//! mutations run behind the busy-state guard and merge the
//! server-confirmed record back into the current analysis. Every failure
//! path lands in visible state — a transcript message or a toast — so
//! the session never fails silently.

use std::time::{Duration, Instant};

use chrono::{SecondsFormat, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use supplysense_client::{
    retry, ChatApiClient, ChatClientError, ChatRequest, ChatResult, ClientConfig,
    CompleteActionRequest, DecideApprovalRequest,
};
use supplysense_core::{ApprovalDecision, SessionState, ToastKind};

/// How long a toast stays up before [`ChatSession::expire_toasts`]
/// removes it.
pub const TOAST_TTL: Duration = Duration::from_secs(5);

fn now_stamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// One signed-in user's chat session against the chat service.
pub struct ChatSession {
    client: ChatApiClient,
    user_id: String,
    state: SessionState,
    toast_deadlines: Vec<(String, Instant)>,
}

impl ChatSession {
    pub fn new(config: ClientConfig, user_id: impl Into<String>) -> Self {
        Self {
            client: ChatApiClient::new(config),
            user_id: user_id.into(),
            state: SessionState::new(&now_stamp()),
            toast_deadlines: Vec::new(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn client(&self) -> &ChatApiClient {
        &self.client
    }

    /// Swap the bearer token after the identity provider refreshes it.
    pub fn set_bearer_token(&mut self, token: impl Into<String>) {
        self.client.set_bearer_token(token);
    }

    /// Drop the transcript and analysis back to a fresh session.
    pub fn reset(&mut self) {
        self.state.reset(&now_stamp());
        self.toast_deadlines.clear();
    }

    // ── Query turn ─────────────────────────────────────────────────────

    /// Run one query end to end: transcript entry, SSE stream, progress
    /// updates, and the final analysis. Transient transport failures are
    /// retried with a fresh stream; each retry re-runs event dispatch
    /// from scratch, so only the last attempt's result is committed.
    pub async fn submit_query(&mut self, query: &str) {
        let query = query.trim();
        if query.is_empty() || self.client.config().bearer_token.trim().is_empty() {
            return;
        }

        let user_part = if self.user_id.is_empty() {
            "user"
        } else {
            self.user_id.as_str()
        };
        let session_id = format!("session-{}-{}", user_part, Uuid::new_v4());
        self.state.begin_query(query, &session_id, &now_stamp());

        let request = ChatRequest {
            query: query.to_string(),
            session_id,
            user_id: self.user_id.clone(),
        };
        let policy = self.client.config().retry;
        let mut turn = StreamTurn {
            client: &self.client,
            request: &request,
            state: &mut self.state,
        };
        let result = retry(&policy, &mut turn, |turn, _attempt| {
            Box::pin(run_stream_attempt(turn))
        })
        .await;

        if let Err(err) = result {
            self.state.fail_query(&err.to_string(), &now_stamp());
        }
        self.state.finish_query();
    }

    // ── Workflow mutations ─────────────────────────────────────────────

    /// Mark an action complete and patch the confirmed state into the
    /// current analysis. Duplicate calls while one is in flight are
    /// rejected by the busy tracker; the busy flag clears exactly once
    /// whatever the outcome.
    pub async fn mark_action_complete(&mut self, action_id: &str, comments: Option<&str>) {
        let session_id = match self.mutation_context() {
            Ok(session_id) => session_id,
            Err(err) => {
                self.push_toast(ToastKind::Error, err.to_string());
                return;
            }
        };
        if !self.state.busy_mut().begin_action(action_id) {
            tracing::debug!(action_id, "completion already in flight, ignoring");
            return;
        }

        let request = CompleteActionRequest {
            session_id,
            user_id: self.user_id.clone(),
            comments: comments.map(str::to_string),
        };
        match self.client.complete_action(action_id, &request).await {
            Ok(confirmed) => {
                self.state.settle_action_completed(
                    action_id,
                    confirmed.completed_at.clone(),
                    &now_stamp(),
                );
                let subject = confirmed
                    .notification
                    .as_ref()
                    .and_then(|n| n.subject.clone())
                    .or_else(|| self.existing_action_subject(action_id));
                match subject {
                    Some(subject) => self.push_toast(
                        ToastKind::Success,
                        format!("Action completed and notification sent.\n\nSubject: \"{subject}\""),
                    ),
                    None => self.push_toast(
                        ToastKind::Success,
                        "Action marked complete and notification sent.",
                    ),
                }
            }
            Err(err) => self.push_toast(ToastKind::Error, err.to_string()),
        }
        self.state.busy_mut().finish_action(action_id);
    }

    /// Record an approve/reject decision and patch the confirmed state
    /// into the current analysis. Same guard discipline as
    /// [`Self::mark_action_complete`].
    pub async fn submit_approval_decision(
        &mut self,
        approval_id: &str,
        decision: ApprovalDecision,
        comments: Option<&str>,
    ) {
        let session_id = match self.mutation_context() {
            Ok(session_id) => session_id,
            Err(err) => {
                self.push_toast(ToastKind::Error, err.to_string());
                return;
            }
        };
        if !self.state.busy_mut().begin_approval(approval_id, decision) {
            tracing::debug!(approval_id, "decision already in flight, ignoring");
            return;
        }

        let request = DecideApprovalRequest {
            session_id,
            decision: decision.as_str().to_string(),
            approver: self.user_id.clone(),
            comments: comments.map(str::to_string),
        };
        match self.client.decide_approval(approval_id, &request).await {
            Ok(confirmed) => {
                self.state.settle_approval_decided(
                    approval_id,
                    decision,
                    confirmed.decision_at.clone(),
                    confirmed.decided_by.clone(),
                    &self.user_id,
                    &now_stamp(),
                );
                let subject = confirmed
                    .notification
                    .as_ref()
                    .and_then(|n| n.subject.clone())
                    .or_else(|| self.existing_approval_subject(approval_id));
                match (subject, decision) {
                    (Some(subject), _) => self.push_toast(
                        ToastKind::Success,
                        format!(
                            "Approval {} and notification sent.\n\nSubject: \"{subject}\"",
                            decision.past_tense()
                        ),
                    ),
                    (None, ApprovalDecision::Approve) => self.push_toast(
                        ToastKind::Success,
                        "Approval recorded and notification sent.",
                    ),
                    (None, ApprovalDecision::Reject) => {
                        self.push_toast(ToastKind::Success, "Approval rejected.")
                    }
                }
            }
            Err(err) => self.push_toast(ToastKind::Error, err.to_string()),
        }
        self.state.busy_mut().finish_approval(approval_id);
    }

    /// Re-fetch the persisted workflow records for the active session
    /// and merge them into the current analysis.
    pub async fn refresh_workflow_state(&mut self) {
        let session_id = self.state.resolve_session_id();
        if session_id.is_empty() {
            self.push_toast(ToastKind::Error, ChatClientError::MissingSession.to_string());
            return;
        }
        let refreshed = tokio::try_join!(
            self.client.list_actions(&session_id),
            self.client.list_approvals(&session_id)
        );
        match refreshed {
            Ok((actions, approvals)) => self.state.merge_workflow_records(actions, approvals),
            Err(err) => {
                tracing::warn!(error = %err, "failed to refresh workflow state");
                self.push_toast(ToastKind::Error, err.to_string());
            }
        }
    }

    // ── Toasts ─────────────────────────────────────────────────────────

    /// Remove every toast whose display time is up. Call on a UI tick.
    pub fn expire_toasts(&mut self) {
        let now = Instant::now();
        let mut expired = Vec::new();
        self.toast_deadlines.retain(|(id, deadline)| {
            if *deadline <= now {
                expired.push(id.clone());
                false
            } else {
                true
            }
        });
        for id in expired {
            self.state.remove_toast(&id);
        }
    }

    fn push_toast(&mut self, kind: ToastKind, text: impl Into<String>) {
        let id = self.state.push_toast(kind, text);
        self.toast_deadlines.push((id, Instant::now() + TOAST_TTL));
    }

    // checked before any mutation leaves the client
    fn mutation_context(&self) -> ChatResult<String> {
        if self.client.config().bearer_token.trim().is_empty() {
            return Err(ChatClientError::MissingToken);
        }
        let session_id = self.state.resolve_session_id();
        if session_id.is_empty() {
            return Err(ChatClientError::MissingSession);
        }
        Ok(session_id)
    }

    fn existing_action_subject(&self, action_id: &str) -> Option<String> {
        self.state
            .find_action(action_id)?
            .notification
            .as_ref()?
            .subject
            .clone()
    }

    fn existing_approval_subject(&self, approval_id: &str) -> Option<String> {
        self.state
            .find_approval(approval_id)?
            .notification
            .as_ref()?
            .subject
            .clone()
    }
}

// Everything one stream attempt borrows from the session, bundled so
// the retry loop can lend it to each attempt in turn.
struct StreamTurn<'a> {
    client: &'a ChatApiClient,
    request: &'a ChatRequest,
    state: &'a mut SessionState,
}

// One pass over the chat stream: forward-drain events into the state
// while the transport future runs, then settle on its result. The next
// attempt (if any) starts a fresh stream and a fresh channel.
async fn run_stream_attempt(turn: &mut StreamTurn<'_>) -> ChatResult<()> {
    let client = turn.client;
    let request = turn.request;
    let state = &mut *turn.state;

    let (tx, mut rx) = mpsc::channel(64);
    let stream = client.stream_chat(request, tx);
    tokio::pin!(stream);

    let mut outcome: Option<ChatResult<()>> = None;
    let mut draining = true;
    loop {
        if !draining {
            if let Some(result) = outcome.take() {
                return result;
            }
        }
        tokio::select! {
            event = rx.recv(), if draining => match event {
                Some(event) => state.apply_stream_event(&event, &now_stamp()),
                None => draining = false,
            },
            result = &mut stream, if outcome.is_none() => outcome = Some(result),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use supplysense_core::WELCOME_MESSAGE;

    fn offline_session(token: &str) -> ChatSession {
        // port 9 is discard; nothing in these tests may reach the network
        ChatSession::new(
            ClientConfig::new("http://127.0.0.1:9", token),
            "ops@example.com",
        )
    }

    #[test]
    fn test_new_session_greets() {
        let session = offline_session("jwt");
        assert_eq!(session.state().messages().len(), 1);
        assert_eq!(session.state().messages()[0].text, WELCOME_MESSAGE);
    }

    #[tokio::test]
    async fn test_submit_query_ignores_blank_input_and_missing_token() {
        let mut session = offline_session("jwt");
        session.submit_query("   ").await;
        assert_eq!(session.state().messages().len(), 1);

        let mut session = offline_session("");
        session.submit_query("can I ship?").await;
        assert_eq!(session.state().messages().len(), 1);
    }

    #[tokio::test]
    async fn test_mutation_without_token_fails_locally() {
        let mut session = offline_session("");
        session.mark_action_complete("a1", None).await;
        let toasts = session.state().toasts();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].kind, ToastKind::Error);
        assert_eq!(
            toasts[0].text,
            "Authentication token is missing. Please sign in again."
        );
    }

    #[tokio::test]
    async fn test_mutation_without_session_fails_locally() {
        let mut session = offline_session("jwt");
        session
            .submit_approval_decision("ap1", ApprovalDecision::Approve, None)
            .await;
        let toasts = session.state().toasts();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].text, "No active session.");
        assert!(!session.state().busy().is_approval_busy("ap1"));
    }

    #[tokio::test]
    async fn test_busy_guard_rejects_duplicate_mutation() {
        let mut session = offline_session("jwt");
        // give the session something to mutate against
        session.state.begin_query("q", "session-test-1", "t");
        session.state.busy_mut().begin_action("a1");

        session.mark_action_complete("a1", None).await;

        // rejected before any toast or settle; the original busy flag
        // is still owned by the first caller
        assert!(session.state().toasts().is_empty());
        assert!(session.state().busy().is_action_busy("a1"));
    }

    #[test]
    fn test_toasts_expire_after_deadline() {
        let mut session = offline_session("jwt");
        session.push_toast(ToastKind::Info, "hello");
        assert_eq!(session.state().toasts().len(), 1);

        session.expire_toasts();
        assert_eq!(session.state().toasts().len(), 1, "not yet due");

        for (_, deadline) in &mut session.toast_deadlines {
            *deadline = Instant::now() - Duration::from_millis(1);
        }
        session.expire_toasts();
        assert!(session.state().toasts().is_empty());
        assert!(session.toast_deadlines.is_empty());
    }
}
