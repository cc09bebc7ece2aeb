//! Chat Service API
//!
//! All HTTP traffic to the chat service: the streaming chat call, the
//! action/approval mutations, the workflow list queries, and the health
//! probe. Responses are normalized into the core view model before they
//! leave this module.

use serde_json::Value;
use tokio::sync::mpsc;

use supplysense_core::{
    map_action_record, map_approval_record, ActionItem, ApprovalItem, ChatStreamEvent,
};

use crate::error::{network_error, ChatClientError, ChatResult};
use crate::http_client::build_http_client;
use crate::retry::with_timeout;
use crate::stream::EventStream;
use crate::types::{ChatRequest, ClientConfig, CompleteActionRequest, DecideApprovalRequest};

/// Client for one chat service endpoint.
pub struct ChatApiClient {
    config: ClientConfig,
    http: reqwest::Client,
}

impl ChatApiClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            http: build_http_client(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Swap the bearer token after a token refresh.
    pub fn set_bearer_token(&mut self, token: impl Into<String>) {
        self.config.bearer_token = token.into();
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn require_token(&self) -> ChatResult<&str> {
        let token = self.config.bearer_token.trim();
        if token.is_empty() {
            return Err(ChatClientError::MissingToken);
        }
        Ok(token)
    }

    fn require_session(session_id: &str) -> ChatResult<&str> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(ChatClientError::MissingSession);
        }
        Ok(session_id)
    }

    // ── Chat stream ────────────────────────────────────────────────────

    /// Open the SSE stream for one query. The configured chat timeout
    /// bounds the time to response headers; reading the body is bounded
    /// by the server closing the stream.
    pub async fn open_chat_stream(&self, request: &ChatRequest) -> ChatResult<EventStream> {
        let token = self.require_token()?;
        let response = with_timeout(self.config.chat_timeout, async {
            self.http
                .post(self.url("/api/chat"))
                .bearer_auth(token)
                .header(reqwest::header::ACCEPT, "text/event-stream")
                .json(request)
                .send()
                .await
                .map_err(network_error)
        })
        .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatClientError::Http {
                status: status.as_u16(),
                message: format!("HTTP error {}", status.as_u16()),
            });
        }
        Ok(EventStream::from_response(response))
    }

    /// Run one full pass over the chat stream, forwarding each event on
    /// `tx` in arrival order.
    ///
    /// An upstream `error` event aborts the pass with
    /// [`ChatClientError::Upstream`] without forwarding it; callers
    /// decide whether the failure is worth a retry, and a retried pass
    /// starts from a fresh stream.
    pub async fn stream_chat(
        &self,
        request: &ChatRequest,
        tx: mpsc::Sender<ChatStreamEvent>,
    ) -> ChatResult<()> {
        let mut events = self.open_chat_stream(request).await?;
        while let Some(event) = events.next_event().await? {
            if let ChatStreamEvent::Error { error } = &event {
                return Err(ChatClientError::Upstream {
                    message: error
                        .clone()
                        .unwrap_or_else(|| "Unknown error from agent.".to_string()),
                });
            }
            // the receiver hanging up just means nobody is listening
            let _ = tx.send(event).await;
        }
        Ok(())
    }

    // ── Workflow mutations ─────────────────────────────────────────────

    /// Mark an action complete; returns the server-confirmed record.
    pub async fn complete_action(
        &self,
        action_id: &str,
        request: &CompleteActionRequest,
    ) -> ChatResult<ActionItem> {
        let token = self.require_token()?;
        Self::require_session(&request.session_id)?;
        let path = format!("/api/actions/{}/complete", urlencoding::encode(action_id));

        with_timeout(self.config.mutation_timeout, async {
            let response = self
                .http
                .post(self.url(&path))
                .bearer_auth(token)
                .json(request)
                .send()
                .await
                .map_err(network_error)?;
            let payload = Self::json_or_empty(response.status(), response, || {
                "Failed to mark action complete".to_string()
            })
            .await?;
            let record = payload.get("action").cloned().unwrap_or(Value::Null);
            Ok(map_action_record(&record))
        })
        .await
    }

    /// Record an approval decision; returns the server-confirmed record.
    pub async fn decide_approval(
        &self,
        approval_id: &str,
        request: &DecideApprovalRequest,
    ) -> ChatResult<ApprovalItem> {
        let token = self.require_token()?;
        Self::require_session(&request.session_id)?;
        let path = format!("/api/approvals/{}", urlencoding::encode(approval_id));
        let decision = request.decision.clone();

        with_timeout(self.config.mutation_timeout, async {
            let response = self
                .http
                .post(self.url(&path))
                .bearer_auth(token)
                .json(request)
                .send()
                .await
                .map_err(network_error)?;
            let payload = Self::json_or_empty(response.status(), response, || {
                format!("Failed to {decision} approval")
            })
            .await?;
            let record = payload.get("approval").cloned().unwrap_or(Value::Null);
            Ok(map_approval_record(&record))
        })
        .await
    }

    // ── Workflow queries ───────────────────────────────────────────────

    /// Fetch the persisted action records for a session.
    pub async fn list_actions(&self, session_id: &str) -> ChatResult<Vec<ActionItem>> {
        let records = self.list_records("/api/actions", session_id, "actions").await?;
        Ok(records.iter().map(map_action_record).collect())
    }

    /// Fetch the persisted approval records for a session.
    pub async fn list_approvals(&self, session_id: &str) -> ChatResult<Vec<ApprovalItem>> {
        let records = self
            .list_records("/api/approvals", session_id, "approvals")
            .await?;
        Ok(records.iter().map(map_approval_record).collect())
    }

    async fn list_records(
        &self,
        path: &str,
        session_id: &str,
        what: &str,
    ) -> ChatResult<Vec<Value>> {
        let token = self.require_token()?;
        let session_id = Self::require_session(session_id)?;

        with_timeout(self.config.mutation_timeout, async {
            let response = self
                .http
                .get(self.url(path))
                .query(&[("sessionId", session_id)])
                .bearer_auth(token)
                .send()
                .await
                .map_err(network_error)?;
            let payload = Self::json_or_empty(response.status(), response, || {
                format!("Failed to fetch {what}")
            })
            .await?;
            Ok(payload
                .get("items")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default())
        })
        .await
    }

    // ── Health ─────────────────────────────────────────────────────────

    /// Check that the service is reachable and reports itself healthy.
    pub async fn health_check(&self) -> ChatResult<()> {
        let response = self
            .http
            .get(self.url("/api/health"))
            .send()
            .await
            .map_err(network_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChatClientError::Http {
                status: status.as_u16(),
                message: format!("Health check failed ({})", status.as_u16()),
            });
        }
        let payload: Value = response.json().await.map_err(|err| ChatClientError::Parse {
            message: err.to_string(),
        })?;
        match payload.get("status").and_then(Value::as_str) {
            Some("healthy") => Ok(()),
            other => Err(ChatClientError::Upstream {
                message: format!("Service reported status {:?}", other.unwrap_or("unknown")),
            }),
        }
    }

    // Reads the JSON body, tolerating an empty or malformed one, and
    // turns a non-2xx status into an error carrying the server's error
    // text when it sent any.
    async fn json_or_empty(
        status: reqwest::StatusCode,
        response: reqwest::Response,
        fallback: impl FnOnce() -> String,
    ) -> ChatResult<Value> {
        let payload: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            let message = payload
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("{} ({})", fallback(), status.as_u16()));
            return Err(ChatClientError::Http {
                status: status.as_u16(),
                message,
            });
        }
        Ok(payload)
    }
}
