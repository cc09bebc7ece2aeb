//! Client Configuration and Request Types
//!
//! The configuration the client is constructed with and the request
//! bodies the chat service expects. Field names serialize to the wire's
//! camelCase.

use std::time::Duration;

use serde::Serialize;

use crate::retry::RetryPolicy;

/// Timeout applied to the chat stream request.
pub const DEFAULT_CHAT_TIMEOUT: Duration = Duration::from_secs(120);

/// Timeout applied to workflow mutations and queries.
pub const DEFAULT_MUTATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings for one chat service endpoint.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Service origin, e.g. `https://example.cloudfront.net` — the
    /// `/api/*` paths are appended to it.
    pub base_url: String,
    /// Bearer JWT from the identity provider; sent on every request.
    pub bearer_token: String,
    pub chat_timeout: Duration,
    pub mutation_timeout: Duration,
    pub retry: RetryPolicy,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, bearer_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            bearer_token: bearer_token.into(),
            chat_timeout: DEFAULT_CHAT_TIMEOUT,
            mutation_timeout: DEFAULT_MUTATION_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_chat_timeout(mut self, timeout: Duration) -> Self {
        self.chat_timeout = timeout;
        self
    }

    pub fn with_mutation_timeout(mut self, timeout: Duration) -> Self {
        self.mutation_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub query: String,
    pub session_id: String,
    pub user_id: String,
}

/// Body of `POST /api/actions/{id}/complete`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteActionRequest {
    pub session_id: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

/// Body of `POST /api/approvals/{id}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecideApprovalRequest {
    pub session_id: String,
    /// `"approve"` or `"reject"`.
    pub decision: String,
    pub approver: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}
