//! Chat View Model
//!
//! The stable shapes the UI renders: the chat transcript, the analysis
//! summary produced from a completed query, and the workflow items
//! (actions and approvals) the user can act on. These types are built by
//! the normalizer and patched in place by the session state machine;
//! nothing here talks to the network.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

static ID_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Mint a process-unique identifier with the given prefix, e.g. `msg-7`.
///
/// Used for chat messages, toasts, and workflow entries arriving without
/// an id of their own.
pub fn unique_id(prefix: &str) -> String {
    let n = ID_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{n}")
}

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Agent,
}

/// One entry in the append-only chat transcript. Never mutated after
/// creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub role: MessageRole,
    pub text: String,
    pub created_at: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, text: impl Into<String>, created_at: impl Into<String>) -> Self {
        Self {
            id: unique_id("msg"),
            role,
            text: text.into(),
            created_at: created_at.into(),
        }
    }
}

/// A drafted notification attached to a completed action or decided
/// approval.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// One audit-trail entry on a workflow item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowLogEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
}

/// Structured insight block an agent may attach to its finding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInsights {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub metrics: Vec<String>,
    #[serde(default)]
    pub blockers: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// One upstream agent's contribution to the analysis. Derived once per
/// normalization pass and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentFinding {
    pub agent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Plain text; markdown markers are stripped during normalization.
    pub summary: String,
    #[serde(default)]
    pub blockers: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insights: Option<AgentInsights>,
}

/// A recommended action the user can mark complete. Identity is `id`;
/// the entry is looked up and patched in place once the completion is
/// confirmed server-side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionItem {
    pub id: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_log: Option<Vec<WorkflowLogEntry>>,
}

/// An approval request awaiting a two-valued decision (approve/reject).
/// Same lifecycle as [`ActionItem`]: patched in place, never removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalItem {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_log: Option<Vec<WorkflowLogEntry>>,
}

/// The normalized result of one completed multi-agent query.
///
/// Exactly one logical instance exists per completed query; it is
/// replaced wholesale when the next query finishes, while individual
/// action/approval entries inside it may be patched after a mutation
/// succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub summary: String,
    /// `Some` only when the upstream decision carried a strict boolean;
    /// `None` means pending/unknown.
    pub can_fulfill: Option<bool>,
    /// Pre-formatted percentage (`"81%"`) or the literal `"N/A"`.
    pub confidence: String,
    /// Normalized label, e.g. `"High"` or `"Not assessed"`.
    pub risk_level: String,
    #[serde(default)]
    pub blockers: Vec<String>,
    #[serde(default)]
    pub agent_findings: Vec<AgentFinding>,
    #[serde(default)]
    pub actions: Vec<ActionItem>,
    #[serde(default)]
    pub approvals: Vec<ApprovalItem>,
    #[serde(default)]
    pub next_steps: Vec<String>,
    /// Sanitized HTML, already escaped and paragraph-wrapped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_type: Option<String>,
}

/// Severity of a transient toast notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

/// A transient notification. Never persisted; the session controller
/// expires it after a fixed delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToastMessage {
    pub id: String,
    pub kind: ToastKind,
    pub text: String,
}
