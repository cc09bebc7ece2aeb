//! Session State Machine
//!
//! All mutable UI-facing state for one chat session lives in
//! [`SessionState`], mutated only through named transitions:
//! `begin_query`, `apply_stream_event`, `fail_query`, the mutation
//! settle methods, and the toast helpers. Keeping the transitions on one
//! type makes the ordering rules explicit — a new query replaces the
//! analysis wholesale, mutations patch entries in place, and busy flags
//! clear exactly once per settle.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::events::ChatStreamEvent;
use crate::model::{
    unique_id, ActionItem, AnalysisResult, ApprovalItem, ChatMessage, MessageRole, ToastKind,
    ToastMessage,
};
use crate::normalize::{build_analysis_result, merge_action_lists, merge_approval_lists};

/// Greeting shown at the start of every session.
pub const WELCOME_MESSAGE: &str = "Hello! I'm your SupplySense AI assistant. Ask me about \
inventory levels, fulfillment capacity, or supply chain optimization. For example: \"Can I \
fulfill all customer orders this week given current inventory?\"";

/// Progress text shown while the request is being routed.
pub const ROUTING_PROGRESS: &str = "Routing to orchestrator...";

/// Fallback progress text when a status event carries no message.
pub const DEFAULT_PROGRESS: &str = "AI agents analyzing…";

const COMPLETION_MESSAGE: &str = "Multi-agent analysis complete. See the summary below.";

/// The two possible outcomes of an approval decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalDecision {
    Approve,
    Reject,
}

impl ApprovalDecision {
    /// Wire verb sent to the approvals endpoint.
    pub fn as_str(self) -> &'static str {
        match self {
            ApprovalDecision::Approve => "approve",
            ApprovalDecision::Reject => "reject",
        }
    }

    /// Status label the decision resolves to.
    pub fn status_label(self) -> &'static str {
        match self {
            ApprovalDecision::Approve => "Approved",
            ApprovalDecision::Reject => "Rejected",
        }
    }

    /// Past-tense verb for toast copy.
    pub fn past_tense(self) -> &'static str {
        match self {
            ApprovalDecision::Approve => "approved",
            ApprovalDecision::Reject => "rejected",
        }
    }
}

/// Tracks which workflow entities have a mutation in flight.
///
/// The authoritative duplicate-submission guard: `begin_*` refuses an id
/// that is already busy, and each busy id clears exactly once when the
/// mutation settles. An approval additionally records which decision is
/// pending so the UI can label the in-flight control.
#[derive(Debug, Clone, Default)]
pub struct BusyTracker {
    actions: HashSet<String>,
    approvals: HashSet<String>,
    pending_decisions: HashMap<String, ApprovalDecision>,
}

impl BusyTracker {
    /// Mark an action busy. Returns `false` (and changes nothing) when a
    /// completion for this id is already in flight.
    pub fn begin_action(&mut self, id: &str) -> bool {
        self.actions.insert(id.to_string())
    }

    pub fn finish_action(&mut self, id: &str) {
        self.actions.remove(id);
    }

    pub fn is_action_busy(&self, id: &str) -> bool {
        self.actions.contains(id)
    }

    /// Mark an approval busy with the given pending decision. Returns
    /// `false` when a decision for this id is already in flight.
    pub fn begin_approval(&mut self, id: &str, decision: ApprovalDecision) -> bool {
        if !self.approvals.insert(id.to_string()) {
            return false;
        }
        self.pending_decisions.insert(id.to_string(), decision);
        true
    }

    pub fn finish_approval(&mut self, id: &str) {
        self.approvals.remove(id);
        self.pending_decisions.remove(id);
    }

    pub fn is_approval_busy(&self, id: &str) -> bool {
        self.approvals.contains(id)
    }

    pub fn pending_decision(&self, id: &str) -> Option<ApprovalDecision> {
        self.pending_decisions.get(id).copied()
    }

    pub fn is_idle(&self) -> bool {
        self.actions.is_empty() && self.approvals.is_empty()
    }

    fn clear(&mut self) {
        self.actions.clear();
        self.approvals.clear();
        self.pending_decisions.clear();
    }
}

/// Mutable state of one chat session.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    messages: Vec<ChatMessage>,
    analysis: Option<AnalysisResult>,
    active_session_id: String,
    progress: Option<String>,
    is_loading: bool,
    busy: BusyTracker,
    toasts: Vec<ToastMessage>,
}

impl SessionState {
    /// Fresh session opening with the welcome message.
    pub fn new(timestamp: &str) -> Self {
        let mut state = Self::default();
        state.messages.push(ChatMessage::new(
            MessageRole::Agent,
            WELCOME_MESSAGE,
            timestamp,
        ));
        state
    }

    /// Drop everything back to the freshly-opened state.
    pub fn reset(&mut self, timestamp: &str) {
        self.messages.clear();
        self.messages.push(ChatMessage::new(
            MessageRole::Agent,
            WELCOME_MESSAGE,
            timestamp,
        ));
        self.analysis = None;
        self.active_session_id.clear();
        self.progress = None;
        self.is_loading = false;
        self.busy.clear();
        self.toasts.clear();
    }

    // ── Query lifecycle ────────────────────────────────────────────────

    /// Transition: the user submitted a query. Appends the user message,
    /// discards the previous analysis, and starts the progress spinner.
    pub fn begin_query(&mut self, query: &str, session_id: &str, timestamp: &str) {
        self.messages
            .push(ChatMessage::new(MessageRole::User, query, timestamp));
        self.analysis = None;
        self.active_session_id = session_id.to_string();
        self.progress = Some(ROUTING_PROGRESS.to_string());
        self.is_loading = true;
    }

    /// Transition: one stream event arrived. Events are applied strictly
    /// in arrival order; unknown kinds are ignored.
    pub fn apply_stream_event(&mut self, event: &ChatStreamEvent, timestamp: &str) {
        match event {
            ChatStreamEvent::Status { message } => {
                self.progress = Some(
                    message
                        .as_deref()
                        .filter(|m| !m.is_empty())
                        .unwrap_or(DEFAULT_PROGRESS)
                        .to_string(),
                );
            }
            ChatStreamEvent::AgentStart { message }
            | ChatStreamEvent::AgentResult { message }
            | ChatStreamEvent::Analysis { message } => {
                let prefix = event.transcript_prefix().unwrap_or_default();
                let text = format!("{} {}", prefix, message.as_deref().unwrap_or(""));
                self.messages.push(ChatMessage::new(
                    MessageRole::Agent,
                    text.trim(),
                    timestamp,
                ));
                if let Some(message) = message.as_deref().filter(|m| !m.is_empty()) {
                    self.progress = Some(message.to_string());
                }
            }
            ChatStreamEvent::Complete { .. } => {
                self.progress = None;
            }
            ChatStreamEvent::FinalResponse { response } => {
                let result = build_analysis_result(response);
                if let Some(session_id) = result
                    .session_id
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                {
                    self.active_session_id = session_id.to_string();
                }
                self.analysis = Some(result);
                self.progress = None;
                self.messages.push(ChatMessage::new(
                    MessageRole::Agent,
                    COMPLETION_MESSAGE,
                    timestamp,
                ));
            }
            // error events abort the stream before dispatch; unknown
            // kinds carry nothing for us
            ChatStreamEvent::Error { .. } | ChatStreamEvent::Unknown => {}
        }
    }

    /// Transition: the query failed. Appends the failure message and
    /// forgets the in-flight session.
    pub fn fail_query(&mut self, message: &str, timestamp: &str) {
        self.messages.push(ChatMessage::new(
            MessageRole::Agent,
            format!("❌ Error: {message}"),
            timestamp,
        ));
        self.active_session_id.clear();
        self.progress = None;
        self.is_loading = false;
    }

    /// Transition: the query settled, success or failure.
    pub fn finish_query(&mut self) {
        self.is_loading = false;
        self.progress = None;
    }

    /// The session id mutations should target: the in-flight one, else
    /// the one the last analysis carried.
    pub fn resolve_session_id(&self) -> String {
        if !self.active_session_id.trim().is_empty() {
            return self.active_session_id.trim().to_string();
        }
        self.analysis
            .as_ref()
            .and_then(|a| a.session_id.as_deref())
            .unwrap_or("")
            .trim()
            .to_string()
    }

    // ── Mutation settling ──────────────────────────────────────────────

    /// Patch a confirmed action completion into the list entry, leaving
    /// every other field and entry untouched.
    pub fn settle_action_completed(&mut self, id: &str, completed_at: Option<String>, fallback_timestamp: &str) {
        let Some(analysis) = self.analysis.as_mut() else {
            return;
        };
        if let Some(action) = analysis.actions.iter_mut().find(|a| a.id == id) {
            action.status = Some("Completed".to_string());
            action.completed_at =
                Some(completed_at.unwrap_or_else(|| fallback_timestamp.to_string()));
        }
    }

    /// Patch a confirmed approval decision into the list entry.
    pub fn settle_approval_decided(
        &mut self,
        id: &str,
        decision: ApprovalDecision,
        decision_at: Option<String>,
        decided_by: Option<String>,
        fallback_actor: &str,
        fallback_timestamp: &str,
    ) {
        let Some(analysis) = self.analysis.as_mut() else {
            return;
        };
        if let Some(approval) = analysis.approvals.iter_mut().find(|a| a.id == id) {
            approval.status = Some(decision.status_label().to_string());
            approval.decision = Some(decision.past_tense().to_string());
            approval.decision_at =
                Some(decision_at.unwrap_or_else(|| fallback_timestamp.to_string()));
            approval.decided_by =
                Some(decided_by.unwrap_or_else(|| fallback_actor.to_string()));
        }
    }

    /// Merge refreshed workflow records into the current analysis by id.
    /// No-op without a current analysis.
    pub fn merge_workflow_records(&mut self, actions: Vec<ActionItem>, approvals: Vec<ApprovalItem>) {
        let Some(analysis) = self.analysis.as_mut() else {
            return;
        };
        analysis.actions = merge_action_lists(&analysis.actions, &actions);
        analysis.approvals = merge_approval_lists(&analysis.approvals, &approvals);
    }

    // ── Toasts ─────────────────────────────────────────────────────────

    /// Queue a toast; returns its id so the controller can expire it.
    pub fn push_toast(&mut self, kind: ToastKind, text: impl Into<String>) -> String {
        let id = unique_id("toast");
        self.toasts.push(ToastMessage {
            id: id.clone(),
            kind,
            text: text.into(),
        });
        id
    }

    pub fn remove_toast(&mut self, id: &str) {
        self.toasts.retain(|toast| toast.id != id);
    }

    // ── Accessors ──────────────────────────────────────────────────────

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    pub fn find_action(&self, id: &str) -> Option<&ActionItem> {
        self.analysis.as_ref()?.actions.iter().find(|a| a.id == id)
    }

    pub fn find_approval(&self, id: &str) -> Option<&ApprovalItem> {
        self.analysis.as_ref()?.approvals.iter().find(|a| a.id == id)
    }

    pub fn progress(&self) -> Option<&str> {
        self.progress.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn busy(&self) -> &BusyTracker {
        &self.busy
    }

    pub fn busy_mut(&mut self) -> &mut BusyTracker {
        &mut self.busy
    }

    pub fn toasts(&self) -> &[ToastMessage] {
        &self.toasts
    }
}
