//! SupplySense Core
//!
//! Foundational types and pure logic for the SupplySense chat client:
//! the view model, the wire event kinds, payload normalization, text
//! cleanup, and the session state machine. This crate has zero
//! dependencies on application-level code (HTTP, async runtime, UI).
//!
//! ## Module Organization
//!
//! - `model` - View-model types (`ChatMessage`, `AnalysisResult`, workflow items)
//! - `events` - Wire SSE event kinds (`ChatStreamEvent`)
//! - `normalize` - Fusion payload → `AnalysisResult` normalization and record merging
//! - `text` - Markdown stripping, HTML escaping, label formatting
//! - `state` - `SessionState` transitions and the `BusyTracker` guard
//!
//! ## Design Principles
//!
//! 1. **Zero external dependencies beyond serde** - keeps build times minimal
//! 2. **Total functions** - malformed upstream payloads degrade to fallbacks, never to errors
//! 3. **Unidirectional dependency** - this crate depends on nothing else in the workspace

pub mod events;
pub mod model;
pub mod normalize;
pub mod state;
pub mod text;

// ── View Model ─────────────────────────────────────────────────────────
pub use model::{
    unique_id, ActionItem, AgentFinding, AgentInsights, AnalysisResult, ApprovalItem, ChatMessage,
    MessageRole, Notification, ToastKind, ToastMessage, WorkflowLogEntry,
};

// ── Wire Events ────────────────────────────────────────────────────────
pub use events::ChatStreamEvent;

// ── Normalization ──────────────────────────────────────────────────────
pub use normalize::{
    build_analysis_result, ensure_array, ensure_string_array, map_action_record,
    map_approval_record, merge_action_lists, merge_approval_lists, parse_payload,
};

// ── Session State ──────────────────────────────────────────────────────
pub use state::{
    ApprovalDecision, BusyTracker, SessionState, DEFAULT_PROGRESS, ROUTING_PROGRESS,
    WELCOME_MESSAGE,
};
