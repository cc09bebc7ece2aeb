//! SupplySense Chat
//!
//! Session layer for the SupplySense multi-agent supply-chain analysis
//! service. [`ChatSession`] wires the streaming client and the session
//! state machine into the flows a UI binds to: submit a query, watch the
//! transcript and progress update as agent events stream in, render the
//! final analysis, and act on the recommended workflow items.
//!
//! The heavy lifting lives in the workspace crates:
//! `supplysense-core` (view model, normalization, state transitions) and
//! `supplysense-client` (SSE framing, retry/timeout, REST calls).

pub mod session;

pub use session::{ChatSession, TOAST_TTL};

// Re-export the types a UI needs to drive a session
pub use supplysense_client::{ChatClientError, ChatResult, ClientConfig, RetryPolicy};
pub use supplysense_core::{
    ActionItem, AgentFinding, AnalysisResult, ApprovalDecision, ApprovalItem, ChatMessage,
    MessageRole, SessionState, ToastKind, ToastMessage,
};
