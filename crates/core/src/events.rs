//! Wire Stream Events
//!
//! The event kinds carried inside the chat service's SSE frames. The
//! event kind lives in the JSON body's `type` field rather than an SSE
//! `event:` line, so one tagged enum covers the whole wire contract.
//! Kinds this client does not recognize deserialize to [`ChatStreamEvent::Unknown`]
//! and are ignored rather than treated as errors.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One event parsed from a `data: ` frame of the chat stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatStreamEvent {
    /// Transient progress text while agents are working.
    Status {
        #[serde(default)]
        message: Option<String>,
    },

    /// An individual agent has been dispatched.
    AgentStart {
        #[serde(default)]
        message: Option<String>,
    },

    /// An individual agent has reported back.
    AgentResult {
        #[serde(default)]
        message: Option<String>,
    },

    /// An intermediate synthesis note from the orchestrator.
    Analysis {
        #[serde(default)]
        message: Option<String>,
    },

    /// Normal processing of the query is finished. The stream may still
    /// carry trailing frames after this.
    Complete {
        #[serde(default)]
        message: Option<String>,
    },

    /// The fused multi-agent result. `response` is either a JSON object
    /// or a JSON-encoded string of one; the normalizer resolves the two
    /// representations at the boundary.
    FinalResponse {
        #[serde(default)]
        response: Value,
    },

    /// Upstream failure; ends the query without retry.
    Error {
        #[serde(default)]
        error: Option<String>,
    },

    #[serde(other)]
    Unknown,
}

impl ChatStreamEvent {
    /// Emoji prefix for the transcript entry this event produces, for
    /// the kinds that produce one.
    pub fn transcript_prefix(&self) -> Option<&'static str> {
        match self {
            ChatStreamEvent::Analysis { .. } => Some("🧭"),
            ChatStreamEvent::AgentStart { .. } => Some("🔍"),
            ChatStreamEvent::AgentResult { .. } => Some("✅"),
            _ => None,
        }
    }
}
