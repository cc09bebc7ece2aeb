//! SupplySense Client
//!
//! Network layer for the SupplySense chat service:
//! - SSE frame reassembly and event parsing for the streaming chat call
//! - workflow mutations (complete action, decide approval) and queries
//! - bounded retry with linear backoff and client-side timeouts
//!
//! The crate turns wire responses into `supplysense-core` view-model
//! values; it holds no session state of its own.

pub mod api;
pub mod error;
pub mod http_client;
pub mod retry;
pub mod sse;
pub mod stream;
pub mod types;

// Re-export main types
pub use api::ChatApiClient;
pub use error::{ChatClientError, ChatResult};
pub use http_client::build_http_client;
pub use retry::{retry, with_timeout, RetryPolicy};
pub use sse::SseFrameDecoder;
pub use stream::EventStream;
pub use types::{ChatRequest, ClientConfig, CompleteActionRequest, DecideApprovalRequest};
