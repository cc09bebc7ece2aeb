//! HTTP Client Factory
//!
//! One place to build the shared `reqwest::Client`. Per-request timeouts
//! are applied by the callers (the streaming call and the mutations have
//! different budgets), so the client itself only bounds connection
//! establishment.

use std::time::Duration;

/// Build the `reqwest::Client` used for every chat service request.
pub fn build_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .expect("failed to build reqwest client")
}
