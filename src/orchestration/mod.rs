//! Client for the remote multi-agent orchestration service (a Langflow flow).
//!
//! One submission is one POST; the reply is handed back untouched as a JSON
//! value for the reconciler. No retries, no backoff.

pub mod client;
pub mod session;

pub use client::*;
pub use session::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrchestrationError {
    #[error("Orchestration service is not reachable at {0}")]
    Connection(String),

    #[error("Orchestration service returned error (status {status}): {body}")]
    Service { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Request serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
