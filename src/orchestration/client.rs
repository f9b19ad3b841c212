use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use super::session::SessionContext;
use super::OrchestrationError;
use crate::config;
use crate::models::DischargeRecord;

/// Orchestration service abstraction (allows mocking).
pub trait OrchestrationClient {
    /// Submit one discharge record and return the aggregate response document.
    fn submit(
        &self,
        record: &DischargeRecord,
        session: &SessionContext,
    ) -> Result<Value, OrchestrationError>;
}

/// Request body for Langflow `/api/v1/run/{flow_id}`.
#[derive(Serialize)]
struct RunFlowRequest<'a> {
    input_value: String,
    output_type: &'a str,
    input_type: &'a str,
    session_id: &'a str,
}

/// Blocking HTTP client for a Langflow flow run endpoint.
pub struct LangflowClient {
    base_url: String,
    flow_id: String,
    client: reqwest::blocking::Client,
    timeout: Option<Duration>,
}

impl LangflowClient {
    /// Create a client for `base_url` + `flow_id`.
    ///
    /// With `timeout: None` a hung service blocks the caller indefinitely.
    pub fn new(
        base_url: &str,
        flow_id: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, OrchestrationError> {
        // reqwest's blocking client defaults to 30s; `None` lifts the limit.
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OrchestrationError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            flow_id: flow_id.trim().to_string(),
            client,
            timeout,
        })
    }

    /// Client configured from `DISCHARGE_AGENT_*` environment variables.
    pub fn from_env() -> Result<Self, OrchestrationError> {
        Self::new(&config::base_url(), &config::flow_id(), config::request_timeout())
    }

    pub fn run_url(&self) -> String {
        format!("{}/api/v1/run/{}", self.base_url, self.flow_id)
    }
}

impl OrchestrationClient for LangflowClient {
    fn submit(
        &self,
        record: &DischargeRecord,
        session: &SessionContext,
    ) -> Result<Value, OrchestrationError> {
        let url = self.run_url();
        let body = RunFlowRequest {
            input_value: serde_json::to_string(record)?,
            output_type: "chat",
            input_type: "chat",
            session_id: session.id(),
        };

        tracing::info!(
            url = %url,
            session_id = session.id(),
            record_id = %record.id,
            "Submitting discharge record"
        );

        let response = self.client.post(&url).json(&body).send().map_err(|e| {
            if e.is_connect() {
                OrchestrationError::Connection(self.base_url.clone())
            } else if e.is_timeout() {
                let secs = self.timeout.map(|t| t.as_secs()).unwrap_or_default();
                OrchestrationError::HttpClient(format!("Request timed out after {secs}s"))
            } else {
                OrchestrationError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(OrchestrationError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: Value = response
            .json()
            .map_err(|e| OrchestrationError::ResponseParsing(e.to_string()))?;

        tracing::trace!(response = %parsed, "Full orchestration response");
        Ok(parsed)
    }
}

/// Mock orchestration client for testing. Returns a configured response
/// (or failure) and remembers what it was sent.
pub struct MockOrchestrationClient {
    outcome: MockOutcome,
    submissions: Mutex<Vec<(DischargeRecord, String)>>,
}

enum MockOutcome {
    Respond(Value),
    Fail { status: u16, body: String },
}

impl MockOrchestrationClient {
    pub fn new(response: Value) -> Self {
        Self {
            outcome: MockOutcome::Respond(response),
            submissions: Mutex::new(Vec::new()),
        }
    }

    /// Every submission fails as if the service answered with `status`.
    pub fn failing(status: u16, body: &str) -> Self {
        Self {
            outcome: MockOutcome::Fail {
                status,
                body: body.to_string(),
            },
            submissions: Mutex::new(Vec::new()),
        }
    }

    /// Session ids seen so far, in submission order.
    pub fn session_ids(&self) -> Vec<String> {
        self.submissions
            .lock()
            .map(|subs| subs.iter().map(|(_, s)| s.clone()).collect())
            .unwrap_or_default()
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.lock().map(|subs| subs.len()).unwrap_or_default()
    }
}

impl OrchestrationClient for MockOrchestrationClient {
    fn submit(
        &self,
        record: &DischargeRecord,
        session: &SessionContext,
    ) -> Result<Value, OrchestrationError> {
        if let Ok(mut subs) = self.submissions.lock() {
            subs.push((record.clone(), session.id().to_string()));
        }
        match &self.outcome {
            MockOutcome::Respond(value) => Ok(value.clone()),
            MockOutcome::Fail { status, body } => Err(OrchestrationError::Service {
                status: *status,
                body: body.clone(),
            }),
        }
    }
}
