use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "Discharge Agent";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Langflow instance serving the discharge flow.
pub const DEFAULT_BASE_URL: &str = "http://localhost:7860";

/// Flow identifier of the six-agent discharge pipeline.
pub const DEFAULT_FLOW_ID: &str = "66536226-403a-47fd-b1cb-2c7b6cba2ebb";

/// Cosmetic pacing between stage reveals: base delay plus up to `PACING_JITTER_MS`.
pub const PACING_BASE_MS: u64 = 800;
pub const PACING_JITTER_MS: u64 = 1200;

const ENV_BASE_URL: &str = "DISCHARGE_AGENT_BASE_URL";
const ENV_FLOW_ID: &str = "DISCHARGE_AGENT_FLOW_ID";
const ENV_TIMEOUT_SECS: &str = "DISCHARGE_AGENT_TIMEOUT_SECS";
const ENV_EXPORT_DIR: &str = "DISCHARGE_AGENT_EXPORT_DIR";
const ENV_DUMP_DIR: &str = "DISCHARGE_AGENT_DUMP_DIR";

/// Default `tracing` filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "discharge_agent_lib=info,discharge_agent=info,warn"
}

/// Base URL of the orchestration service (`DISCHARGE_AGENT_BASE_URL` overrides).
pub fn base_url() -> String {
    non_empty_env(ENV_BASE_URL).unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}

/// Flow identifier (`DISCHARGE_AGENT_FLOW_ID` overrides).
pub fn flow_id() -> String {
    non_empty_env(ENV_FLOW_ID).unwrap_or_else(|| DEFAULT_FLOW_ID.to_string())
}

/// Optional request timeout. Unset means the call may block indefinitely.
pub fn request_timeout() -> Option<Duration> {
    non_empty_env(ENV_TIMEOUT_SECS)
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

/// Directory for JSON/PDF exports.
/// `DISCHARGE_AGENT_EXPORT_DIR`, else ~/DischargeAgent/exports, else ./exports.
pub fn exports_dir() -> PathBuf {
    if let Some(dir) = non_empty_env(ENV_EXPORT_DIR) {
        return PathBuf::from(dir);
    }
    match dirs::home_dir() {
        Some(home) => home.join("DischargeAgent").join("exports"),
        None => PathBuf::from("exports"),
    }
}

/// Diagnostic dump directory. Dumps are disabled unless
/// `DISCHARGE_AGENT_DUMP_DIR` is set.
pub fn dump_dir() -> Option<PathBuf> {
    non_empty_env(ENV_DUMP_DIR).map(PathBuf::from)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
