//! Run diagnostic dump: writes the raw orchestration response and the
//! reconciled stage outputs of each run to disk.
//!
//! Disabled unless `DISCHARGE_AGENT_DUMP_DIR` is set.
//!
//! ```text
//! {dump_dir}/{session_id}/
//!   01-response-<millis>.json
//!   02-reconciled-<millis>.json
//! ```

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config;
use crate::reconcile::ReconciledOutputSet;

// ──────────────────────────────────────────────
// Dump directory resolution
// ──────────────────────────────────────────────

/// Dump directory for a session, or `None` if diagnostics are disabled.
pub fn dump_dir_for(session_id: &str) -> Option<PathBuf> {
    dump_dir_in(&config::dump_dir()?, session_id)
}

/// Creates `<base>/<session_id>`. Returns `None` (with a warning) if the
/// directory cannot be created; never blocks the flow.
pub fn dump_dir_in(base: &Path, session_id: &str) -> Option<PathBuf> {
    let dir = base.join(session_id);

    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!(
            path = %dir.display(),
            error = %e,
            "Diagnostic dump: failed to create directory"
        );
        return None;
    }

    Some(dir)
}

// ──────────────────────────────────────────────
// Dump writers
// ──────────────────────────────────────────────

/// Write one run's response and reconciled outputs into `dir`.
///
/// File names carry a millisecond stamp so repeated runs in one session
/// do not overwrite each other.
pub fn dump_run(dir: &Path, response: &Value, outputs: &ReconciledOutputSet) {
    let stamp = chrono::Utc::now().timestamp_millis();
    dump_json(dir, &format!("01-response-{stamp}.json"), response);
    dump_json(dir, &format!("02-reconciled-{stamp}.json"), &outputs.to_json());
}

/// Write a JSON artifact, pretty-printed. Never panics.
pub fn dump_json<T: serde::Serialize>(dir: &Path, filename: &str, value: &T) {
    let path = dir.join(filename);
    match serde_json::to_string_pretty(value) {
        Ok(json) => match std::fs::write(&path, json.as_bytes()) {
            Ok(()) => tracing::debug!(
                path = %path.display(),
                size = json.len(),
                "Diagnostic dump: JSON written"
            ),
            Err(e) => tracing::warn!(
                path = %path.display(),
                error = %e,
                "Diagnostic dump: failed to write JSON"
            ),
        },
        Err(e) => tracing::warn!(
            path = %path.display(),
            error = %e,
            "Diagnostic dump: failed to serialize JSON"
        ),
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
