use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

/// Correlation token grouping the requests of one UI session.
///
/// Opaque to the client and carries no security meaning. Owned by
/// `CoreState` and passed into every submission; `regenerate` is called on
/// explicit reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionContext {
    id: String,
}

impl SessionContext {
    pub fn new() -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self {
            id: format!("discharge_{}_{}", Utc::now().timestamp_millis(), &suffix[..8]),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Replace the token. The new token always differs from the old one.
    pub fn regenerate(&mut self) {
        let previous = std::mem::take(&mut self.id);
        loop {
            let next = Self::new();
            if next.id != previous {
                self.id = next.id;
                break;
            }
        }
        tracing::debug!(session_id = %self.id, "Session token regenerated");
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}
