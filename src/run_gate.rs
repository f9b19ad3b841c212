//! Run gate: at most one discharge flow run (or reset) at a time.
//!
//! A second submission while a run is active is rejected, not queued.
//! The gate also exposes what holds it (label and start time).

use std::sync::{Mutex, MutexGuard, TryLockError};

use serde::Serialize;

/// Snapshot of the operation currently holding the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveRun {
    /// Record id for a flow run, `reset` for a reset.
    pub label: String,
    /// When the run started (ISO 8601).
    pub started_at: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RunGateError {
    #[error("A discharge flow run is already in progress")]
    Busy,

    #[error("Internal lock error")]
    LockPoisoned,
}

#[derive(Default)]
pub struct RunGate {
    lock: Mutex<()>,
    current: Mutex<Option<ActiveRun>>,
}

impl RunGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the gate without blocking. Fails with `Busy` while another
    /// guard is alive.
    pub fn try_acquire(&self, label: &str) -> Result<RunGuard<'_>, RunGateError> {
        let guard = match self.lock.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(RunGateError::Busy),
            Err(TryLockError::Poisoned(_)) => return Err(RunGateError::LockPoisoned),
        };
        self.set_current(label);
        Ok(RunGuard {
            _guard: guard,
            gate: self,
        })
    }

    /// Returns `None` when idle.
    pub fn current_run(&self) -> Option<ActiveRun> {
        self.current.lock().ok()?.clone()
    }

    fn set_current(&self, label: &str) {
        if let Ok(mut current) = self.current.lock() {
            *current = Some(ActiveRun {
                label: label.to_string(),
                started_at: chrono::Utc::now().to_rfc3339(),
            });
        }
    }

    fn clear_current(&self) {
        if let Ok(mut current) = self.current.lock() {
            *current = None;
        }
    }
}

/// RAII token for the active run. Dropping it reopens the gate.
pub struct RunGuard<'a> {
    _guard: MutexGuard<'a, ()>,
    gate: &'a RunGate,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.gate.clear_current();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_gate_is_idle() {
        let gate = RunGate::new();
        assert!(gate.current_run().is_none());
    }

    #[test]
    fn acquire_records_active_run() {
        let gate = RunGate::new();
        let guard = gate.try_acquire("msg-001").unwrap();

        let run = gate.current_run().unwrap();
        assert_eq!(run.label, "msg-001");
        assert!(!run.started_at.is_empty());

        drop(guard);
        assert!(gate.current_run().is_none());
        assert!(gate.try_acquire("msg-002").is_ok());
    }

    #[test]
    fn second_acquire_is_rejected_while_busy() {
        let gate = RunGate::new();
        let _guard = gate.try_acquire("msg-001").unwrap();
        assert_eq!(gate.try_acquire("msg-002").err(), Some(RunGateError::Busy));
        // The first run is still the one reported.
        assert_eq!(gate.current_run().unwrap().label, "msg-001");
    }

    #[test]
    fn rejected_across_threads() {
        use std::sync::Arc;
        use std::thread;

        let gate = Arc::new(RunGate::new());
        let _guard = gate.try_acquire("first").unwrap();

        let gate2 = Arc::clone(&gate);
        let result = thread::spawn(move || gate2.try_acquire("second").err())
            .join()
            .unwrap();
        assert_eq!(result, Some(RunGateError::Busy));
    }

    #[test]
    fn active_run_serializes() {
        let run = ActiveRun {
            label: "msg-001".into(),
            started_at: "2026-02-22T10:00:00Z".into(),
        };
        let json = serde_json::to_string(&run).unwrap();
        assert!(json.contains("msg-001"));
        assert!(json.contains("2026-02-22T10:00:00Z"));
    }
}
