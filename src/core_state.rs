//! Top-level application state shared by the presenter and the front end.
//!
//! `CoreState` owns the stage list, the session correlation token and the
//! run gate. Stage mutation goes through `apply_update` and the run
//! lifecycle methods only.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::Value;

use crate::models::{PipelineStage, RunState, StageId, StageStatus, STAGE_COUNT};
use crate::orchestration::SessionContext;
use crate::reconcile::ReconciledOutputSet;
use crate::run_gate::{RunGate, RunGateError};

/// Error text shown on the stage that was active when a run failed.
pub const STAGE_FAILURE_MESSAGE: &str = "Failed to execute";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,

    #[error("A discharge flow run is already in progress")]
    RunInProgress,

    #[error("Stage index out of range: {0}")]
    StageOutOfRange(usize),
}

impl From<RunGateError> for CoreError {
    fn from(err: RunGateError) -> Self {
        match err {
            RunGateError::Busy => Self::RunInProgress,
            RunGateError::LockPoisoned => Self::LockPoisoned,
        }
    }
}

/// What the front end renders: global run state plus the six stages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowState {
    pub run_state: RunState,
    pub current_step: usize,
    pub steps: Vec<PipelineStage>,
    /// Raw aggregate response of the last completed run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_output: Option<Value>,
    #[serde(skip)]
    pub outputs: Option<ReconciledOutputSet>,
}

impl FlowState {
    pub fn new() -> Self {
        Self {
            run_state: RunState::Idle,
            current_step: 0,
            steps: PipelineStage::initial_set(),
            final_output: None,
            outputs: None,
        }
    }

    pub fn stage(&self, id: StageId) -> &PipelineStage {
        &self.steps[id.index()]
    }

    pub fn is_running(&self) -> bool {
        self.run_state == RunState::Running
    }

    pub fn completed_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StageStatus::Completed)
            .count()
    }

    /// "3 of 6 agents completed"
    pub fn progress_label(&self) -> String {
        format!("{} of {} agents completed", self.completed_count(), STAGE_COUNT)
    }

    /// True once any stage has left `pending` (results or errors to show).
    pub fn has_activity(&self) -> bool {
        self.steps.iter().any(|s| s.status != StageStatus::Pending)
    }
}

impl Default for FlowState {
    fn default() -> Self {
        Self::new()
    }
}

pub struct CoreState {
    flow: Mutex<FlowState>,
    session: Mutex<SessionContext>,
    gate: RunGate,
}

impl CoreState {
    pub fn new() -> Self {
        Self {
            flow: Mutex::new(FlowState::new()),
            session: Mutex::new(SessionContext::new()),
            gate: RunGate::new(),
        }
    }

    pub fn gate(&self) -> &RunGate {
        &self.gate
    }

    /// Owned copy of the current flow state.
    pub fn snapshot(&self) -> Result<FlowState, CoreError> {
        Ok(self.lock_flow()?.clone())
    }

    /// Owned copy of the session context for the next submission.
    pub fn session(&self) -> Result<SessionContext, CoreError> {
        self.session
            .lock()
            .map(|s| s.clone())
            .map_err(|_| CoreError::LockPoisoned)
    }

    // ── Run lifecycle ───────────────────────────────────────

    /// All stages pending, output cleared, run marked running.
    pub fn begin_run(&self) -> Result<(), CoreError> {
        let mut flow = self.lock_flow()?;
        *flow = FlowState {
            run_state: RunState::Running,
            ..FlowState::new()
        };
        Ok(())
    }

    /// The presenter's update contract: set one stage's status and output.
    ///
    /// The stage's previous output is replaced (a `running` update clears it).
    pub fn apply_update(
        &self,
        index: usize,
        status: StageStatus,
        output: Option<Value>,
    ) -> Result<PipelineStage, CoreError> {
        let mut flow = self.lock_flow()?;
        flow.current_step = index;
        let stage = flow
            .steps
            .get_mut(index)
            .ok_or(CoreError::StageOutOfRange(index))?;
        stage.status = status;
        stage.output = output;
        stage.error = None;
        Ok(stage.clone())
    }

    /// Mark the active stage as failed and return the run to idle.
    ///
    /// Also recovers a poisoned flow lock: the state it leaves behind is
    /// consistent again.
    pub fn fail_run(&self) -> Result<PipelineStage, CoreError> {
        let mut flow = self.flow.lock().unwrap_or_else(PoisonError::into_inner);
        self.flow.clear_poison();
        flow.run_state = RunState::Idle;
        let index = flow.current_step;
        let stage = flow
            .steps
            .get_mut(index)
            .ok_or(CoreError::StageOutOfRange(index))?;
        stage.status = StageStatus::Error;
        stage.error = Some(STAGE_FAILURE_MESSAGE.to_string());
        Ok(stage.clone())
    }

    pub fn complete_run(
        &self,
        final_output: Value,
        outputs: ReconciledOutputSet,
    ) -> Result<(), CoreError> {
        let mut flow = self.lock_flow()?;
        flow.run_state = RunState::Completed;
        flow.final_output = Some(final_output);
        flow.outputs = Some(outputs);
        Ok(())
    }

    /// Back to all-pending with a fresh session token.
    /// Rejected while a run holds the gate; holds the gate itself while it
    /// rewrites the state.
    pub fn reset(&self) -> Result<(), CoreError> {
        let _guard = self.gate.try_acquire("reset").map_err(|e| {
            if let Some(active) = self.gate.current_run() {
                tracing::warn!(active = %active.label, "Reset rejected while the gate is held");
            }
            CoreError::from(e)
        })?;
        *self.lock_flow()? = FlowState::new();
        let mut session = self.session.lock().map_err(|_| CoreError::LockPoisoned)?;
        session.regenerate();
        tracing::info!(session_id = session.id(), "Flow reset");
        Ok(())
    }

    fn lock_flow(&self) -> Result<MutexGuard<'_, FlowState>, CoreError> {
        self.flow.lock().map_err(|_| CoreError::LockPoisoned)
    }

    /// Poison the flow lock by panicking while holding it.
    #[cfg(test)]
    pub(crate) fn poison_flow(&self) {
        std::thread::scope(|s| {
            let _ = s
                .spawn(|| {
                    let _flow = self.flow.lock();
                    panic!("flow lock poisoned on purpose");
                })
                .join();
        });
    }
}

impl Default for CoreState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_state_is_idle_and_pending() {
        let state = CoreState::new();
        let flow = state.snapshot().unwrap();
        assert_eq!(flow.run_state, RunState::Idle);
        assert!(!flow.has_activity());
        assert_eq!(flow.progress_label(), "0 of 6 agents completed");
    }

    #[test]
    fn begin_run_resets_previous_outputs() {
        let state = CoreState::new();
        state
            .apply_update(2, StageStatus::Completed, Some(json!({"x": 1})))
            .unwrap();
        state.begin_run().unwrap();

        let flow = state.snapshot().unwrap();
        assert!(flow.is_running());
        assert!(flow.steps.iter().all(|s| s.status == StageStatus::Pending));
        assert!(flow.steps.iter().all(|s| s.output.is_none()));
    }

    #[test]
    fn apply_update_tracks_current_step() {
        let state = CoreState::new();
        let stage = state
            .apply_update(3, StageStatus::Running, None)
            .unwrap();
        assert_eq!(stage.id, StageId::Multilingual);
        assert_eq!(state.snapshot().unwrap().current_step, 3);
    }

    #[test]
    fn apply_update_rejects_bad_index() {
        let state = CoreState::new();
        assert_eq!(
            state.apply_update(6, StageStatus::Running, None).unwrap_err(),
            CoreError::StageOutOfRange(6)
        );
    }

    #[test]
    fn fail_run_marks_active_stage() {
        let state = CoreState::new();
        state.begin_run().unwrap();
        state.apply_update(0, StageStatus::Running, None).unwrap();
        let failed = state.fail_run().unwrap();

        assert_eq!(failed.status, StageStatus::Error);
        assert_eq!(failed.error.as_deref(), Some(STAGE_FAILURE_MESSAGE));
        let flow = state.snapshot().unwrap();
        assert_eq!(flow.run_state, RunState::Idle);
        assert!(flow.has_activity());
    }

    #[test]
    fn reset_regenerates_session_and_clears_state() {
        let state = CoreState::new();
        let before = state.session().unwrap();
        state
            .apply_update(0, StageStatus::Completed, Some(json!({"summary_english": "x"})))
            .unwrap();
        state.reset().unwrap();

        assert_ne!(state.session().unwrap(), before);
        assert_eq!(state.snapshot().unwrap(), FlowState::new());
    }

    #[test]
    fn reset_rejected_while_run_active() {
        let state = CoreState::new();
        let before = state.session().unwrap();
        let guard = state.gate().try_acquire("msg-001").unwrap();
        state.begin_run().unwrap();
        state.apply_update(0, StageStatus::Running, None).unwrap();

        assert_eq!(state.reset().unwrap_err(), CoreError::RunInProgress);
        let flow = state.snapshot().unwrap();
        assert!(flow.is_running());
        assert_eq!(flow.stage(StageId::Summary).status, StageStatus::Running);
        assert_eq!(state.session().unwrap(), before);

        drop(guard);
        state.reset().unwrap();
        assert!(state.gate().current_run().is_none());
    }

    #[test]
    fn run_cannot_start_while_reset_holds_gate() {
        let state = CoreState::new();
        let _guard = state.gate().try_acquire("reset").unwrap();
        assert_eq!(
            state.gate().try_acquire("msg-001").err(),
            Some(RunGateError::Busy)
        );
    }

    #[test]
    fn fail_run_recovers_poisoned_lock() {
        let state = CoreState::new();
        state.begin_run().unwrap();
        state.apply_update(2, StageStatus::Running, None).unwrap();
        state.poison_flow();
        assert_eq!(state.snapshot().unwrap_err(), CoreError::LockPoisoned);

        let failed = state.fail_run().unwrap();
        assert_eq!(failed.id, StageId::FollowUp);
        assert_eq!(failed.status, StageStatus::Error);
        assert_eq!(state.snapshot().unwrap().run_state, RunState::Idle);
    }

    #[test]
    fn gate_errors_convert() {
        assert_eq!(CoreError::from(RunGateError::Busy), CoreError::RunInProgress);
        assert_eq!(
            CoreError::from(RunGateError::LockPoisoned),
            CoreError::LockPoisoned
        );
    }
}
