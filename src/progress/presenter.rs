use std::time::Instant;

use serde_json::Value;

use super::{FlowError, FlowEvent, Pacer};
use crate::core_state::{CoreError, CoreState};
use crate::diagnostic;
use crate::intake;
use crate::models::{DischargeRecord, StageStatus};
use crate::orchestration::OrchestrationClient;
use crate::reconcile::{reconcile, ReconciledOutputSet};

/// Result of one successful run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub session_id: String,
    /// Raw aggregate response, kept for export and debugging.
    pub response: Value,
    pub outputs: ReconciledOutputSet,
    pub duration_ms: u64,
}

/// Run the discharge flow for one record.
///
/// Validation failures return before any state changes. A second call while
/// a run is active is rejected with `RunInProgress`. If the submission or the
/// reveal fails, the active stage is marked `error`, the run returns to idle
/// and the error is returned.
pub fn run_flow(
    state: &CoreState,
    client: &dyn OrchestrationClient,
    pacer: &dyn Pacer,
    record: &DischargeRecord,
    progress_fn: Option<&dyn Fn(FlowEvent)>,
) -> Result<RunOutcome, FlowError> {
    intake::validate(record)?;

    let _guard = state
        .gate()
        .try_acquire(&record.id)
        .map_err(CoreError::from)?;
    let session = state.session()?;

    let emit = |event: FlowEvent| {
        if let Some(progress) = progress_fn {
            progress(event);
        }
    };

    let start = Instant::now();
    tracing::info!(
        session_id = session.id(),
        record_id = %record.id,
        "Starting discharge flow run"
    );

    state.begin_run()?;
    emit(FlowEvent::Started {
        session_id: session.id().to_string(),
        record_id: record.id.clone(),
    });
    let first = state.apply_update(0, StageStatus::Running, None)?;
    emit(FlowEvent::StageUpdated {
        index: 0,
        stage: first,
    });

    let response = match client.submit(record, &session) {
        Ok(response) => response,
        Err(e) => return Err(fail_flow(state, session.id(), e.into(), &emit)),
    };

    let outputs = reconcile(&response);
    if let Some(dir) = diagnostic::dump_dir_for(session.id()) {
        diagnostic::dump_run(&dir, &response, &outputs);
    }

    if let Err(e) = reveal_stages(state, pacer, &outputs, &emit)
        .and_then(|()| state.complete_run(response.clone(), outputs.clone()))
    {
        return Err(fail_flow(state, session.id(), e.into(), &emit));
    }

    let duration_ms = start.elapsed().as_millis() as u64;
    let matched = outputs.matched_count();
    tracing::info!(
        session_id = session.id(),
        matched,
        duration_ms,
        "Discharge flow run completed"
    );
    emit(FlowEvent::Completed {
        matched,
        duration_ms,
    });

    Ok(RunOutcome {
        session_id: session.id().to_string(),
        response,
        outputs,
        duration_ms,
    })
}

/// Replay the reconciled slots onto the stages, one at a time.
fn reveal_stages(
    state: &CoreState,
    pacer: &dyn Pacer,
    outputs: &ReconciledOutputSet,
    emit: &dyn Fn(FlowEvent),
) -> Result<(), CoreError> {
    for (stage_id, slot) in outputs.iter() {
        let index = stage_id.index();
        // Stage 0 has been running since submission.
        if index > 0 {
            let running = state.apply_update(index, StageStatus::Running, None)?;
            emit(FlowEvent::StageUpdated {
                index,
                stage: running,
            });
        }

        pacer.pause();

        let done = state.apply_update(index, StageStatus::Completed, Some(slot.to_value()))?;
        tracing::debug!(stage = stage_id.agent_name(), matched = slot.is_matched(), "Stage revealed");
        emit(FlowEvent::StageUpdated { index, stage: done });
    }
    Ok(())
}

/// Mark the active stage failed, report it, and hand the error back.
fn fail_flow(
    state: &CoreState,
    session_id: &str,
    err: FlowError,
    emit: &dyn Fn(FlowEvent),
) -> FlowError {
    tracing::error!(session_id, error = %err, "Discharge flow run failed");
    match state.fail_run() {
        Ok(stage) => emit(FlowEvent::Failed {
            stage,
            error: err.to_string(),
        }),
        Err(e) => tracing::warn!(error = %e, "Could not mark the failed stage"),
    }
    err
}
