//! Progress presenter: drives one discharge flow run and reveals the six
//! stages in order.
//!
//! The remote flow returns all stage outputs in one response, so the
//! per-stage progression is replayed locally after reconciliation.

pub mod pacing;
pub mod presenter;

pub use pacing::*;
pub use presenter::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core_state::CoreError;
use crate::intake::IntakeError;
use crate::models::PipelineStage;
use crate::orchestration::OrchestrationError;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error(transparent)]
    Intake(#[from] IntakeError),

    #[error(transparent)]
    Orchestration(#[from] OrchestrationError),

    #[error("A discharge flow run is already in progress")]
    RunInProgress,

    #[error("Internal lock error")]
    LockPoisoned,

    #[error("Stage index out of range: {0}")]
    StageOutOfRange(usize),
}

impl From<CoreError> for FlowError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::RunInProgress => Self::RunInProgress,
            CoreError::LockPoisoned => Self::LockPoisoned,
            CoreError::StageOutOfRange(index) => Self::StageOutOfRange(index),
        }
    }
}

/// Event emitted on every run transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FlowEvent {
    Started {
        session_id: String,
        record_id: String,
    },
    StageUpdated {
        index: usize,
        stage: PipelineStage,
    },
    Completed {
        matched: usize,
        duration_ms: u64,
    },
    Failed {
        stage: PipelineStage,
        error: String,
    },
}
