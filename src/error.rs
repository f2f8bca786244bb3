use crate::hooks::HookKind;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Failure type returned by steps and hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A step failure as handed to error hooks and kept as the `source` of
/// [`PipelineError::StepExecution`].
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Where inside a step's execution a failure was raised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Before,
    Loading,
    Step,
    After,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Before => "before hook",
            Stage::Loading => "loading hook",
            Stage::Step => "step",
            Stage::After => "after hook",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Step {index} ('{name}') is not registered as a callable")]
    InvalidStep { index: usize, name: String },

    #[error("No {kind} hook named '{name}' is available")]
    InvalidHook { kind: HookKind, name: String },

    #[error("Step {index} of {total} ('{step}') failed in {stage}: {source}")]
    StepExecution {
        index: usize,
        total: usize,
        step: String,
        stage: Stage,
        #[source]
        source: SharedError,
    },

    #[error("Pipeline suspended while being driven synchronously")]
    PendingResult,

    #[error("Step '{step}' returned a pending result inside a synchronous pipeline")]
    UnexpectedAsyncResult { step: String },
}

impl PipelineError {
    /// The original failure of an unrecovered step, for downcasting.
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            PipelineError::StepExecution { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }

    /// Index of the step the error is attributed to, if any
    pub fn step_index(&self) -> Option<usize> {
        match self {
            PipelineError::InvalidStep { index, .. }
            | PipelineError::StepExecution { index, .. } => Some(*index),
            _ => None,
        }
    }
}
