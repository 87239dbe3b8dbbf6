// Domain errors for the tracker

use crate::models::TaskId;
use thiserror::Error;

/// Errors raised by tracker operations
///
/// These travel inside `eyre::Report`; use `downcast_ref::<TrackerError>()` to match on them.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackerError {
    /// Required form field missing or unparseable
    #[error("{0}")]
    Validation(String),

    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    /// Original index outside the backing list
    #[error("Task index {index} out of range (list has {len} tasks)")]
    IndexOutOfRange { index: usize, len: usize },

    /// No task id starts with the given reference
    #[error("No task matches '{0}'")]
    UnknownReference(String),

    /// An id prefix matched more than one task
    #[error("Task reference '{0}' is ambiguous")]
    AmbiguousTask(String),

    #[error("Invalid {kind} mode: {value}")]
    InvalidMode { kind: &'static str, value: String },
}
