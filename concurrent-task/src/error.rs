//! Error taxonomy for [`crate::Task`].

/// Errors returned by [`crate::Task::get`] and [`crate::Task::get_timeout`].
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TaskError<E> {
    /// The task was cancelled before it produced a result.
    #[error("task was cancelled")]
    Cancelled,

    /// The task's thread was interrupted via its [`crate::Scope`] while
    /// running.
    #[error("task was interrupted")]
    Interrupted,

    /// The [`crate::Executable`] ran and returned an error.
    #[error("task execution failed: {0}")]
    Execution(#[source] E),

    /// `get_timeout` elapsed before the task completed.
    #[error("timed out waiting for task")]
    Timeout,
}
