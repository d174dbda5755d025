//! One-shot result handle for queued commands.

use tokio::sync::oneshot;

use crate::command::CommandResult;
use crate::error::CommandError;

/// Handle to the eventual result of a queued command.
///
/// Resolved exactly once by the execution pipeline. `value` awaits the first
/// resolution and memoizes it; later calls return the cached result without
/// blocking again.
#[derive(Debug)]
pub struct CommandFuture<T> {
    rx: Option<oneshot::Receiver<CommandResult<T>>>,
    resolved: Option<CommandResult<T>>,
}

impl<T> CommandFuture<T> {
    pub(crate) fn new(rx: oneshot::Receiver<CommandResult<T>>) -> Self {
        Self {
            rx: Some(rx),
            resolved: None,
        }
    }

    /// Whether the result has already been observed through `value`.
    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }
}

impl<T: Clone> CommandFuture<T> {
    /// Wait for the command to finish and return its final result.
    ///
    /// If the pipeline task was torn down before resolving (a panicked work
    /// or fallback function), this surfaces a run error rather than hanging
    /// or panicking the caller.
    pub async fn value(&mut self) -> CommandResult<T> {
        if let Some(rx) = self.rx.take() {
            let result = rx
                .await
                .unwrap_or_else(|_| Err(CommandError::run("command task dropped before delivering a result")));
            self.resolved = Some(result);
        }
        self.resolved
            .clone()
            .unwrap_or_else(|| Err(CommandError::run("command task dropped before delivering a result")))
    }
}
