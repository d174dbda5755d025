use thiserror::Error;

/// Error type for protected command execution.
///
/// The first four variants are "triggering errors": any of them routes the
/// invocation to its fallback when one is configured. A `Fallback` error is
/// terminal and never re-routed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Admission blocked by an open circuit
    #[error("Circuit open for pool: {0}")]
    CircuitOpen(String),

    /// No execution ticket available in the bound pool
    #[error("Executor pool exhausted: {0}")]
    PoolExhausted(String),

    /// Work function exceeded the configured timeout
    #[error("Command timed out after {0}ms")]
    Timeout(u64),

    /// Work function reported failure; the message is surfaced verbatim
    #[error("{0}")]
    Run(String),

    /// Fallback function itself reported failure
    #[error("Fallback failed: {0}")]
    Fallback(String),
}

impl CommandError {
    /// Build a run error from any displayable message.
    pub fn run(msg: impl Into<String>) -> Self {
        CommandError::Run(msg.into())
    }

    /// Whether this error may route to a fallback (everything but `Fallback`).
    pub fn is_trigger(&self) -> bool {
        !matches!(self, CommandError::Fallback(_))
    }
}

impl From<String> for CommandError {
    fn from(msg: String) -> Self {
        CommandError::Run(msg)
    }
}

impl From<&str> for CommandError {
    fn from(msg: &str) -> Self {
        CommandError::Run(msg.to_string())
    }
}
