use thiserror::Error;

/// Error taxonomy for the execution adapter (§7). `AgentExitError`,
/// `AgentTimeout`, and `AgentCancelled` are constructed only when the turn
/// ends before any stdout line was ever observed from the child (spawn
/// succeeded but the process produced nothing before exiting, timing out,
/// or being cancelled). Once at least one line has streamed, the same
/// conditions resolve as an ordinary `TurnResult` carrying the matching
/// `FinishReason`, per §4.5.1.6 — a turn that made progress is a
/// completion, not a failure.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("failed to spawn agent process: {0}")]
    AgentSpawnError(#[source] std::io::Error),
    #[error("agent process exited with status {code:?} before completing a turn")]
    AgentExitError { code: Option<i32> },
    #[error("agent turn timed out")]
    AgentTimeout,
    #[error("agent turn cancelled")]
    AgentCancelled,
    #[error("failed to decode agent stdout: {0}")]
    DecodeError(String),
}
