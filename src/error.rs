use thiserror::Error;

use chatter_context::ContextError;
use chatter_types::{SnapshotVersionError, TeamValidationError};

/// Error taxonomy for the coordinator (§7). Per-turn adapter failures
/// (`AgentSpawnError`, `AgentExitError`, `AgentTimeout`, `AgentCancelled`)
/// are deliberately not represented here — they surface as `Event`s and
/// never abort the session; only API misuse and the two constructor-time
/// failures below reach the caller as a hard `Err`.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error(transparent)]
    TeamValidation(#[from] TeamValidationError),
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotVersionError),
}
