use crate::bytes::truncate_to_bytes_reporting;

/// Maximum size of a team task, in bytes.
pub const MAX_TEAM_TASK_BYTES: usize = 5 * 1024;

/// Apply the team-task size cap. Oversized input is truncated on a
/// code-point-safe boundary; callers should log the returned `truncated`
/// flag at `warn` level (the cap itself is silent here — this crate has
/// no logging dependency, see `chatter-context` for the call site that
/// emits the warning).
pub fn cap_team_task(task: &str) -> (String, bool) {
    let (clipped, truncated) = truncate_to_bytes_reporting(task, MAX_TEAM_TASK_BYTES);
    (clipped.to_string(), truncated)
}
