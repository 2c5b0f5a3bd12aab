use serde::{Deserialize, Serialize};

fn default_max_queue_size() -> usize {
    50
}
fn default_max_branch_size() -> usize {
    10
}
fn default_max_local_seq() -> usize {
    5
}

/// Tunables for [`crate::RoutingQueue`] (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Total pending items allowed across all branches before new
    /// enqueues are rejected with `queue_overflow`.
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,
    /// Pending items allowed per parent message before further items for
    /// that branch are demoted to `P3_EXTEND`.
    #[serde(default = "default_max_branch_size")]
    pub max_branch_size: usize,
    /// Consecutive local-set picks allowed before `selectNext` is forced
    /// to consider the global set, preventing one thread from starving
    /// the rest of the conversation.
    #[serde(default = "default_max_local_seq")]
    pub max_local_seq: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig {
            max_queue_size: default_max_queue_size(),
            max_branch_size: default_max_branch_size(),
            max_local_seq: default_max_local_seq(),
        }
    }
}
