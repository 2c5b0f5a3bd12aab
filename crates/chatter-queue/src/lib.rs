mod config;
mod queue;

pub use config::QueueConfig;
pub use queue::{
    EnqueueOutcome, EnqueueTarget, IntentCounts, QueueProtectionEvent, QueueProtectionKind,
    QueueStats, RoutingQueue, SkipReason, SkippedTarget,
};
