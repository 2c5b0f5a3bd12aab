use chatter_types::{Intent, RoutingItem};
use chrono::Utc;

use crate::config::QueueConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Duplicate,
    AdjacentDuplicate,
    QueueOverflow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedTarget {
    pub target_member_id: String,
    pub intent: Intent,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueProtectionKind {
    QueueOverflow,
    BranchOverflow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueProtectionEvent {
    pub kind: QueueProtectionKind,
    pub target_member_id: String,
    pub parent_message_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnqueueOutcome {
    pub enqueued: Vec<RoutingItem>,
    pub skipped: Vec<SkippedTarget>,
    pub protections: Vec<QueueProtectionEvent>,
}

impl EnqueueOutcome {
    /// Whether any item actually entered the queue — callers should emit
    /// `QueueUpdate` only when this is true (§4.4.1).
    pub fn changed(&self) -> bool {
        !self.enqueued.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntentCounts {
    pub p1: usize,
    pub p2: usize,
    pub p3: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueStats {
    pub total_pending: usize,
    pub by_intent: IntentCounts,
    pub local_queue_size: usize,
}

/// A single target to enqueue: the member to route to and the intent
/// requested for it (before any branch-overflow demotion).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnqueueTarget {
    pub target_member_id: String,
    pub intent: Intent,
}

/// Priority scheduler over routing items keyed by parent message (§4.4).
///
/// Single source of truth for next-speaker selection. All mutation and
/// selection happens through `&mut self`, observed in strict serial order
/// by the coordinator goroutine (§5) — there is no internal locking.
#[derive(Debug, Clone)]
pub struct RoutingQueue {
    config: QueueConfig,
    pending: Vec<RoutingItem>,
    last_completed_message_id: Option<String>,
    local_consecutive: usize,
    next_item_seq: u64,
}

impl RoutingQueue {
    pub fn new(config: QueueConfig) -> Self {
        RoutingQueue {
            config,
            pending: Vec::new(),
            last_completed_message_id: None,
            local_consecutive: 0,
            next_item_seq: 0,
        }
    }

    fn is_local(&self, item: &RoutingItem) -> bool {
        self.last_completed_message_id.as_deref() == Some(item.parent_message_id.as_str())
    }

    fn branch_size(&self, parent_message_id: &str) -> usize {
        self.pending
            .iter()
            .filter(|i| i.parent_message_id == parent_message_id)
            .count()
    }

    fn has_dedup(&self, parent_message_id: &str, target_member_id: &str, intent: Intent) -> bool {
        self.pending.iter().any(|i| {
            i.parent_message_id == parent_message_id
                && i.target_member_id == target_member_id
                && i.intent == intent
        })
    }

    /// Enqueue routing items for `targets`, all sharing `parent_message_id`
    /// (the message whose markers produced them) and `trigger_message_id`
    /// (the message that caused this enqueue call — usually the same id,
    /// but kept distinct for provenance). See §4.4.1 for the per-item
    /// skip/demote rules, applied in order.
    pub fn enqueue(
        &mut self,
        parent_message_id: &str,
        trigger_message_id: &str,
        targets: &[EnqueueTarget],
    ) -> EnqueueOutcome {
        let mut outcome = EnqueueOutcome::default();

        for target in targets {
            if self.has_dedup(parent_message_id, &target.target_member_id, target.intent) {
                outcome.skipped.push(SkippedTarget {
                    target_member_id: target.target_member_id.clone(),
                    intent: target.intent,
                    reason: SkipReason::Duplicate,
                });
                continue;
            }

            if let Some(tail) = self.pending.last() {
                if tail.target_member_id == target.target_member_id {
                    outcome.skipped.push(SkippedTarget {
                        target_member_id: target.target_member_id.clone(),
                        intent: target.intent,
                        reason: SkipReason::AdjacentDuplicate,
                    });
                    continue;
                }
            }

            if self.pending.len() + 1 > self.config.max_queue_size {
                outcome.skipped.push(SkippedTarget {
                    target_member_id: target.target_member_id.clone(),
                    intent: target.intent,
                    reason: SkipReason::QueueOverflow,
                });
                outcome.protections.push(QueueProtectionEvent {
                    kind: QueueProtectionKind::QueueOverflow,
                    target_member_id: target.target_member_id.clone(),
                    parent_message_id: parent_message_id.to_string(),
                });
                tracing::warn!(
                    target_member_id = %target.target_member_id,
                    parent_message_id,
                    "routing queue overflow, skipping enqueue"
                );
                continue;
            }

            let mut intent = target.intent;
            if self.branch_size(parent_message_id) + 1 > self.config.max_branch_size {
                intent = Intent::P3Extend;
                outcome.protections.push(QueueProtectionEvent {
                    kind: QueueProtectionKind::BranchOverflow,
                    target_member_id: target.target_member_id.clone(),
                    parent_message_id: parent_message_id.to_string(),
                });
                tracing::warn!(
                    target_member_id = %target.target_member_id,
                    parent_message_id,
                    "branch overflow, demoting to P3_EXTEND"
                );
            }

            let item = RoutingItem {
                id: format!("route-{}", self.next_item_seq),
                target_member_id: target.target_member_id.clone(),
                parent_message_id: parent_message_id.to_string(),
                trigger_message_id: trigger_message_id.to_string(),
                intent,
                enqueued_at: Utc::now(),
            };
            self.next_item_seq += 1;
            self.pending.push(item.clone());
            outcome.enqueued.push(item);
        }

        outcome
    }

    /// Select and remove the next item to dispatch, per the two-set
    /// scheduling discipline in §4.4.2.
    pub fn select_next(&mut self) -> Option<RoutingItem> {
        if self.pending.is_empty() {
            return None;
        }

        if let Some(pos) = self.pending.iter().position(|i| i.intent == Intent::P1Interrupt) {
            self.local_consecutive = 0;
            let item = self.pending.remove(pos);
            tracing::debug!(route_id = %item.id, "selectNext: P1 preemption");
            return Some(item);
        }

        if self.local_consecutive < self.config.max_local_seq {
            if let Some(pos) = self.pending.iter().position(|i| self.is_local(i)) {
                self.local_consecutive += 1;
                let item = self.pending.remove(pos);
                tracing::debug!(route_id = %item.id, "selectNext: local set");
                return Some(item);
            }
        }

        let global_pos = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, i)| !self.is_local(i))
            .min_by_key(|(idx, i)| (i.intent, *idx))
            .map(|(idx, _)| idx);

        let pos = match global_pos {
            Some(p) => p,
            None => self
                .pending
                .iter()
                .enumerate()
                .min_by_key(|(idx, i)| (i.intent, *idx))
                .map(|(idx, _)| idx)?,
        };
        self.local_consecutive = 0;
        let item = self.pending.remove(pos);
        tracing::debug!(route_id = %item.id, "selectNext: global set");
        Some(item)
    }

    /// Record that `message_id` has completed. Idempotent; does not clear
    /// pending items.
    pub fn mark_completed(&mut self, message_id: impl Into<String>) {
        self.last_completed_message_id = Some(message_id.into());
    }

    pub fn last_completed_message_id(&self) -> Option<&str> {
        self.last_completed_message_id.as_deref()
    }

    /// Empty pending items; preserves `lastCompletedMessageId`.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.local_consecutive = 0;
    }

    /// `[DROP: ALL]` — drop every pending item. Returns the number dropped.
    pub fn drop_all(&mut self) -> usize {
        let n = self.pending.len();
        self.pending.clear();
        n
    }

    /// `[DROP: <names>]` resolved to member ids — drop matching pending
    /// items. Returns the number dropped.
    pub fn drop_by_member_ids(&mut self, member_ids: &[String]) -> usize {
        let before = self.pending.len();
        self.pending.retain(|i| !member_ids.contains(&i.target_member_id));
        before - self.pending.len()
    }

    pub fn get_stats(&self) -> QueueStats {
        let mut by_intent = IntentCounts::default();
        for item in &self.pending {
            match item.intent {
                Intent::P1Interrupt => by_intent.p1 += 1,
                Intent::P2Reply => by_intent.p2 += 1,
                Intent::P3Extend => by_intent.p3 += 1,
            }
        }
        let local_queue_size = self.pending.iter().filter(|i| self.is_local(i)).count();
        QueueStats {
            total_pending: self.pending.len(),
            by_intent,
            local_queue_size,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
