use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::Intent;

/// A scheduled instruction to dispatch a turn to a specific member in
/// reply to a specific parent message. Owned and mutated in-place by the
/// routing queue; never shared by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingItem {
    pub id: String,
    pub target_member_id: String,
    pub parent_message_id: String,
    pub trigger_message_id: String,
    pub intent: Intent,
    pub enqueued_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let item = RoutingItem {
            id: "route-1".into(),
            target_member_id: "alpha".into(),
            parent_message_id: "msg-1".into(),
            trigger_message_id: "msg-1".into(),
            intent: Intent::P2Reply,
            enqueued_at: Utc::now(),
        };
        let json = serde_json::to_string(&item).unwrap();
        let back: RoutingItem = serde_json::from_str(&json).unwrap();
        assert_eq!(item, back);
    }
}
