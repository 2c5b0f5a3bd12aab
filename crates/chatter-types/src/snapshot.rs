use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::message::ConversationMessage;

pub const SNAPSHOT_VERSION: u32 = 1;

/// Serializable form of a session, per §6.1 `exportSnapshot`/`importSnapshot`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub timestamp: DateTime<Utc>,
    pub team_task: Option<String>,
    pub messages: Vec<ConversationMessage>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotVersionError {
    #[error("unsupported snapshot version {found}, expected {expected}")]
    Unsupported { found: u32, expected: u32 },
}

impl Snapshot {
    pub fn new(team_task: Option<String>, messages: Vec<ConversationMessage>) -> Self {
        Snapshot {
            version: SNAPSHOT_VERSION,
            timestamp: Utc::now(),
            team_task,
            messages,
        }
    }

    pub fn check_version(&self) -> Result<(), SnapshotVersionError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(SnapshotVersionError::Unsupported {
                found: self.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        Ok(())
    }

    /// The `N` in the highest `msg-N` id present, or 0 if the log is
    /// empty. Used to resume monotone id assignment after import.
    pub fn next_message_sequence(&self) -> u64 {
        self.messages
            .iter()
            .filter_map(|m| m.sequence_number())
            .max()
            .map(|n| n + 1)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::MemberType;
    use crate::message::Speaker;

    fn msg(id: &str) -> ConversationMessage {
        ConversationMessage {
            id: id.into(),
            content: "hi".into(),
            timestamp: Utc::now(),
            speaker: Speaker {
                id: "a".into(),
                name: "a".into(),
                display_name: "A".into(),
                member_type: MemberType::Ai,
            },
            routing: None,
        }
    }

    #[test]
    fn rejects_wrong_version() {
        let mut s = Snapshot::new(None, vec![]);
        s.version = 2;
        assert_eq!(
            s.check_version(),
            Err(SnapshotVersionError::Unsupported {
                found: 2,
                expected: 1
            })
        );
    }

    #[test]
    fn next_sequence_tracks_highest_id() {
        let s = Snapshot::new(None, vec![msg("msg-1"), msg("msg-7"), msg("msg-3")]);
        assert_eq!(s.next_message_sequence(), 8);
    }

    #[test]
    fn next_sequence_zero_for_empty_log() {
        let s = Snapshot::new(None, vec![]);
        assert_eq!(s.next_message_sequence(), 0);
    }

    #[test]
    fn round_trips_through_json() {
        let s = Snapshot::new(Some("task".into()), vec![msg("msg-1")]);
        let json = serde_json::to_string(&s).unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
    }
}
