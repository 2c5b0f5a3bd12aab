use chatter_types::{cap_team_task, ConversationMessage, RoutingInfo, Snapshot, Speaker};
use chrono::Utc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("message speaker id must not be empty")]
    EmptySpeakerId,
}

/// The append-only message log plus the current team task (§3, §4.3.1).
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Vec<ConversationMessage>,
    team_task: Option<String>,
    next_seq: u64,
}

impl MessageLog {
    pub fn new() -> Self {
        MessageLog::default()
    }

    /// Validate, assign a monotone `msg-N` id and timestamp, and append.
    pub fn add_message(
        &mut self,
        content: String,
        speaker: Speaker,
        routing: Option<RoutingInfo>,
    ) -> Result<&ConversationMessage, ContextError> {
        if speaker.id.trim().is_empty() {
            return Err(ContextError::EmptySpeakerId);
        }
        let id = format!("msg-{}", self.next_seq);
        self.next_seq += 1;
        let message = ConversationMessage {
            id,
            content,
            timestamp: Utc::now(),
            speaker,
            routing,
        };
        self.messages.push(message);
        Ok(self.messages.last().unwrap())
    }

    /// Set the team task, applying the 5 KiB cap (§3). Returns the final
    /// (possibly truncated) value and whether truncation occurred, so the
    /// caller can warn and fire `onTeamTaskChanged`.
    pub fn set_team_task(&mut self, raw: &str) -> (String, bool) {
        let (capped, truncated) = cap_team_task(raw);
        if truncated {
            tracing::warn!(len = raw.len(), "team task truncated to 5 KiB cap");
        }
        self.team_task = Some(capped.clone());
        (capped, truncated)
    }

    pub fn team_task(&self) -> Option<&str> {
        self.team_task.as_deref()
    }

    /// Reset the log and team task. Caller fires `onTeamTaskChanged(None)`.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.team_task = None;
        self.next_seq = 0;
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn latest(&self) -> Option<&ConversationMessage> {
        self.messages.last()
    }

    pub fn get(&self, id: &str) -> Option<&ConversationMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.messages.iter().position(|m| m.id == id)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn export_snapshot(&self) -> Snapshot {
        Snapshot::new(self.team_task.clone(), self.messages.clone())
    }

    /// Replace the log, team task, and next-id counter from `snapshot` in
    /// one atomic step (invariant 11: snapshot round-trip).
    pub fn import_snapshot(
        &mut self,
        snapshot: Snapshot,
    ) -> Result<(), chatter_types::SnapshotVersionError> {
        snapshot.check_version()?;
        self.next_seq = snapshot.next_message_sequence();
        self.team_task = snapshot.team_task;
        self.messages = snapshot.messages;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatter_types::MemberType;

    fn speaker(id: &str) -> Speaker {
        Speaker {
            id: id.into(),
            name: id.into(),
            display_name: id.into(),
            member_type: MemberType::Human,
        }
    }

    #[test]
    fn assigns_monotone_ids() {
        let mut log = MessageLog::new();
        log.add_message("hi".into(), speaker("a"), None).unwrap();
        log.add_message("there".into(), speaker("a"), None).unwrap();
        assert_eq!(log.messages()[0].id, "msg-0");
        assert_eq!(log.messages()[1].id, "msg-1");
    }

    #[test]
    fn rejects_empty_speaker_id() {
        let mut log = MessageLog::new();
        let err = log.add_message("hi".into(), speaker(""), None).unwrap_err();
        assert_eq!(err, ContextError::EmptySpeakerId);
    }

    #[test]
    fn team_task_is_capped() {
        let mut log = MessageLog::new();
        let big = "x".repeat(10 * 1024);
        let (_, truncated) = log.set_team_task(&big);
        assert!(truncated);
        assert_eq!(log.team_task().unwrap().len(), chatter_types::MAX_TEAM_TASK_BYTES);
    }

    #[test]
    fn clear_resets_log_and_team_task_and_ids_restart() {
        let mut log = MessageLog::new();
        log.add_message("hi".into(), speaker("a"), None).unwrap();
        log.set_team_task("ship it");
        log.clear();
        assert!(log.is_empty());
        assert!(log.team_task().is_none());
        log.add_message("hi again".into(), speaker("a"), None).unwrap();
        assert_eq!(log.messages()[0].id, "msg-0");
    }

    #[test]
    fn snapshot_round_trip_preserves_messages_task_and_next_id() {
        let mut log = MessageLog::new();
        log.add_message("hi".into(), speaker("a"), None).unwrap();
        log.add_message("again".into(), speaker("a"), None).unwrap();
        log.set_team_task("ship it");
        let snap = log.export_snapshot();

        let mut restored = MessageLog::new();
        restored.import_snapshot(snap).unwrap();
        assert_eq!(restored.messages().len(), 2);
        assert_eq!(restored.team_task(), Some("ship it"));
        restored.add_message("next".into(), speaker("a"), None).unwrap();
        assert_eq!(restored.messages()[2].id, "msg-2");
    }

    #[test]
    fn import_rejects_wrong_version() {
        let mut snap = Snapshot::new(None, vec![]);
        snap.version = 99;
        let mut log = MessageLog::new();
        assert!(log.import_snapshot(snap).is_err());
    }
}
