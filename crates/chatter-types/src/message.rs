use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::member::MemberType;

/// Snapshot of the sender carried on each message, independent of the
/// live `Member` (a member can be renamed after the message was sent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Speaker {
    pub id: String,
    pub name: String,
    pub display_name: String,
    #[serde(rename = "type")]
    pub member_type: MemberType,
}

/// Priority class of a routing item. Ordering matches scheduling
/// priority: `P1Interrupt < P2Reply < P3Extend`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    P1Interrupt,
    P2Reply,
    P3Extend,
}

impl Default for Intent {
    fn default() -> Self {
        Intent::P2Reply
    }
}

impl Intent {
    /// Parse a `!P1`/`!P2`/`!P3` suffix (case-insensitive). Unknown
    /// suffixes are not an error here; the marker parser decides whether
    /// a trailing `!...` looks like an intent suffix at all.
    pub fn from_suffix(s: &str) -> Option<Intent> {
        match s.to_ascii_uppercase().as_str() {
            "P1" => Some(Intent::P1Interrupt),
            "P2" => Some(Intent::P2Reply),
            "P3" => Some(Intent::P3Extend),
            _ => None,
        }
    }
}

/// One addressee parsed out of a `[NEXT:...]` marker, before identity
/// resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedAddressee {
    pub raw: String,
    pub intent: Intent,
}

/// Routing metadata attached to a message once it has been parsed by the
/// marker parser and (where applicable) the identity resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingInfo {
    pub raw_next_markers: Vec<String>,
    pub resolved_addressees: Vec<String>,
    pub parsed_addressees: Vec<ParsedAddressee>,
    pub parent_message_id: Option<String>,
    pub intent: Option<Intent>,
    pub drop_targets: Vec<String>,
}

/// A single entry in the append-only message log.
///
/// `id` is assigned by the coordinator on admission (monotone `msg-N`)
/// and never mutated thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub speaker: Speaker,
    pub routing: Option<RoutingInfo>,
}

impl ConversationMessage {
    /// The numeric sequence embedded in a `msg-N` id, or `None` if the id
    /// does not follow that convention (e.g. an imported snapshot message
    /// with a foreign id scheme).
    pub fn sequence_number(&self) -> Option<u64> {
        self.id.strip_prefix("msg-")?.parse().ok()
    }
}
