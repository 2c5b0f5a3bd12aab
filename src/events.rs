use chatter_adapter::AgentEvent as AdapterAgentEvent;
use chatter_queue::{QueueProtectionEvent, QueueStats};
use chatter_types::ConversationMessage;

use crate::coordinator::SessionStatus;

/// Every state-change notification the coordinator can raise, replacing
/// the spec's eight named callbacks (§4.6.5) with one tagged stream —
/// the systems-language shape §9's design notes call for. Subscribers
/// drain this from the other end of the channel passed to
/// [`crate::create_coordinator`].
#[derive(Debug, Clone)]
pub enum Event {
    /// A message was appended to the log (speaker-originated or agent-produced).
    Message(ConversationMessage),
    StatusChanged(SessionStatus),
    /// One normalized event from a member's in-flight turn.
    AgentEvent {
        member_id: String,
        event: AdapterAgentEvent,
    },
    QueueUpdate(QueueStats),
    QueueProtection(QueueProtectionEvent),
    PartialResolveFailure(Vec<String>),
    UnresolvedAddressees(Vec<String>),
    TeamTaskChanged(Option<String>),
}
