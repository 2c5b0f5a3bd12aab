//! Multi-party AI conversation orchestration engine.
//!
//! Wires together marker parsing and identity resolution
//! (`chatter-markers`), the routing queue (`chatter-queue`), context
//! assembly (`chatter-context`), per-turn agent process execution
//! (`chatter-adapter`), and layered configuration (`chatter-config`)
//! into the [`Coordinator`] state machine described in the engineering
//! specification's §4.6.

mod coordinator;
mod error;
mod events;

pub use coordinator::{create_coordinator, Coordinator, SessionStatus};
pub use error::CoordinatorError;
pub use events::Event;

pub use chatter_adapter::{
    Adapter, AdapterError, AgentEvent, AgentKind, CancelHandle, FinishReason, ProcessAdapter,
    TurnRequest, TurnResult,
};
pub use chatter_config::CoordinatorConfig;
pub use chatter_context::{AgentFamily, ContextError};
pub use chatter_markers::{DropDirective, ResolveResult};
pub use chatter_queue::{QueueConfig, QueueProtectionEvent, QueueStats};
pub use chatter_types::{
    ConversationMessage, Intent, Member, MemberType, RoutingInfo, RoutingItem, Snapshot,
    SnapshotVersionError, Speaker, Team, TeamValidationError,
};
