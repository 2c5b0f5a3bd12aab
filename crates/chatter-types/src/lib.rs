mod bytes;
mod member;
mod message;
mod routing_item;
mod snapshot;
mod team_task;

pub use bytes::{truncate_to_bytes, truncate_to_bytes_reporting};
pub use member::{Member, MemberType, RoleDefinition, Team, TeamValidationError};
pub use message::{ConversationMessage, Intent, ParsedAddressee, RoutingInfo, Speaker};
pub use routing_item::RoutingItem;
pub use snapshot::{Snapshot, SnapshotVersionError, SNAPSHOT_VERSION};
pub use team_task::{cap_team_task, MAX_TEAM_TASK_BYTES};
