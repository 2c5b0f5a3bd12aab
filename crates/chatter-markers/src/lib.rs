mod identity;
mod marker;

pub use identity::{normalize, resolve_addressees, resolve_names_to_member_ids, ResolveResult, ResolvedAddressee};
pub use marker::{parse_markers, strip_all_markers_for_context, DropDirective, ParsedMarkers};
