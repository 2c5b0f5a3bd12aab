use chatter_types::{Intent, Member, ParsedAddressee};

/// `normalize(s) = lowercase(remove_whitespace(remove_hyphens(s)))`.
pub fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect::<String>()
        .to_lowercase()
}

/// One resolved addressee, carrying forward the intent it was parsed
/// with so the coordinator can enqueue a routing item directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAddressee {
    pub member: Member,
    pub intent: Intent,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolveResult {
    pub resolved: Vec<ResolvedAddressee>,
    pub unresolved: Vec<String>,
}

impl ResolveResult {
    /// True when at least one addressee was given and none resolved.
    pub fn is_total_failure(&self) -> bool {
        self.resolved.is_empty() && !self.unresolved.is_empty()
    }

    /// True when some, but not all, addressees resolved.
    pub fn is_partial_failure(&self) -> bool {
        !self.resolved.is_empty() && !self.unresolved.is_empty()
    }
}

/// Resolve each parsed addressee to the first team member whose
/// normalized `id`, `name`, or `displayName` matches. First match wins;
/// duplicates from identical `displayName`s are rejected earlier, at
/// `Team::validate` time.
pub fn resolve_addressees(members: &[Member], addressees: &[ParsedAddressee]) -> ResolveResult {
    let mut resolved = Vec::new();
    let mut unresolved = Vec::new();

    for addr in addressees {
        let key = normalize(&addr.raw);
        let found = members.iter().find(|m| {
            normalize(&m.id) == key || normalize(&m.name) == key || normalize(&m.display_name) == key
        });
        match found {
            Some(member) => resolved.push(ResolvedAddressee {
                member: member.clone(),
                intent: addr.intent,
            }),
            None => unresolved.push(addr.raw.clone()),
        }
    }

    ResolveResult { resolved, unresolved }
}

/// Resolve a bare list of names (used by `[DROP: <names>]`) to member ids,
/// ignoring names that match no member.
pub fn resolve_names_to_member_ids(members: &[Member], names: &[String]) -> Vec<String> {
    names
        .iter()
        .filter_map(|raw| {
            let key = normalize(raw);
            members
                .iter()
                .find(|m| {
                    normalize(&m.id) == key
                        || normalize(&m.name) == key
                        || normalize(&m.display_name) == key
                })
                .map(|m| m.id.clone())
        })
        .collect()
}
