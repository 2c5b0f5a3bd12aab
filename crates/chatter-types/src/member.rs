use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Whether a team member is a human observer or an externally spawned AI CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberType {
    Ai,
    Human,
}

/// A single participant in a team.
///
/// `order` gives a stable sequence used for first-human fallback (the human
/// member with the smallest `order` is the one the coordinator pauses on
/// when no explicit addressee resolves). `agent_type` selects which
/// execution adapter is used and is required for AI members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub name: String,
    pub display_name: String,
    #[serde(rename = "type")]
    pub member_type: MemberType,
    pub role: String,
    pub order: u32,
    /// Selects the execution adapter. Required when `member_type == Ai`.
    pub agent_type: Option<String>,
}

impl Member {
    pub fn is_ai(&self) -> bool {
        self.member_type == MemberType::Ai
    }

    pub fn is_human(&self) -> bool {
        self.member_type == MemberType::Human
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RoleDefinition {
    pub name: String,
    pub description: String,
}

/// A team of members collaborating in one conversation.
///
/// Invariant (checked by [`Team::validate`]): at least two members; member
/// `id`s unique; `name`s unique; `display_name`s unique (duplicates would
/// make addressee resolution ambiguous, see [`crate::Member`] docs); every AI
/// member names a non-empty `agent_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub members: Vec<Member>,
    #[serde(default)]
    pub role_definitions: Vec<RoleDefinition>,
    pub instruction_file: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TeamValidationError {
    #[error("team must have at least 2 members, found {0}")]
    TooFewMembers(usize),
    #[error("duplicate member id: {0}")]
    DuplicateId(String),
    #[error("duplicate member name: {0}")]
    DuplicateName(String),
    #[error("duplicate member displayName: {0}")]
    DuplicateDisplayName(String),
    #[error("AI member '{0}' has no agentType")]
    MissingAgentType(String),
}

impl Team {
    /// Validate the invariants listed on [`Team`]. Call this once after
    /// loading a team definition, before constructing a coordinator.
    pub fn validate(&self) -> Result<(), TeamValidationError> {
        if self.members.len() < 2 {
            return Err(TeamValidationError::TooFewMembers(self.members.len()));
        }

        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        let mut display_names = HashSet::new();

        for m in &self.members {
            if !ids.insert(m.id.clone()) {
                return Err(TeamValidationError::DuplicateId(m.id.clone()));
            }
            if !names.insert(m.name.clone()) {
                return Err(TeamValidationError::DuplicateName(m.name.clone()));
            }
            if !display_names.insert(m.display_name.clone()) {
                return Err(TeamValidationError::DuplicateDisplayName(
                    m.display_name.clone(),
                ));
            }
            if m.is_ai() && m.agent_type.as_deref().unwrap_or("").is_empty() {
                return Err(TeamValidationError::MissingAgentType(m.name.clone()));
            }
        }

        Ok(())
    }

    /// The human member with the smallest `order`, used as the fallback
    /// addressee whenever routing cannot identify an explicit target.
    pub fn first_human(&self) -> Option<&Member> {
        self.members
            .iter()
            .filter(|m| m.is_human())
            .min_by_key(|m| m.order)
    }

    pub fn member_by_id(&self, id: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str, name: &str, display: &str, ty: MemberType, order: u32) -> Member {
        Member {
            id: id.into(),
            name: name.into(),
            display_name: display.into(),
            member_type: ty,
            role: "contributor".into(),
            order,
            agent_type: if ty == MemberType::Ai {
                Some("claude-code".into())
            } else {
                None
            },
        }
    }

    fn team(members: Vec<Member>) -> Team {
        Team {
            id: "t1".into(),
            name: "team".into(),
            display_name: "Team".into(),
            description: String::new(),
            members,
            role_definitions: vec![],
            instruction_file: None,
        }
    }

    #[test]
    fn rejects_single_member_team() {
        let t = team(vec![member("a", "a", "A", MemberType::Ai, 0)]);
        assert_eq!(t.validate(), Err(TeamValidationError::TooFewMembers(1)));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let t = team(vec![
            member("dup", "alpha", "Alpha", MemberType::Ai, 0),
            member("dup", "beta", "Beta", MemberType::Human, 1),
        ]);
        assert_eq!(
            t.validate(),
            Err(TeamValidationError::DuplicateId("dup".into()))
        );
    }

    #[test]
    fn rejects_duplicate_display_names() {
        let t = team(vec![
            member("a", "alpha", "Same", MemberType::Ai, 0),
            member("b", "beta", "Same", MemberType::Human, 1),
        ]);
        assert_eq!(
            t.validate(),
            Err(TeamValidationError::DuplicateDisplayName("Same".into()))
        );
    }

    #[test]
    fn rejects_ai_member_without_agent_type() {
        let mut ai = member("a", "alpha", "Alpha", MemberType::Ai, 0);
        ai.agent_type = None;
        let t = team(vec![ai, member("b", "beta", "Beta", MemberType::Human, 1)]);
        assert_eq!(
            t.validate(),
            Err(TeamValidationError::MissingAgentType("alpha".into()))
        );
    }

    #[test]
    fn accepts_valid_team() {
        let t = team(vec![
            member("a", "alpha", "Alpha", MemberType::Ai, 0),
            member("h", "human-1", "Human One", MemberType::Human, 1),
        ]);
        assert!(t.validate().is_ok());
    }

    #[test]
    fn first_human_picks_smallest_order() {
        let t = team(vec![
            member("h2", "human-2", "Human Two", MemberType::Human, 5),
            member("h1", "human-1", "Human One", MemberType::Human, 1),
            member("a", "alpha", "Alpha", MemberType::Ai, 0),
        ]);
        assert_eq!(t.first_human().unwrap().id, "h1");
    }

    #[test]
    fn first_human_none_when_all_ai() {
        let t = team(vec![
            member("a", "alpha", "Alpha", MemberType::Ai, 0),
            member("b", "beta", "Beta", MemberType::Ai, 1),
        ]);
        assert!(t.first_human().is_none());
    }
}
