use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::{
    db::{census::VotingId, group::CensusGroup, user::UserId},
    form::{FieldErrors, Validate, REQUIRED},
};

use super::id::ApiId;

/// A census group as submitted for creation. Everything is optional here so
/// that missing fields surface as field errors rather than a parse failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub users: Option<Vec<UserId>>,
    #[serde(default)]
    pub votings: Vec<VotingId>,
}

impl Validate for GroupSpec {
    type Valid = CensusGroup;

    /// Whether the users exist is checked by the caller.
    fn validate(&self) -> Result<CensusGroup, FieldErrors> {
        let mut errors = FieldErrors::default();
        let name = self.name.as_deref().map(str::trim).unwrap_or_default();
        if name.is_empty() {
            errors.add("name", REQUIRED);
        }
        let users = self.users.clone().unwrap_or_default();
        if users.is_empty() {
            errors.add("users", REQUIRED);
        }

        errors.or_valid(|| {
            CensusGroup::new(name.to_string(), dedup(users), dedup(self.votings.clone()))
        })
    }
}

/// Drop repeated IDs, keeping first occurrences in order.
fn dedup(ids: Vec<u32>) -> Vec<u32> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

/// A census group as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDescription {
    pub id: ApiId,
    pub name: String,
    pub users: Vec<UserId>,
    pub votings: Vec<VotingId>,
    pub has_voted: bool,
}

impl From<CensusGroup> for GroupDescription {
    fn from(group: CensusGroup) -> Self {
        Self {
            id: group.id.into(),
            name: group.name,
            users: group.users,
            votings: group.votings,
            has_voted: group.has_voted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_and_users_required() {
        let errors = GroupSpec::default().validate().unwrap_err();
        assert_eq!(errors.for_field("name"), [REQUIRED]);
        assert_eq!(errors.for_field("users"), [REQUIRED]);

        let spec = GroupSpec {
            name: Some("Census_1".to_string()),
            users: Some(Vec::new()),
            votings: Vec::new(),
        };
        let errors = spec.validate().unwrap_err();
        assert!(errors.for_field("name").is_empty());
        assert_eq!(errors.for_field("users"), [REQUIRED]);
    }

    #[test]
    fn valid_group() {
        let spec = GroupSpec {
            name: Some(" Census_1 ".to_string()),
            users: Some(vec![3, 1, 3]),
            votings: vec![7],
        };
        let group = spec.validate().unwrap();
        assert_eq!(group.name, "Census_1");
        assert_eq!(group.users, [3, 1]);
        assert_eq!(group.votings, [7]);
        assert!(!group.has_voted);
    }
}
