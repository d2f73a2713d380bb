use serde::{Deserialize, Serialize};

use crate::model::{
    db::{census::VotingId, user::UserId},
    mongodb::Id,
};

/// A named census: a set of users associated with a set of votings.
///
/// This is the group-shaped census kept alongside the per-voting
/// [`CensusEntry`](super::census::CensusEntry) rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CensusGroup {
    #[serde(rename = "_id")]
    pub id: Id,
    pub name: String,
    pub users: Vec<UserId>,
    #[serde(default)]
    pub votings: Vec<VotingId>,
    #[serde(default)]
    pub has_voted: bool,
}

impl CensusGroup {
    pub fn new(name: String, users: Vec<UserId>, votings: Vec<VotingId>) -> Self {
        Self {
            id: Id::new(),
            name,
            users,
            votings,
            has_voted: false,
        }
    }
}

#[cfg(test)]
mod examples {
    use super::*;

    impl CensusGroup {
        pub fn example(n: usize, users: Vec<UserId>) -> Self {
            Self::new(format!("Census_{n}"), users, Vec::new())
        }
    }
}
