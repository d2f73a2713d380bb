use log::debug;
use mongodb::{
    bson::{doc, Document},
    error::ErrorKind,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    model::{
        db::user::UserId,
        mongodb::{is_duplicate_key_error, Coll},
    },
};

/// Identifies a voting event. Votings live outside this service.
pub type VotingId = u32;

/// Voters are users.
pub type VoterId = UserId;

/// Authorises one voter to take part in one voting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CensusEntry {
    pub voting_id: VotingId,
    pub voter_id: VoterId,
    /// Set by the voting flow once the voter has cast a ballot; never reset here.
    #[serde(default)]
    pub has_voted: bool,
}

impl CensusEntry {
    pub fn new(voting_id: VotingId, voter_id: VoterId) -> Self {
        Self {
            voting_id,
            voter_id,
            has_voted: false,
        }
    }

    /// Filter matching the entry for a single voter.
    pub fn pair_filter(voting_id: VotingId, voter_id: VoterId) -> Document {
        doc! {
            "voting_id": voting_id,
            "voter_id": voter_id,
        }
    }

    /// Filter matching the entries of any of the given voters.
    pub fn voters_filter(voting_id: VotingId, voters: &[VoterId]) -> Document {
        doc! {
            "voting_id": voting_id,
            "voter_id": { "$in": voters.to_vec() },
        }
    }

    /// Insert one entry per voter, all or nothing.
    ///
    /// Returns `false` if any pair already exists, after deleting whatever
    /// this call managed to write.
    pub async fn insert_all(
        census: &Coll<CensusEntry>,
        voting_id: VotingId,
        voters: &[VoterId],
    ) -> Result<bool> {
        let entries = voters.iter().map(|voter_id| Self::new(voting_id, *voter_id));
        let err = match census.insert_many(entries, None).await {
            Ok(_) => return Ok(true),
            Err(err) if is_duplicate_key_error(&err) => err,
            Err(err) => return Err(err.into()),
        };

        // Inserts are ordered, so every entry before the first failure is ours.
        let written = match *err.kind {
            ErrorKind::BulkWrite(ref failure) => failure
                .write_errors
                .iter()
                .flatten()
                .map(|e| e.index)
                .min()
                .unwrap_or(0),
            _ => 0,
        };
        if written > 0 {
            let result = census
                .delete_many(Self::voters_filter(voting_id, &voters[..written]), None)
                .await?;
            debug!(
                "Rolled back {} entries of voting {voting_id}",
                result.deleted_count
            );
        }
        Ok(false)
    }
}

/// The first voter that appears more than once in `voters`, if any.
pub fn first_repeated(voters: &[VoterId]) -> Option<VoterId> {
    let mut seen = std::collections::HashSet::with_capacity(voters.len());
    voters.iter().copied().find(|voter| !seen.insert(*voter))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_voters() {
        assert_eq!(first_repeated(&[]), None);
        assert_eq!(first_repeated(&[1, 2, 3]), None);
        assert_eq!(first_repeated(&[4, 1, 2, 1, 4]), Some(1));
    }

    #[test]
    fn new_entries_have_not_voted() {
        assert!(!CensusEntry::new(1, 2).has_voted);
    }

    #[backend_test]
    async fn insert_all_is_all_or_nothing(census: Coll<CensusEntry>) {
        // Another request got the last pair in first.
        census.insert_one(CensusEntry::new(1, 3), None).await.unwrap();

        let inserted = CensusEntry::insert_all(&census, 1, &[1, 2, 3]).await.unwrap();
        assert!(!inserted);
        assert_eq!(census.count_documents(None, None).await.unwrap(), 1);

        let inserted = CensusEntry::insert_all(&census, 1, &[1, 2]).await.unwrap();
        assert!(inserted);
        assert_eq!(census.count_documents(None, None).await.unwrap(), 3);
    }
}
