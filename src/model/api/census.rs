use serde::{Deserialize, Serialize};

use crate::model::db::census::{VoterId, VotingId};

/// Body of a bulk-add request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddVoters {
    pub voting_id: VotingId,
    pub voters: Vec<VoterId>,
}

/// Body of a removal request; the voting comes from the path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveVoters {
    pub voters: Vec<VoterId>,
}

/// The voters in one voting's census.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterList {
    pub voters: Vec<VoterId>,
}
