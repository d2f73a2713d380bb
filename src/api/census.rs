use log::info;
use mongodb::bson::doc;
use rocket::{
    futures::TryStreamExt,
    http::Status,
    response::status,
    serde::json::Json,
    Route,
};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::Admin,
            census::{AddVoters, RemoveVoters, VoterList},
        },
        db::census::{first_repeated, CensusEntry, VoterId, VotingId},
        mongodb::{creation_order, Coll},
    },
};

pub fn routes() -> Vec<Route> {
    routes![check_voter, list_voters, add_voters, remove_voters]
}

pub const VALID_VOTER: &str = "Valid voter";
pub const INVALID_VOTER: &str = "Invalid voter";

/// Is the voter in this voting's census? Needs no authentication.
#[get("/census/<voting_id>?<voter_id>")]
async fn check_voter(
    voting_id: VotingId,
    voter_id: Option<VoterId>,
    census: Coll<CensusEntry>,
) -> Result<status::Custom<Json<&'static str>>> {
    let member = match voter_id {
        Some(voter_id) => census
            .find_one(CensusEntry::pair_filter(voting_id, voter_id), None)
            .await?
            .is_some(),
        None => false,
    };

    Ok(if member {
        status::Custom(Status::Ok, Json(VALID_VOTER))
    } else {
        status::Custom(Status::Unauthorized, Json(INVALID_VOTER))
    })
}

#[get("/census?<voting_id>")]
async fn list_voters(
    _admin: Admin,
    voting_id: Option<VotingId>,
    census: Coll<CensusEntry>,
) -> Result<Json<VoterList>> {
    let voting_id = voting_id.ok_or_else(|| Error::bad_request("voting_id is required"))?;
    let voters = census
        .find(
            doc! { "voting_id": voting_id },
            creation_order(),
        )
        .await?
        .map_ok(|entry| entry.voter_id)
        .try_collect::<Vec<_>>()
        .await?;
    Ok(Json(VoterList { voters }))
}

#[post("/census", data = "<request>")]
async fn add_voters(
    _admin: Admin,
    request: Json<AddVoters>,
    census: Coll<CensusEntry>,
) -> Result<Status> {
    let AddVoters { voting_id, voters } = request.into_inner();

    if let Some(voter) = first_repeated(&voters) {
        return Err(Error::conflict(format!(
            "Voter {voter} appears more than once"
        )));
    }
    if voters.is_empty() {
        return Ok(Status::Created);
    }

    // Nothing is written unless every pair is new.
    let filter = CensusEntry::voters_filter(voting_id, &voters);
    if let Some(existing) = census.find_one(filter, None).await? {
        return Err(Error::conflict(format!(
            "Voter {} is already in the census of voting {voting_id}",
            existing.voter_id
        )));
    }

    // Lost a race against a concurrent add.
    if !CensusEntry::insert_all(&census, voting_id, &voters).await? {
        return Err(Error::conflict(format!(
            "A voter is already in the census of voting {voting_id}"
        )));
    }
    info!("Added {} voters to voting {voting_id}", voters.len());
    Ok(Status::Created)
}

/// Delete the given voters' entries; succeeds however many matched.
#[delete("/census/<voting_id>", data = "<request>")]
async fn remove_voters(
    _admin: Admin,
    voting_id: VotingId,
    request: Json<RemoveVoters>,
    census: Coll<CensusEntry>,
) -> Result<Status> {
    let result = census
        .delete_many(CensusEntry::voters_filter(voting_id, &request.voters), None)
        .await?;
    info!(
        "Removed {} voters from voting {voting_id}",
        result.deleted_count
    );
    Ok(Status::NoContent)
}
