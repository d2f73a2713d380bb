use std::ops::Deref;

use log::debug;
use mongodb::{
    bson::doc,
    error::Error as DbError,
    options::{FindOptions, IndexOptions},
    Collection, Database, IndexModel,
};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::model::db::{
    census::CensusEntry, group::CensusGroup, petition::Petition, token::ApiToken, user::User,
};

use super::counter::Counter;

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r, T> FromRequest<'r> for Coll<T>
where
    T: MongoCollection,
{
    type Error = ();

    /// Get the database connection from the managed state and wrap it in a collection.
    ///
    /// Panics iff the [`Database`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = req.guard::<&State<Database>>().await.unwrap();
        request::Outcome::Success(Coll::from_db(db))
    }
}

impl MongoCollection for User {
    const NAME: &'static str = "users";
}

impl MongoCollection for ApiToken {
    const NAME: &'static str = "tokens";
}

impl MongoCollection for CensusEntry {
    const NAME: &'static str = "census";
}

impl MongoCollection for CensusGroup {
    const NAME: &'static str = "census_groups";
}

impl MongoCollection for Petition {
    const NAME: &'static str = "petitions";
}

impl MongoCollection for Counter {
    const NAME: &'static str = "counters";
}

/// Find options returning documents oldest first.
///
/// Object IDs grow with insertion time, so sorting on `_id` gives creation order.
pub fn creation_order() -> FindOptions {
    FindOptions::builder().sort(doc! { "_id": 1 }).build()
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // Usernames identify users at login.
    let username_index = IndexModel::builder()
        .keys(doc! {"username": 1})
        .options(unique.clone())
        .build();
    Coll::<User>::from_db(db)
        .create_index(username_index, None)
        .await?;

    // One API token per user.
    let token_index = IndexModel::builder()
        .keys(doc! {"user_id": 1})
        .options(unique.clone())
        .build();
    Coll::<ApiToken>::from_db(db)
        .create_index(token_index, None)
        .await?;

    // A voter appears at most once in each voting's census.
    let census_index = IndexModel::builder()
        .keys(doc! {"voting_id": 1, "voter_id": 1})
        .options(unique)
        .build();
    Coll::<CensusEntry>::from_db(db)
        .create_index(census_index, None)
        .await?;

    Ok(())
}
