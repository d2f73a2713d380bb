use mongodb::{
    bson::doc,
    options::{FindOneAndUpdateOptions, ReturnDocument, UpdateOptions},
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::mongodb::Coll;

/// Counter backing integer user IDs.
pub const USER_ID_COUNTER: &str = "user_id";

/// A counter object used to implement auto-increment fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counter {
    #[serde(rename = "_id")]
    pub id: String,
    pub next: u32,
}

impl Counter {
    /// Atomically retrieve the next value of the named counter.
    pub async fn next(counters: &Coll<Counter>, name: &str) -> Result<u32> {
        let update = doc! {
            "$inc": { "next": 1 }
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::Before)
            .build();
        let counter = counters
            .find_one_and_update(doc! { "_id": name }, update, options)
            .await?
            .ok_or_else(|| Error::not_found(format!("Counter '{name}'")))?;
        Ok(counter.next)
    }
}

/// Create the named counter starting at 1, unless it already exists.
///
/// This operation is idempotent.
pub async fn ensure_counter_exists(counters: &Coll<Counter>, name: &str) -> Result<()> {
    let update = doc! {
        "$setOnInsert": { "next": 1 }
    };
    let options = UpdateOptions::builder().upsert(true).build();
    counters
        .update_one(doc! { "_id": name }, update, options)
        .await?;
    Ok(())
}
