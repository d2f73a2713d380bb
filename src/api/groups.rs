use log::info;
use mongodb::bson::doc;
use rocket::{futures::TryStreamExt, http::Status, response::status, serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::Admin,
            group::{GroupDescription, GroupSpec},
        },
        db::{group::CensusGroup, user::User},
        form::{FieldErrors, Validate},
        mongodb::{creation_order, Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![list_groups, create_group, delete_group]
}

#[get("/census/groups")]
async fn list_groups(
    _admin: Admin,
    groups: Coll<CensusGroup>,
) -> Result<Json<Vec<GroupDescription>>> {
    let groups = groups
        .find(None, creation_order())
        .await?
        .map_ok(GroupDescription::from)
        .try_collect::<Vec<_>>()
        .await?;
    Ok(Json(groups))
}

#[post("/census/groups", data = "<spec>")]
async fn create_group(
    _admin: Admin,
    spec: Json<GroupSpec>,
    groups: Coll<CensusGroup>,
    users: Coll<User>,
) -> Result<status::Created<Json<GroupDescription>>> {
    let group = spec.validate().map_err(Error::Validation)?;

    // Every member must be an existing user.
    let known: Vec<u32> = users
        .find(doc! { "_id": { "$in": group.users.clone() } }, None)
        .await?
        .map_ok(|user| user.id)
        .try_collect()
        .await?;
    let mut errors = FieldErrors::default();
    for user in group.users.iter().filter(|user| !known.contains(user)) {
        errors.add(
            "users",
            format!("Select a valid choice. {user} is not one of the available choices."),
        );
    }
    if !errors.is_empty() {
        return Err(Error::Validation(errors));
    }

    groups.insert_one(&group, None).await?;
    info!("Created census group {} ({})", group.name, group.id);

    let location = uri!(delete_group(group.id)).to_string();
    Ok(status::Created::new(location).body(Json(group.into())))
}

#[delete("/census/groups/<group_id>")]
async fn delete_group(
    _admin: Admin,
    group_id: Id,
    groups: Coll<CensusGroup>,
) -> Result<Status> {
    let result = groups.delete_one(group_id.as_doc(), None).await?;
    if result.deleted_count == 0 {
        return Err(Error::not_found(format!("Census group {group_id}")));
    }
    info!("Deleted census group {group_id}");
    Ok(Status::NoContent)
}
