use std::collections::HashMap;

use mongodb::bson::doc;
use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::{
    error::Result,
    model::{
        db::{census::CensusEntry, group::CensusGroup, user::User},
        export::{to_csv, CensusExport, CsvFile, GroupExport},
        mongodb::{creation_order, Coll},
    },
};

pub fn routes() -> Vec<Route> {
    routes![census_json, census_csv, groups_json, groups_csv]
}

async fn census_rows(census: &Coll<CensusEntry>) -> Result<Vec<CensusExport>> {
    Ok(census
        .find(None, creation_order())
        .await?
        .map_ok(CensusExport::from)
        .try_collect()
        .await?)
}

/// Project every group, replacing member IDs with usernames.
async fn group_rows(groups: &Coll<CensusGroup>, users: &Coll<User>) -> Result<Vec<GroupExport>> {
    let groups: Vec<CensusGroup> = groups
        .find(None, creation_order())
        .await?
        .try_collect()
        .await?;

    let mut member_ids: Vec<u32> = groups.iter().flat_map(|group| group.users.clone()).collect();
    member_ids.sort_unstable();
    member_ids.dedup();
    let usernames: HashMap<u32, String> = users
        .find(doc! { "_id": { "$in": member_ids } }, None)
        .await?
        .map_ok(|user| (user.id, user.username))
        .try_collect()
        .await?;

    Ok(groups
        .into_iter()
        .map(|group| GroupExport::new(group, |id| usernames.get(&id).cloned()))
        .collect())
}

#[get("/census/export/json")]
async fn census_json(census: Coll<CensusEntry>) -> Result<Json<Vec<CensusExport>>> {
    Ok(Json(census_rows(&census).await?))
}

#[get("/census/export/csv")]
async fn census_csv(census: Coll<CensusEntry>) -> Result<CsvFile> {
    Ok(CsvFile {
        filename: "census.csv",
        body: to_csv(&census_rows(&census).await?)?,
    })
}

#[get("/census/groups/export/json")]
async fn groups_json(
    groups: Coll<CensusGroup>,
    users: Coll<User>,
) -> Result<Json<Vec<GroupExport>>> {
    Ok(Json(group_rows(&groups, &users).await?))
}

#[get("/census/groups/export/csv")]
async fn groups_csv(groups: Coll<CensusGroup>, users: Coll<User>) -> Result<CsvFile> {
    Ok(CsvFile {
        filename: "census_groups.csv",
        body: to_csv(&group_rows(&groups, &users).await?)?,
    })
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::serde_json::{self, json},
    };

    use super::*;
    use crate::model::mongodb::Counter;

    #[backend_test]
    async fn census_exports(client: Client, census: Coll<CensusEntry>) {
        census
            .insert_many(
                [
                    CensusEntry::new(2, 5),
                    CensusEntry::new(1, 7),
                    CensusEntry::new(1, 5),
                ],
                None,
            )
            .await
            .unwrap();

        let response = client.get(uri!(census_json)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let rows: serde_json::Value = response.into_json().await.unwrap();
        assert_eq!(
            rows,
            json!([
                { "voting_id": 2, "voter_id": 5 },
                { "voting_id": 1, "voter_id": 7 },
                { "voting_id": 1, "voter_id": 5 },
            ])
        );

        let response = client.get(uri!(census_csv)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(Some(ContentType::CSV), response.content_type());
        let disposition = response.headers().get_one("Content-Disposition").unwrap();
        assert!(disposition.starts_with("attachment"));
        let body = response.into_string().await.unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines, ["voting_id,voter_id", "2,5", "1,7", "1,5"]);
    }

    #[backend_test]
    async fn empty_census_exports(client: Client) {
        let response = client.get(uri!(census_json)).dispatch().await;
        assert_eq!(response.into_string().await.unwrap(), "[]");

        let response = client.get(uri!(census_csv)).dispatch().await;
        assert_eq!(response.into_string().await.unwrap().trim_end(), "voting_id,voter_id");
    }

    #[backend_test]
    async fn group_exports(
        client: Client,
        users: Coll<User>,
        counters: Coll<Counter>,
        groups: Coll<CensusGroup>,
    ) {
        let mut ids = Vec::new();
        for name in ["user1", "user2"] {
            let user = User::insert(&users, &counters, name, "", "group-password", false)
                .await
                .unwrap();
            ids.push(user.id);
        }
        let mut group = CensusGroup::example(1, ids);
        group.votings = vec![1, 2];
        groups.insert_one(&group, None).await.unwrap();

        let response = client.get(uri!(groups_json)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let rows: serde_json::Value = response.into_json().await.unwrap();
        assert_eq!(
            rows,
            json!([{
                "name": "Census_1",
                "users": ["user1", "user2"],
                "votings": [1, 2],
                "has_voted": false,
            }])
        );

        let response = client.get(uri!(groups_csv)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let body = response.into_string().await.unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(
            lines,
            [
                "name,users,votings,has_voted",
                "Census_1,\"['user1', 'user2']\",\"[1, 2]\",False",
            ]
        );
    }
}
