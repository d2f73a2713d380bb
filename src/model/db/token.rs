use chrono::{DateTime, Utc};
use data_encoding::HEXLOWER;
use log::debug;
use mongodb::bson::{doc, serde_helpers::chrono_datetime_as_bson_datetime};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    model::{
        db::user::UserId,
        mongodb::{is_duplicate_key_error, Coll},
    },
};

/// Number of random bytes in a token key.
pub const TOKEN_BYTES: usize = 20;

/// An opaque API token. Presented as `Authorization: Token <key>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiToken {
    #[serde(rename = "_id")]
    pub key: String,
    pub user_id: UserId,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created: DateTime<Utc>,
}

impl ApiToken {
    /// Generate a fresh random token for the given user.
    pub fn generate(user_id: UserId) -> Self {
        let mut bytes = [0_u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self {
            key: HEXLOWER.encode(&bytes),
            user_id,
            created: Utc::now(),
        }
    }

    /// Look a token up by its key.
    pub async fn find(tokens: &Coll<ApiToken>, key: &str) -> Result<Option<Self>> {
        Ok(tokens.find_one(doc! { "_id": key }, None).await?)
    }

    /// Return the user's token, creating it on first use.
    pub async fn get_or_create(tokens: &Coll<ApiToken>, user_id: UserId) -> Result<Self> {
        let with_user = doc! { "user_id": user_id };
        if let Some(token) = tokens.find_one(with_user.clone(), None).await? {
            return Ok(token);
        }

        let token = Self::generate(user_id);
        match tokens.insert_one(&token, None).await {
            Ok(_) => {
                debug!("Issued API token for user {user_id}");
                Ok(token)
            }
            // A concurrent login created it first.
            Err(err) if is_duplicate_key_error(&err) => tokens
                .find_one(with_user, None)
                .await?
                .ok_or_else(|| err.into()),
            Err(err) => Err(err.into()),
        }
    }

    /// Delete the token with the given key. Returns whether it existed.
    pub async fn revoke(tokens: &Coll<ApiToken>, key: &str) -> Result<bool> {
        let result = tokens.delete_one(doc! { "_id": key }, None).await?;
        Ok(result.deleted_count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys() {
        let token = ApiToken::generate(4);
        assert_eq!(token.key.len(), TOKEN_BYTES * 2);
        assert!(token
            .key
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        assert_ne!(token.key, ApiToken::generate(4).key);
    }

    #[backend_test]
    async fn get_or_create_reuses_token(tokens: Coll<ApiToken>) {
        let first = ApiToken::get_or_create(&tokens, 9).await.unwrap();
        let second = ApiToken::get_or_create(&tokens, 9).await.unwrap();
        assert_eq!(first.key, second.key);
        let found = ApiToken::find(&tokens, &first.key).await.unwrap().unwrap();
        assert_eq!(found.user_id, 9);

        assert!(ApiToken::revoke(&tokens, &first.key).await.unwrap());
        assert!(!ApiToken::revoke(&tokens, &first.key).await.unwrap());
        assert_eq!(ApiToken::find(&tokens, &first.key).await.unwrap(), None);
    }
}
