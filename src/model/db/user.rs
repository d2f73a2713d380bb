use std::fmt::Display;

use chrono::{DateTime, Utc};
use log::{info, warn};
use mongodb::bson::{doc, serde_helpers::chrono_datetime_as_bson_datetime};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::{
    error::Result,
    model::mongodb::{Coll, Counter, USER_ID_COUNTER},
    Config,
};

/// Users are identified by small integers so that census entries can refer
/// to them directly.
pub type UserId = u32;

/// Different privilege levels, ordered from least to most privileged.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Rights {
    Voter = 0,
    Admin = 1,
}

impl Display for Rights {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::Voter => "voter",
                Self::Admin => "admin",
            }
        )
    }
}

/// A registered user, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    /// Staff users administer the census.
    #[serde(default)]
    pub is_staff: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// Build a user, hashing the plaintext password.
    pub fn new(
        id: UserId,
        username: impl Into<String>,
        email: impl Into<String>,
        password: &str,
        is_staff: bool,
    ) -> Result<Self> {
        Ok(Self {
            id,
            username: username.into(),
            email: email.into(),
            password_hash: hash_password(password)?,
            is_staff,
            date_joined: Utc::now(),
        })
    }

    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        // A malformed stored hash can never match.
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }

    pub fn rights(&self) -> Rights {
        if self.is_staff {
            Rights::Admin
        } else {
            Rights::Voter
        }
    }

    pub async fn find(users: &Coll<User>, id: UserId) -> Result<Option<Self>> {
        Ok(users.find_one(doc! { "_id": id }, None).await?)
    }

    pub async fn find_by_username(users: &Coll<User>, username: &str) -> Result<Option<Self>> {
        Ok(users.find_one(doc! { "username": username }, None).await?)
    }

    /// Allocate the next user ID and insert a new user.
    pub async fn insert(
        users: &Coll<User>,
        counters: &Coll<Counter>,
        username: &str,
        email: &str,
        password: &str,
        is_staff: bool,
    ) -> Result<Self> {
        let id = Counter::next(counters, USER_ID_COUNTER).await?;
        let user = Self::new(id, username, email, password, is_staff)?;
        users.insert_one(&user, None).await?;
        info!("Created {} {} ({})", user.rights(), user.username, user.id);
        Ok(user)
    }
}

/// Hash a plaintext password with a fresh random salt.
fn hash_password(password: &str) -> Result<String> {
    // 16 bytes is recommended for password hashing:
    //  https://en.wikipedia.org/wiki/Argon2
    let mut salt = [0_u8; 16];
    rand::thread_rng().fill(&mut salt);
    let hash = argon2::hash_encoded(password.as_bytes(), &salt, &argon2::Config::default())?;
    Ok(hash)
}

/// Make sure at least one staff user exists, seeding one from the config if not.
pub async fn ensure_admin_exists(
    users: &Coll<User>,
    counters: &Coll<Counter>,
    config: &Config,
) -> Result<()> {
    let staff = users.count_documents(doc! { "is_staff": true }, None).await?;
    if staff == 0 {
        warn!(
            "No staff user found, creating default admin '{}'",
            config.admin_username()
        );
        User::insert(
            users,
            counters,
            config.admin_username(),
            "",
            config.admin_password(),
            true,
        )
        .await?;
    }
    Ok(())
}


#[cfg(test)]
pub use examples::EXAMPLE_VOTER_PASSWORD;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_verification() {
        let user = User::new(1, "alice", "alice@example.com", "s3cret-pass", false).unwrap();
        assert!(user.verify_password("s3cret-pass"));
        assert!(!user.verify_password("wrong"));
        assert_ne!(user.password_hash, "s3cret-pass");
    }

    #[test]
    fn malformed_hash_never_matches() {
        let mut user = User::example_voter(3);
        user.password_hash = "not a hash".to_string();
        assert!(!user.verify_password(EXAMPLE_VOTER_PASSWORD));
    }

    #[test]
    fn rights_follow_staff_flag() {
        let mut user = User::example_voter(2);
        assert_eq!(user.rights(), Rights::Voter);
        user.is_staff = true;
        assert_eq!(user.rights(), Rights::Admin);
        assert!(Rights::Admin > Rights::Voter);
    }

    #[backend_test]
    async fn default_admin_seeded(users: Coll<User>) {
        let admins = users
            .count_documents(doc! { "is_staff": true }, None)
            .await
            .unwrap();
        assert_eq!(admins, 1);
    }
}
