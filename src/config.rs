use chrono::Duration;
use log::{error, info};
use mongodb::{Client as MongoClient, Database};
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::error::Result;
use crate::model::{
    db::user::ensure_admin_exists,
    mongodb::{ensure_counter_exists, ensure_indexes_exist, Coll, USER_ID_COUNTER},
};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    admin_username: String,
    // secrets
    jwt_secret: String,
    admin_password: String,
}

impl Config {
    /// Valid lifetime of session cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Secret key used to sign session JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Username of the staff account seeded into an empty database.
    pub fn admin_username(&self) -> &str {
        &self.admin_username
    }

    /// Password of the seeded staff account.
    pub fn admin_password(&self) -> &str {
        &self.admin_password
    }
}

/// A fairing that loads the application config and puts it in managed state.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // secrets
    db_uri: String,
}

/// A fairing that loads the MongoDB config, connects to the database,
/// performs any setup necessary, and places both a `Client` and a `Database`
/// into managed state.
///
/// Must be attached after [`ConfigFairing`], since seeding the default admin
/// reads the application config.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        let db_config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Loaded database config, connecting...");
        let client = match MongoClient::with_uri_str(db_config.db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(DATABASE_NAME);

        let Some(config) = rocket.state::<Config>() else {
            error!("Database fairing ran before the application config was loaded");
            return Err(rocket);
        };
        if let Err(e) = prepare_database(&db, config).await {
            error!("Failed to prepare database: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        rocket = rocket.manage(client).manage(db);
        Ok(rocket)
    }
}

/// Name of the production database.
const DATABASE_NAME: &str = "decide";

/// Get a fresh database name for a single test, avoiding collisions between
/// tests running in parallel.
#[cfg(test)]
pub(crate) fn test_database_name() -> String {
    let random: u32 = rand::random();
    let db = format!("test{random}");
    log::debug!("Using database {db}");
    db
}

/// Ensure indexes, counters and a staff account exist.
///
/// This operation is idempotent.
pub async fn prepare_database(db: &Database, config: &Config) -> Result<()> {
    ensure_indexes_exist(db).await?;
    let counters = Coll::from_db(db);
    ensure_counter_exists(&counters, USER_ID_COUNTER).await?;
    ensure_admin_exists(&Coll::from_db(db), &counters, config).await?;
    Ok(())
}

#[cfg(test)]
mod examples {
    use super::*;

    impl Config {
        pub fn example() -> Self {
            Self {
                auth_ttl: 600,
                admin_username: "decide".to_string(),
                jwt_secret: "example-secret".to_string(),
                admin_password: "decide".to_string(),
            }
        }
    }
}
