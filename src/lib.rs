#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod view;

pub use config::Config;

use config::{ConfigFairing, DatabaseFairing};
use logging::LoggerFairing;

/// Assemble the server: configuration, database connection, routes and catchers.
pub fn build() -> Rocket<Build> {
    mount(rocket::build())
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
}

/// Attach everything that does not depend on where the database lives.
fn mount(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .attach(LoggerFairing)
        .mount("/", api::routes())
        .register("/", api::catchers())
}

/// Connect to the test database server, or `None` if it cannot be reached.
#[cfg(test)]
pub(crate) async fn test_db_client() -> Option<mongodb::Client> {
    use mongodb::{bson::doc, options::ClientOptions};
    use std::time::Duration;

    let db_uri = rocket::Config::figment()
        .extract_inner::<String>("db_uri")
        .ok()?;
    let mut options = ClientOptions::parse(&db_uri).await.ok()?;
    options.server_selection_timeout = Some(Duration::from_secs(2));
    let client = mongodb::Client::with_options(options).ok()?;
    client
        .database("admin")
        .run_command(doc! { "ping": 1 }, None)
        .await
        .ok()?;
    Some(client)
}

/// Set to let database tests pass when no server is reachable.
#[cfg(test)]
pub(crate) const SKIP_DB_TESTS: &str = "DECIDE_SKIP_DB_TESTS";

/// Called when a database test cannot reach MongoDB. Fails the test unless
/// skipping was requested.
#[cfg(test)]
pub(crate) fn missing_database(test: &str, skip: Option<std::ffi::OsString>) {
    match skip {
        Some(_) => eprintln!("skipping {test}: no MongoDB server reachable"),
        None => panic!("{test}: no MongoDB server reachable at `db_uri`; set {SKIP_DB_TESTS} to skip"),
    }
}

/// Build a server backed by the named database on an existing connection.
#[cfg(test)]
pub(crate) async fn rocket_for_db(db_client: mongodb::Client, db_name: &str) -> Rocket<Build> {
    let rocket = rocket::build();
    let config = rocket
        .figment()
        .extract::<Config>()
        .expect("test configuration is valid");
    let db = db_client.database(db_name);
    config::prepare_database(&db, &config)
        .await
        .expect("test database can be prepared");
    mount(rocket).manage(config).manage(db_client).manage(db)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "no MongoDB server reachable")]
    fn missing_database_fails_by_default() {
        missing_database("census_exports", None);
    }

    #[test]
    fn missing_database_skips_on_request() {
        missing_database("census_exports", Some("1".into()));
    }
}
