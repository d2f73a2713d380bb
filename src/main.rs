use log::{error, info, LevelFilter};
use rocket::Error as RocketError;
use thiserror::Error;

/// Failures that stop the census service from starting or keep it from serving.
#[derive(Debug, Error)]
enum StartupError {
    #[error("census service failed: {0}")]
    Rocket(#[from] RocketError),
}

async fn serve() -> Result<(), StartupError> {
    info!("Connecting to the census database...");
    let rocket = decide_census::build().ignite().await?;
    info!("...census, auth and petition routes ready");
    // Rocket's own logging is only useful during launch.
    log4rs_dynamic_filters::DynamicLevelFilter::set("rocket", LevelFilter::Off);
    rocket.launch().await?;
    Ok(())
}

#[rocket::main]
async fn main() {
    log4rs::init_file("log4rs.yaml", log4rs_dynamic_filters::default_deserializers())
        .expect("log4rs.yaml must be a valid logging config");

    if let Err(err) = serve().await {
        error!("{err}");
        error!("Shutting down the census service");
        std::process::exit(1)
    }
}
