use rocket::{Catcher, Route};

mod auth;
mod catchers;
mod census;
mod export;
mod groups;
mod petition;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(census::routes());
    routes.extend(groups::routes());
    routes.extend(export::routes());
    routes.extend(petition::routes());
    routes
}

pub fn catchers() -> Vec<Catcher> {
    catchers::catchers()
}
