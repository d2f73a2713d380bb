use rocket::{serde::json::Json, Catcher, Request};

use crate::error::Detail;
use crate::model::api::auth::{AuthFailure, NOT_AUTHENTICATED, PERMISSION_DENIED};

pub fn catchers() -> Vec<Catcher> {
    catchers![
        bad_request,
        unauthorized,
        forbidden,
        not_found,
        unprocessable,
        internal_error
    ]
}

fn detail(message: &str) -> Json<Detail> {
    Json(Detail {
        detail: message.to_string(),
    })
}

#[catch(400)]
fn bad_request(_req: &Request) -> Json<Detail> {
    detail("Malformed request.")
}

#[catch(401)]
fn unauthorized(req: &Request) -> Json<Detail> {
    detail(req.local_cache(|| AuthFailure(NOT_AUTHENTICATED)).0)
}

#[catch(403)]
fn forbidden(_req: &Request) -> Json<Detail> {
    detail(PERMISSION_DENIED)
}

#[catch(404)]
fn not_found(_req: &Request) -> Json<Detail> {
    detail("Not found.")
}

#[catch(422)]
fn unprocessable(_req: &Request) -> Json<Detail> {
    detail("Request body could not be understood.")
}

#[catch(500)]
fn internal_error(_req: &Request) -> Json<Detail> {
    detail("An internal server error occurred.")
}
