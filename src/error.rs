use std::fmt::Display;

use argon2::Error as Argon2Error;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use log::{debug, error};
use mongodb::error::Error as DbError;
use rocket::{
    http::Status,
    response::{self, status, Responder},
    serde::json::Json,
    Request,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::form::FieldErrors;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("Invalid input: {0}")]
    Validation(FieldErrors),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    pub fn not_found(what: impl Display) -> Self {
        Self::Status(Status::NotFound, format!("{what} not found"))
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::Status(Status::BadRequest, detail.into())
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::Status(Status::Unauthorized, detail.into())
    }

    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::Status(Status::Forbidden, detail.into())
    }

    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::Status(Status::Conflict, detail.into())
    }

    /// The HTTP status this error is reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::Db(_) | Self::Argon2(_) | Self::Csv(_) => Status::InternalServerError,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::BadRequest,
            },
            Self::Validation(_) => Status::BadRequest,
            Self::Status(status, _) => *status,
        }
    }
}

/// Error body shape shared with the catchers.
#[derive(Debug, Serialize, Deserialize)]
pub struct Detail {
    pub detail: String,
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        match self {
            Self::Validation(errors) => {
                debug!("Rejected invalid input: {errors}");
                status::Custom(status, Json(errors.to_map())).respond_to(req)
            }
            err if status.code >= 500 => {
                error!("{err}");
                let detail = "An internal server error occurred.".to_string();
                status::Custom(status, Json(Detail { detail })).respond_to(req)
            }
            err => {
                debug!("{err}");
                let detail = err.to_string();
                status::Custom(status, Json(Detail { detail })).respond_to(req)
            }
        }
    }
}
