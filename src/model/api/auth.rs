use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use log::debug;
use mongodb::Database;
use rocket::{
    http::{Cookie, SameSite, Status},
    outcome::try_outcome,
    request::{FromRequest, Outcome},
    time::Duration,
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    error::{Error, Result},
    model::{
        db::{
            token::ApiToken,
            user::{Rights, User, UserId},
        },
        mongodb::Coll,
    },
};

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// Scheme prefix of the `Authorization` header carrying an API token.
pub const TOKEN_SCHEME: &str = "Token ";

pub const NOT_AUTHENTICATED: &str = "Authentication credentials were not provided.";
pub const INVALID_TOKEN: &str = "Invalid token.";
pub const PERMISSION_DENIED: &str = "You do not have permission to perform this action.";

/// A session token representing a specific user with specific rights.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    pub id: UserId,
    #[serde(rename = "rgt")]
    pub rights: Rights,
}

impl AuthToken {
    pub fn new(user: &User) -> Self {
        Self {
            id: user.id,
            rights: user.rights(),
        }
    }

    /// Sign this token into a session cookie.
    pub fn into_cookie(self, config: &Config) -> Result<Cookie<'static>> {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + config.auth_ttl(),
        };

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )?;

        Ok(Cookie::build(AUTH_TOKEN_COOKIE, token)
            .path("/")
            .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish())
    }

    /// Verify and decode a session cookie.
    pub fn from_cookie(cookie: &Cookie<'_>, config: &Config) -> Result<Self> {
        let token = jsonwebtoken::decode(
            cookie.value(),
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims>| claims.claims.token)?;
        Ok(token)
    }
}

/// Cookie claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims {
    #[serde(flatten)]
    token: AuthToken,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

/// The authenticated user behind a request.
///
/// Resolved from an `Authorization: Token <key>` header if present, else from
/// the session cookie. Fails with 401 if neither identifies a user.
#[derive(Debug, Clone)]
pub struct Actor(pub User);

impl Actor {
    async fn from_api_token(db: &Database, key: &str) -> Result<Option<User>> {
        let Some(token) = ApiToken::find(&Coll::from_db(db), key).await? else {
            return Ok(None);
        };
        User::find(&Coll::from_db(db), token.user_id).await
    }

    async fn from_session(db: &Database, token: AuthToken) -> Result<Option<User>> {
        let user = User::find(&Coll::from_db(db), token.id).await?;
        // Rights recorded at login must still hold.
        Ok(user.filter(|user| user.rights() == token.rights))
    }
}

/// Why a request failed to authenticate, kept for the 401 catcher.
#[derive(Debug, Clone, Copy)]
pub struct AuthFailure(pub &'static str);

fn unauthorized<T>(req: &Request<'_>, detail: &'static str) -> Outcome<T, Error> {
    req.local_cache(|| AuthFailure(detail));
    Outcome::Failure((Status::Unauthorized, Error::unauthorized(detail)))
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Actor {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwrap is safe as `Config` and `Database` are always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();
        let db = req.guard::<&State<Database>>().await.unwrap();

        let header = req
            .headers()
            .get_one("Authorization")
            .and_then(|value| value.strip_prefix(TOKEN_SCHEME));
        let user = if let Some(key) = header {
            Actor::from_api_token(db, key.trim()).await
        } else if let Some(cookie) = req.cookies().get(AUTH_TOKEN_COOKIE) {
            match AuthToken::from_cookie(cookie, config) {
                Ok(token) => Actor::from_session(db, token).await,
                Err(err) => {
                    debug!("Rejected session cookie: {err}");
                    return unauthorized(req, INVALID_TOKEN);
                }
            }
        } else {
            return unauthorized(req, NOT_AUTHENTICATED);
        };

        match user {
            Ok(Some(user)) => Outcome::Success(Actor(user)),
            Ok(None) => unauthorized(req, INVALID_TOKEN),
            Err(err) => Outcome::Failure((err.status(), err)),
        }
    }
}

/// An authenticated staff user. Fails with 401 if unauthenticated, then with
/// 403 if the user is not staff.
#[derive(Debug, Clone)]
pub struct Admin(pub User);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Admin {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Actor(user) = try_outcome!(req.guard::<Actor>().await);
        if user.is_staff {
            Outcome::Success(Admin(user))
        } else {
            Outcome::Failure((Status::Forbidden, Error::forbidden(PERMISSION_DENIED)))
        }
    }
}

/// Username and password, as posted to the login endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// An API token key, both as returned by login and as accepted by
/// `getuser` and `logout`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenKey {
    pub token: String,
}

/// Public view of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub is_staff: bool,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            is_staff: user.is_staff,
        }
    }
}
