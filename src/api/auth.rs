use log::{debug, info};
use rocket::{
    form::Form,
    http::{Cookie, CookieJar, Status},
    response::{content::RawHtml, Redirect},
    serde::json::Json,
    Route, State,
};

use crate::{
    error::{Error, Result},
    model::{
        api::auth::{AuthToken, Credentials, TokenKey, UserProfile, AUTH_TOKEN_COOKIE},
        db::{token::ApiToken, user::User},
        form::{
            registration::{RegistrationForm, USERNAME_TAKEN},
            FieldErrors, Validate,
        },
        mongodb::{is_duplicate_key_error, Coll, Counter},
    },
    view::{registration_page, FormResponse},
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![registration, register, login, get_user, logout]
}

pub const BAD_CREDENTIALS: &str = "Unable to log in with provided credentials.";

#[get("/")]
fn registration() -> RawHtml<String> {
    registration_page(&RegistrationForm::default(), &FieldErrors::default())
}

/// Sign up from the browser form, logging the new user straight in.
#[post("/", data = "<form>")]
async fn register(
    form: Form<RegistrationForm>,
    users: Coll<User>,
    counters: Coll<Counter>,
    cookies: &CookieJar<'_>,
    config: &State<Config>,
) -> Result<FormResponse> {
    let rejected = |errors: FieldErrors| -> Result<FormResponse> {
        debug!("Rejected registration: {errors}");
        Ok(FormResponse::Page(registration_page(&form, &errors)))
    };
    let taken = || {
        let mut errors = FieldErrors::default();
        errors.add("username", USERNAME_TAKEN);
        errors
    };

    let new_user = match form.validate() {
        Ok(new_user) => new_user,
        Err(errors) => return rejected(errors),
    };
    if User::find_by_username(&users, &new_user.username)
        .await?
        .is_some()
    {
        return rejected(taken());
    }

    let user = match User::insert(
        &users,
        &counters,
        &new_user.username,
        &new_user.email,
        &new_user.password,
        false,
    )
    .await
    {
        Ok(user) => user,
        Err(Error::Db(err)) if is_duplicate_key_error(&err) => return rejected(taken()),
        Err(err) => return Err(err),
    };

    cookies.add(AuthToken::new(&user).into_cookie(config)?);
    Ok(FormResponse::Redirect(Redirect::found("/")))
}

/// Exchange credentials for the user's API token. Also starts a session.
#[post("/login", data = "<credentials>")]
async fn login(
    credentials: Json<Credentials>,
    users: Coll<User>,
    tokens: Coll<ApiToken>,
    cookies: &CookieJar<'_>,
    config: &State<Config>,
) -> Result<Json<TokenKey>> {
    let user = User::find_by_username(&users, &credentials.username)
        .await?
        .filter(|user| user.verify_password(&credentials.password))
        .ok_or_else(|| Error::bad_request(BAD_CREDENTIALS))?;

    let token = ApiToken::get_or_create(&tokens, user.id).await?;
    cookies.add(AuthToken::new(&user).into_cookie(config)?);
    info!("{} {} logged in", user.rights(), user.username);

    Ok(Json(TokenKey { token: token.key }))
}

#[post("/getuser", data = "<key>")]
async fn get_user(
    key: Json<TokenKey>,
    tokens: Coll<ApiToken>,
    users: Coll<User>,
) -> Result<Json<UserProfile>> {
    let not_found = || Error::Status(Status::NotFound, "Not found.".to_string());
    let token = ApiToken::find(&tokens, &key.token)
        .await?
        .ok_or_else(not_found)?;
    let user = User::find(&users, token.user_id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(user.into()))
}

/// End the session, revoking the given API token if any.
#[post("/logout", data = "<key>")]
async fn logout(
    key: Option<Json<TokenKey>>,
    tokens: Coll<ApiToken>,
    cookies: &CookieJar<'_>,
) -> Result<Redirect> {
    if let Some(key) = key {
        if ApiToken::revoke(&tokens, &key.token).await? {
            debug!("Revoked API token on logout");
        }
    }
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Ok(Redirect::found("/"))
}

#[cfg(test)]
mod tests {
    use mongodb::bson::doc;
    use rocket::{
        http::{ContentType, Header},
        local::asynchronous::Client,
        serde::json::serde_json::json,
    };

    use super::*;
    use crate::model::form::registration::PASSWORD_MISMATCH;

    fn registration_body(username: &str, password1: &str, password2: &str) -> String {
        format!(
            "username={username}&email={username}%40example.com&password1={password1}&password2={password2}"
        )
    }

    #[backend_test]
    async fn registration_form_renders(client: Client) {
        let response = client.get(uri!(registration)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(Some(ContentType::HTML), response.content_type());
        let html = response.into_string().await.unwrap();
        assert!(html.contains("name=\"password2\""));
    }

    #[backend_test]
    async fn register_valid(client: Client, users: Coll<User>) {
        let response = client
            .post(uri!(register))
            .header(ContentType::Form)
            .body(registration_body("ana", "decide-pass-1", "decide-pass-1"))
            .dispatch()
            .await;

        assert_eq!(Status::Found, response.status());
        assert_eq!(Some("/"), response.headers().get_one("Location"));
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());

        let user = User::find_by_username(&users, "ana").await.unwrap().unwrap();
        assert_eq!(user.email, "ana@example.com");
        assert!(!user.is_staff);
        assert!(user.verify_password("decide-pass-1"));
    }

    #[backend_test]
    async fn register_mismatched_passwords(client: Client, users: Coll<User>) {
        let response = client
            .post(uri!(register))
            .header(ContentType::Form)
            .body(registration_body("ana", "decide-pass-1", "decide-pass-2"))
            .dispatch()
            .await;

        assert_eq!(Status::Ok, response.status());
        let html = response.into_string().await.unwrap();
        assert!(html.contains(&crate::view::escape(PASSWORD_MISMATCH)));
        assert!(html.contains("value=\"ana\""));
        assert_eq!(None, client.cookies().get(AUTH_TOKEN_COOKIE));
        assert!(User::find_by_username(&users, "ana")
            .await
            .unwrap()
            .is_none());
    }

    #[backend_test]
    async fn register_taken_username(client: Client, users: Coll<User>) {
        let response = client
            .post(uri!(register))
            .header(ContentType::Form)
            .body(registration_body("decide", "decide-pass-1", "decide-pass-1"))
            .dispatch()
            .await;

        assert_eq!(Status::Ok, response.status());
        let html = response.into_string().await.unwrap();
        assert!(html.contains(USERNAME_TAKEN));
        let count = users
            .count_documents(doc! { "username": "decide" }, None)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[backend_test]
    async fn login_valid(client: Client, tokens: Coll<ApiToken>) {
        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(json!({ "username": "decide", "password": "decide" }).to_string())
            .dispatch()
            .await;

        assert_eq!(Status::Ok, response.status());
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());
        let key: TokenKey = response.into_json().await.unwrap();
        assert!(ApiToken::find(&tokens, &key.token).await.unwrap().is_some());

        // Logging in again hands back the same token.
        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(json!({ "username": "decide", "password": "decide" }).to_string())
            .dispatch()
            .await;
        let again: TokenKey = response.into_json().await.unwrap();
        assert_eq!(key, again);
    }

    #[backend_test]
    async fn login_invalid(client: Client) {
        for (username, password) in [("decide", "wrong"), ("nobody", "decide")] {
            let response = client
                .post(uri!(login))
                .header(ContentType::JSON)
                .body(json!({ "username": username, "password": password }).to_string())
                .dispatch()
                .await;
            assert_eq!(Status::BadRequest, response.status());
        }
        assert_eq!(None, client.cookies().get(AUTH_TOKEN_COOKIE));
    }

    #[backend_test]
    async fn get_user_by_token(client: Client, users: Coll<User>, tokens: Coll<ApiToken>) {
        let admin = User::find_by_username(&users, "decide")
            .await
            .unwrap()
            .unwrap();
        let token = ApiToken::get_or_create(&tokens, admin.id).await.unwrap();

        let response = client
            .post(uri!(get_user))
            .header(ContentType::JSON)
            .body(json!({ "token": token.key }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let profile: UserProfile = response.into_json().await.unwrap();
        assert_eq!(profile, UserProfile::from(admin));

        let response = client
            .post(uri!(get_user))
            .header(ContentType::JSON)
            .body(json!({ "token": "unknown" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(admin)]
    async fn logout_revokes(client: Client, tokens: Coll<ApiToken>) {
        let token = tokens.find_one(None, None).await.unwrap().unwrap();
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());

        let response = client
            .post(uri!(logout))
            .header(ContentType::JSON)
            .body(json!({ "token": token.key }).to_string())
            .dispatch()
            .await;

        assert_eq!(Status::Found, response.status());
        assert_eq!(None, client.cookies().get(AUTH_TOKEN_COOKIE));
        assert_eq!(None, ApiToken::find(&tokens, &token.key).await.unwrap());

        // The revoked token no longer authenticates.
        let response = client
            .get("/census?voting_id=1")
            .header(Header::new("Authorization", format!("Token {}", token.key)))
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
    }

    #[backend_test]
    async fn logout_not_logged_in(client: Client) {
        let response = client.post(uri!(logout)).dispatch().await;
        assert_eq!(Status::Found, response.status());
    }

    #[backend_test(admin)]
    async fn stale_session_rejected(client: Client, users: Coll<User>) {
        // Demote the admin behind the session cookie.
        users
            .update_one(
                doc! { "username": "decide" },
                doc! { "$set": { "is_staff": false } },
                None,
            )
            .await
            .unwrap();

        let response = client.get("/census?voting_id=1").dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());
    }
}
