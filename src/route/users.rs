use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use uuid::Uuid;

use crate::config::Config;
use crate::data::user::db::problem as user_problem;
use crate::data::user::db::{ProfileUpdate, UserDbExt, UserLoginData, UserSignupData};
use crate::data::user::{PublicProfile, UserResponse};
use crate::resp::jwt::AuthToken;
use crate::resp::problem::Problem;
use crate::security::Security;

/// Issued on both signup and login so clients never need a second
/// round trip to fetch the account they just authenticated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

/// Profile view; students and unauthenticated-adjacent lookups get the
/// public subset, faculty see the full profile of students who may have
/// swiped on their listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProfileView {
    Full(UserResponse),
    Public(PublicProfile),
}

#[post("/register", data = "<signup>")]
#[tracing::instrument(skip(db, config, security))]
pub async fn register(
    signup: Json<UserSignupData>,
    db: &State<Database>,
    config: &State<Config>,
    security: &State<Security>,
) -> Result<Json<LoginResponse>, Problem> {
    signup.validate()?;

    let user = db.create_user(signup.into_inner(), &security.salt).await?;

    let token = AuthToken::new(&user, config.token_lifetime_hours)
        .encode_jwt(&security.token_secret)?;

    Ok(Json(LoginResponse {
        token,
        user: UserResponse::from(user),
    }))
}

#[post("/login", data = "<login>")]
#[tracing::instrument(skip(db, config, security))]
pub async fn login_submit(
    login: Json<UserLoginData>,
    db: &State<Database>,
    config: &State<Config>,
    security: &State<Security>,
) -> Result<Json<LoginResponse>, Problem> {
    let user = db
        .find_user_by_email(&login.email)
        .await?
        .ok_or_else(user_problem::bad_login)?;

    if !user.verify_password(&login.password, &security.salt) {
        return Err(user_problem::bad_login());
    }

    let token = AuthToken::new(&user, config.token_lifetime_hours)
        .encode_jwt(&security.token_secret)?;

    Ok(Json(LoginResponse {
        token,
        user: UserResponse::from(user),
    }))
}

#[get("/user")]
#[tracing::instrument(skip(db))]
pub async fn user_me(auth: AuthToken, db: &State<Database>) -> Result<Json<UserResponse>, Problem> {
    let user = db
        .get_user(auth.user)
        .await?
        .ok_or_else(|| user_problem::not_found(auth.user))?;

    Ok(Json(UserResponse::from(user)))
}

#[put("/user/profile", data = "<update>")]
#[tracing::instrument(skip(db))]
pub async fn user_profile_update(
    update: Json<ProfileUpdate>,
    auth: AuthToken,
    db: &State<Database>,
) -> Result<Json<UserResponse>, Problem> {
    update.validate(auth.faculty)?;

    let user = db
        .update_profile(auth.user, update.into_inner())
        .await?
        .ok_or_else(|| user_problem::not_found(auth.user))?;

    Ok(Json(UserResponse::from(user)))
}

#[get("/user/<id>")]
#[tracing::instrument(skip(db))]
pub async fn user_get(
    id: Uuid,
    auth: AuthToken,
    db: &State<Database>,
) -> Result<Json<ProfileView>, Problem> {
    let user = db
        .get_user(id)
        .await?
        .ok_or_else(|| user_problem::not_found(id))?;

    // Faculty reviewing candidates see the student's whole profile.
    let view = if auth.user == id || (auth.faculty && !user.faculty) {
        ProfileView::Full(UserResponse::from(user))
    } else {
        ProfileView::Public(PublicProfile::from(&user))
    };

    Ok(Json(view))
}

#[delete("/user/<id>")]
#[tracing::instrument(skip(db))]
pub async fn user_delete(
    id: Uuid,
    auth: AuthToken,
    db: &State<Database>,
) -> Result<Json<Uuid>, Problem> {
    if auth.user != id {
        return Err(crate::resp::problem::problems::forbidden(
            "Accounts can only be deleted by their owner.",
        ));
    }

    let removed = db
        .delete_user(id)
        .await?
        .ok_or_else(|| user_problem::not_found(id))?;

    Ok(Json(removed.id))
}

///////////////////////
//       TESTS
///////////////////////

#[cfg(test)]
mod user_endpoints {
    use mongodb::Database;
    use rocket::http::{ContentType, Header, Status};
    use rocket::local::asynchronous::Client;

    use super::LoginResponse;
    use crate::data::user::db::UserDbExt;

    fn signup_body(user: &str) -> String {
        format!(
            r#"{{"name":"{}","email":"{}@example.com","password":"{}-password"}}"#,
            user, user, user
        )
    }

    fn login_body(user: &str) -> String {
        format!(
            r#"{{"email":"{}@example.com","password":"{}-password"}}"#,
            user, user
        )
    }

    async fn client() -> Client {
        Client::tracked(crate::create(None).await.expect("invalid backend"))
            .await
            .expect("invalid backend")
    }

    #[rocket::async_test]
    #[ignore = "requires a running MongoDB instance"]
    async fn v1_register_works() {
        let client = client().await;
        let db: &Database = client.rocket().state().unwrap();

        let response = client
            .post("/api/v1/register")
            .header(ContentType::JSON)
            .body(signup_body("v1_register_works"))
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok, "an ok response");
        let data: LoginResponse = response.into_json().await.expect("invalid response json");
        assert!(!data.token.is_empty());
        assert!(!data.user.faculty);

        db.delete_user(data.user.id)
            .await
            .expect("unable to delete test user");
    }

    #[rocket::async_test]
    #[ignore = "requires a running MongoDB instance"]
    async fn v1_register_then_login_works() {
        let client = client().await;
        let db: &Database = client.rocket().state().unwrap();

        let created: LoginResponse = client
            .post("/api/v1/register")
            .header(ContentType::JSON)
            .body(signup_body("v1_register_then_login_works"))
            .dispatch()
            .await
            .into_json()
            .await
            .expect("invalid register response");

        let response = client
            .post("/api/v1/login")
            .header(ContentType::JSON)
            .body(login_body("v1_register_then_login_works"))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok, "an ok response");

        let data: LoginResponse = response.into_json().await.expect("invalid response json");
        assert_eq!(data.user.id, created.user.id);

        db.delete_user(data.user.id)
            .await
            .expect("unable to delete test user");
    }

    #[rocket::async_test]
    #[ignore = "requires a running MongoDB instance"]
    async fn v1_login_rejects_wrong_password() {
        let client = client().await;
        let db: &Database = client.rocket().state().unwrap();

        let created: LoginResponse = client
            .post("/api/v1/register")
            .header(ContentType::JSON)
            .body(signup_body("v1_login_rejects_wrong_password"))
            .dispatch()
            .await
            .into_json()
            .await
            .expect("invalid register response");

        let response = client
            .post("/api/v1/login")
            .header(ContentType::JSON)
            .body(r#"{"email":"v1_login_rejects_wrong_password@example.com","password":"nope"}"#)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Unauthorized);

        db.delete_user(created.user.id)
            .await
            .expect("unable to delete test user");
    }

    #[rocket::async_test]
    #[ignore = "requires a running MongoDB instance"]
    async fn v1_user_me_requires_token() {
        let client = client().await;

        let response = client.get("/api/v1/user").dispatch().await;
        assert_eq!(response.status(), Status::Unauthorized);
    }

    #[rocket::async_test]
    #[ignore = "requires a running MongoDB instance"]
    async fn v1_user_me_returns_own_account() {
        let client = client().await;
        let db: &Database = client.rocket().state().unwrap();

        let created: LoginResponse = client
            .post("/api/v1/register")
            .header(ContentType::JSON)
            .body(signup_body("v1_user_me_returns_own_account"))
            .dispatch()
            .await
            .into_json()
            .await
            .expect("invalid register response");

        let response = client
            .get("/api/v1/user")
            .header(Header::new("Authorization", format!("Bearer {}", created.token)))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let me: crate::data::user::UserResponse =
            response.into_json().await.expect("invalid response json");
        assert_eq!(me.id, created.user.id);

        db.delete_user(created.user.id)
            .await
            .expect("unable to delete test user");
    }
}
