use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rocket::http::Status;
use rocket::outcome::Outcome::{Error, Success};
use rocket::request::{self, FromRequest, Request};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::util::date_time_as_unix_seconds;
use crate::data::user::User;
use crate::resp::problem::Problem;
use crate::security::Security;

pub static AUTH_HEADER_NAME: &str = "Authorization";

/// Claims carried by an issued auth token.
///
/// Extracted and validated (including expiry) on every request instead of
/// being cached in any session state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthToken {
    #[serde(with = "date_time_as_unix_seconds")]
    iat: DateTime<Utc>,
    #[serde(with = "date_time_as_unix_seconds")]
    exp: DateTime<Utc>,
    pub user: Uuid,
    pub faculty: bool,
}

impl AuthToken {
    pub fn new(user: &User, lifetime_hours: i64) -> AuthToken {
        let now = Utc::now();
        AuthToken {
            iat: now,
            exp: now + Duration::hours(lifetime_hours),
            user: user.id,
            faculty: user.faculty,
        }
    }

    pub fn encode_jwt(
        &self,
        secret: impl AsRef<[u8]>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        encode(
            &Header::default(),
            &self,
            &EncodingKey::from_secret(secret.as_ref()),
        )
    }
}

pub fn auth_missing() -> Problem {
    Problem::with_code(
        Status::Unauthorized,
        "AUTH_MISSING",
        "No authorization token provided.",
    )
}

pub fn auth_invalid(detail: impl ToString) -> Problem {
    Problem::with_code(Status::Unauthorized, "AUTH_INVALID", "Unable to authorize user.")
        .detail(detail)
        .clone()
}

/// Strips the scheme prefix off an `Authorization` header value.
///
/// Observed clients send `Bearer <token>`, `bearer <token>`, `TOKEN <token>`
/// and the raw token with no prefix at all; all four are accepted.
pub fn strip_token_scheme(header: &str) -> &str {
    for prefix in ["Bearer ", "bearer ", "TOKEN "] {
        if let Some(rest) = header.strip_prefix(prefix) {
            return rest;
        }
    }
    header
}

pub fn extract_claims(
    header: Option<&str>,
    secret: impl AsRef<[u8]>,
) -> Result<AuthToken, Problem> {
    let token = match header {
        Some(value) => strip_token_scheme(value),
        None => return Err(auth_missing()),
    };

    match decode::<AuthToken>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    ) {
        Ok(data) => {
            tracing::debug!("decoded auth token for user: {}", data.claims.user);
            Ok(data.claims)
        }
        Err(e) => Err(Problem::from(e)),
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthToken {
    type Error = Problem;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let security: &Security = req.rocket().state().unwrap();

        let header = req.headers().get_one(AUTH_HEADER_NAME);
        match extract_claims(header, &security.token_secret) {
            Ok(claims) => Success(claims),
            Err(e) => {
                tracing::debug!("unable to extract claims from Authorization header");
                Error((Status::Unauthorized, e))
            }
        }
    }
}
