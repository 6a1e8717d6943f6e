use rocket::serde::json::Json;
use rocket::{Build, Rocket, Route};

pub mod listings;
pub mod matches;
pub mod swipes;
pub mod users;

use listings::*;
use matches::*;
use swipes::*;
use users::*;

use crate::resp::jwt::AuthToken;
use crate::resp::problem::problems;
use crate::resp::problem::Problem;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

/// Liveness probe, also used by clients to pick a reachable endpoint.
#[get("/health")]
pub fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
    })
}

#[inline]
pub(crate) fn require_student(auth: &AuthToken) -> Result<(), Problem> {
    if auth.faculty {
        return Err(problems::forbidden("Only students can do this."));
    }
    Ok(())
}

#[inline]
pub(crate) fn require_faculty(auth: &AuthToken) -> Result<(), Problem> {
    if !auth.faculty {
        return Err(problems::forbidden("Only faculty can do this."));
    }
    Ok(())
}

pub fn api_v1() -> Vec<Route> {
    routes![
        register,
        login_submit,
        user_me,
        user_profile_update,
        user_get,
        user_delete,
        listing_create,
        listings_browse,
        listings_faculty,
        listings_filter,
        listings_batch,
        listing_get,
        listing_update,
        listing_delete,
        swipe_create,
        swipe_update,
        swipe_respond,
        swipe_history,
        swipe_history_detailed,
        matches_student,
        matches_faculty,
    ]
}

pub fn mount_api(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .mount("/api/v1", api_v1())
        .mount("/", routes![health])
}
