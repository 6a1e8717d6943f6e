use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use uuid::Uuid;

use crate::data::listing::db::{problem as listing_problem, ListingDbExt};
use crate::data::swipe::db::{problem as swipe_problem, SwipeDbExt};
use crate::data::swipe::{Swipe, SwipeOutcome, SwipeWithListing};
use crate::resp::jwt::AuthToken;
use crate::resp::problem::problems;
use crate::resp::problem::Problem;
use crate::route::{require_faculty, require_student};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwipeRequest {
    pub listing_id: Uuid,
    pub interested: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwipeUpdateRequest {
    pub swipe_id: Uuid,
    pub interested: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwipeRespondRequest {
    pub swipe_id: Uuid,
    pub accept: bool,
}

/// Records a swipe. Matches never form here; they require an explicit
/// faculty accept, so `is_match` is always false in this response.
#[post("/swipe", data = "<swipe>")]
#[tracing::instrument(skip(db))]
pub async fn swipe_create(
    swipe: Json<SwipeRequest>,
    auth: AuthToken,
    db: &State<Database>,
) -> Result<Json<SwipeOutcome>, Problem> {
    require_student(&auth)?;

    let request = swipe.into_inner();
    db.get_listing(request.listing_id)
        .await?
        .ok_or_else(|| listing_problem::not_found(request.listing_id))?;

    let recorded = db
        .record_swipe(Swipe::new(auth.user, request.listing_id, request.interested))
        .await?;

    Ok(Json(SwipeOutcome::from(&recorded)))
}

#[post("/swipe/update", data = "<update>")]
#[tracing::instrument(skip(db))]
pub async fn swipe_update(
    update: Json<SwipeUpdateRequest>,
    auth: AuthToken,
    db: &State<Database>,
) -> Result<Json<SwipeOutcome>, Problem> {
    require_student(&auth)?;

    let request = update.into_inner();
    match db
        .update_interest(request.swipe_id, auth.user, request.interested)
        .await?
    {
        Some(updated) => Ok(Json(SwipeOutcome::from(&updated))),
        None => match db.get_swipe(request.swipe_id).await? {
            Some(_) => Err(problems::forbidden(
                "Swipes can only be changed by the student who made them.",
            )),
            None => Err(swipe_problem::not_found(request.swipe_id)),
        },
    }
}

/// Faculty accept/reject on an interested swipe.
///
/// Earlier servers recorded a verdict on pass swipes too; here that is
/// a validation error, since a pass can never become a match and pass
/// swipes are never shown to faculty.
#[post("/swipe/respond", data = "<response>")]
#[tracing::instrument(skip(db))]
pub async fn swipe_respond(
    response: Json<SwipeRespondRequest>,
    auth: AuthToken,
    db: &State<Database>,
) -> Result<Json<SwipeOutcome>, Problem> {
    require_faculty(&auth)?;

    let request = response.into_inner();
    let swipe = db
        .get_swipe(request.swipe_id)
        .await?
        .ok_or_else(|| swipe_problem::not_found(request.swipe_id))?;

    // The listing may be retired by now; ownership still decides access.
    let listing = db
        .get_listing_any(swipe.listing_id)
        .await?
        .ok_or_else(|| listing_problem::not_found(swipe.listing_id))?;

    if listing.faculty_id != auth.user {
        return Err(problems::forbidden(
            "Swipes can only be answered by the listing owner.",
        ));
    }

    if !swipe.interested {
        return Err(problems::validation(
            "Only interested swipes can be responded to.",
        ));
    }

    let updated = db
        .set_response(request.swipe_id, request.accept)
        .await?
        .ok_or_else(|| swipe_problem::not_found(request.swipe_id))?;

    Ok(Json(SwipeOutcome::from(&updated)))
}

#[get("/swipes/history")]
#[tracing::instrument(skip(db))]
pub async fn swipe_history(
    auth: AuthToken,
    db: &State<Database>,
) -> Result<Json<Vec<Swipe>>, Problem> {
    require_student(&auth)?;

    Ok(Json(db.swipes_by_student(auth.user).await?))
}

#[get("/swipes/all")]
#[tracing::instrument(skip(db))]
pub async fn swipe_history_detailed(
    auth: AuthToken,
    db: &State<Database>,
) -> Result<Json<Vec<SwipeWithListing>>, Problem> {
    require_student(&auth)?;

    Ok(Json(db.swipes_with_listings(auth.user).await?))
}

///////////////////////
//       TESTS
///////////////////////
