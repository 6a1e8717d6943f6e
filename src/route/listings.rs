use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use uuid::Uuid;

use crate::data::listing::db::problem as listing_problem;
use crate::data::listing::db::{ListingDbExt, ListingQuery};
use crate::data::listing::{Listing, ListingUpdate, ListingWithFaculty, NewListing};
use crate::resp::jwt::AuthToken;
use crate::resp::problem::problems;
use crate::resp::problem::Problem;
use crate::route::{require_faculty, require_student};

#[post("/listings", data = "<listing>")]
#[tracing::instrument(skip(db))]
pub async fn listing_create(
    listing: Json<NewListing>,
    auth: AuthToken,
    db: &State<Database>,
) -> Result<Json<Listing>, Problem> {
    require_faculty(&auth)?;
    listing.validate()?;

    let created = db
        .create_listing(listing.into_inner().into_listing(auth.user))
        .await?;

    Ok(Json(created))
}

/// The student's deck: active listings they haven't swiped on yet,
/// newest first.
#[get("/listings")]
#[tracing::instrument(skip(db))]
pub async fn listings_browse(
    auth: AuthToken,
    db: &State<Database>,
) -> Result<Json<Vec<ListingWithFaculty>>, Problem> {
    require_student(&auth)?;

    let listings = db.listings_for_student(auth.user).await?;
    Ok(Json(db.attach_faculty(listings).await?))
}

#[get("/listings/faculty")]
#[tracing::instrument(skip(db))]
pub async fn listings_faculty(
    auth: AuthToken,
    db: &State<Database>,
) -> Result<Json<Vec<Listing>>, Problem> {
    require_faculty(&auth)?;

    Ok(Json(db.listings_by_faculty(auth.user).await?))
}

#[get("/listings/filter?<query..>")]
#[tracing::instrument(skip(db))]
pub async fn listings_filter(
    query: ListingQuery,
    _auth: AuthToken,
    db: &State<Database>,
) -> Result<Json<Vec<ListingWithFaculty>>, Problem> {
    let listings = db.filter_listings(&query).await?;
    Ok(Json(db.attach_faculty(listings).await?))
}

/// Bulk lookup for client-side caches; `ids` is comma separated.
#[get("/listings/batch?<ids>")]
#[tracing::instrument(skip(db))]
pub async fn listings_batch(
    ids: &str,
    _auth: AuthToken,
    db: &State<Database>,
) -> Result<Json<Vec<Listing>>, Problem> {
    let parsed: Vec<Uuid> = ids
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| Uuid::parse_str(part.trim()))
        .collect::<Result<_, _>>()
        .map_err(|_| problems::validation("ids must be comma separated UUIDs"))?;

    Ok(Json(db.listings_by_ids(&parsed).await?))
}

#[get("/listing/<id>")]
#[tracing::instrument(skip(db))]
pub async fn listing_get(
    id: Uuid,
    _auth: AuthToken,
    db: &State<Database>,
) -> Result<Json<ListingWithFaculty>, Problem> {
    let listing = db
        .get_listing(id)
        .await?
        .ok_or_else(|| listing_problem::not_found(id))?;

    let mut hydrated = db.attach_faculty(vec![listing]).await?;
    // attach_faculty preserves input length
    Ok(Json(hydrated.remove(0)))
}

#[put("/listing/<id>", data = "<update>")]
#[tracing::instrument(skip(db))]
pub async fn listing_update(
    id: Uuid,
    update: Json<ListingUpdate>,
    auth: AuthToken,
    db: &State<Database>,
) -> Result<Json<Listing>, Problem> {
    require_faculty(&auth)?;
    update.validate()?;

    match db.update_listing(id, auth.user, update.into_inner()).await? {
        Some(updated) => Ok(Json(updated)),
        // Exists-but-not-yours reads as forbidden, not absent.
        None => match db.get_listing_any(id).await? {
            Some(_) => Err(problems::forbidden(
                "Listings can only be edited by their owner.",
            )),
            None => Err(listing_problem::not_found(id)),
        },
    }
}

#[delete("/listing/<id>")]
#[tracing::instrument(skip(db))]
pub async fn listing_delete(
    id: Uuid,
    auth: AuthToken,
    db: &State<Database>,
) -> Result<Json<Uuid>, Problem> {
    require_faculty(&auth)?;

    if db.retire_listing(id, auth.user).await? {
        return Ok(Json(id));
    }

    match db.get_listing_any(id).await? {
        Some(_) => Err(problems::forbidden(
            "Listings can only be deleted by their owner.",
        )),
        None => Err(listing_problem::not_found(id)),
    }
}

///////////////////////
//       TESTS
///////////////////////

#[cfg(test)]
mod listing_endpoints {
    use rocket::http::{ContentType, Header, Status};
    use rocket::local::asynchronous::Client;

    use crate::route::users::LoginResponse;

    async fn client() -> Client {
        Client::tracked(crate::create(None).await.expect("invalid backend"))
            .await
            .expect("invalid backend")
    }

    async fn register(client: &Client, user: &str, faculty: bool) -> LoginResponse {
        let body = format!(
            r#"{{"name":"{}","email":"{}@example.com","password":"{}-password","faculty":{}}}"#,
            user, user, user, faculty
        );
        client
            .post("/api/v1/register")
            .header(ContentType::JSON)
            .body(body)
            .dispatch()
            .await
            .into_json()
            .await
            .expect("invalid register response")
    }

    fn listing_body() -> &'static str {
        r#"{
            "title": "Distributed systems research",
            "description": "Consensus protocol experiments.",
            "requirements": "Rust, networking basics",
            "duration": { "value": 3, "unit": "months" },
            "wage": { "type": "hourly", "amount": 17.0, "is_paid": true }
        }"#
    }

    #[rocket::async_test]
    #[ignore = "requires a running MongoDB instance"]
    async fn v1_students_cannot_create_listings() {
        let client = client().await;
        let student = register(&client, "v1_students_cannot_create_listings", false).await;

        let response = client
            .post("/api/v1/listings")
            .header(ContentType::JSON)
            .header(Header::new("Authorization", format!("Bearer {}", student.token)))
            .body(listing_body())
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Forbidden);
    }

    #[rocket::async_test]
    #[ignore = "requires a running MongoDB instance"]
    async fn v1_faculty_can_create_and_list_listings() {
        let client = client().await;
        let faculty = register(&client, "v1_faculty_can_create_and_list", true).await;
        let auth = Header::new("Authorization", format!("Bearer {}", faculty.token));

        let response = client
            .post("/api/v1/listings")
            .header(ContentType::JSON)
            .header(auth.clone())
            .body(listing_body())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let response = client
            .get("/api/v1/listings/faculty")
            .header(auth)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let listings: Vec<crate::data::listing::Listing> =
            response.into_json().await.expect("invalid response json");
        assert!(!listings.is_empty());
    }

    #[rocket::async_test]
    #[ignore = "requires a running MongoDB instance"]
    async fn v1_batch_skips_unknown_ids() {
        let client = client().await;
        let faculty = register(&client, "v1_batch_skips_unknown_f", true).await;
        let auth = Header::new("Authorization", format!("Bearer {}", faculty.token));

        let created: crate::data::listing::Listing = client
            .post("/api/v1/listings")
            .header(ContentType::JSON)
            .header(auth.clone())
            .body(listing_body())
            .dispatch()
            .await
            .into_json()
            .await
            .expect("invalid listing response");

        let unknown = uuid::Uuid::new_v4();
        let response = client
            .get(format!("/api/v1/listings/batch?ids={},{}", created.id, unknown))
            .header(auth)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let listings: Vec<crate::data::listing::Listing> =
            response.into_json().await.expect("invalid response json");
        assert_eq!(listings.len(), 1, "unknown ids must be skipped, not errors");
        assert_eq!(listings[0].id, created.id);
    }

    #[rocket::async_test]
    #[ignore = "requires a running MongoDB instance"]
    async fn v1_batch_rejects_malformed_ids() {
        let client = client().await;
        let student = register(&client, "v1_batch_rejects_malformed_ids", false).await;

        let response = client
            .get("/api/v1/listings/batch?ids=not-a-uuid")
            .header(Header::new("Authorization", format!("Bearer {}", student.token)))
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::BadRequest);
    }
}
