use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;

use crate::data::swipe::db::SwipeDbExt;
use crate::data::swipe::{FacultyMatchGroup, StudentMatchView};
use crate::resp::jwt::AuthToken;
use crate::resp::problem::Problem;
use crate::route::{require_faculty, require_student};

/// Every interested swipe the student made, annotated with where the
/// faculty verdict stands.
#[get("/matches/student")]
#[tracing::instrument(skip(db))]
pub async fn matches_student(
    auth: AuthToken,
    db: &State<Database>,
) -> Result<Json<Vec<StudentMatchView>>, Problem> {
    require_student(&auth)?;

    Ok(Json(db.student_matches(auth.user).await?))
}

/// Interested students across the faculty member's listings, one group
/// per student.
#[get("/matches/faculty")]
#[tracing::instrument(skip(db))]
pub async fn matches_faculty(
    auth: AuthToken,
    db: &State<Database>,
) -> Result<Json<Vec<FacultyMatchGroup>>, Problem> {
    require_faculty(&auth)?;

    Ok(Json(db.faculty_matches(auth.user).await?))
}

///////////////////////
//       TESTS
///////////////////////

#[cfg(test)]
mod match_endpoints {
    use rocket::http::{ContentType, Header, Status};
    use rocket::local::asynchronous::Client;

    use crate::data::swipe::{StudentMatchView, SwipeStatus};
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

    #[rocket::async_test]
    #[ignore = "requires a running MongoDB instance"]
    async fn v1_student_matches_require_student_token() {
        let client = client().await;
        let faculty = register(&client, "v1_student_matches_need_student", true).await;

        let response = client
            .get("/api/v1/matches/student")
            .header(Header::new("Authorization", format!("Bearer {}", faculty.token)))
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Forbidden);
    }

    #[rocket::async_test]
    #[ignore = "requires a running MongoDB instance"]
    async fn v1_interested_swipe_shows_up_pending() {
        let client = client().await;
        let faculty = register(&client, "v1_pending_match_f", true).await;
        let student = register(&client, "v1_pending_match_s", false).await;

        let listing: crate::data::listing::Listing = client
            .post("/api/v1/listings")
            .header(ContentType::JSON)
            .header(Header::new("Authorization", format!("Bearer {}", faculty.token)))
            .body(
                r#"{
                    "title": "Compilers reading group",
                    "description": "Survey optimizing pass literature.",
                    "requirements": "One compilers course",
                    "duration": { "value": 1, "unit": "years" },
                    "wage": { "type": "hourly", "amount": 0.0, "is_paid": false }
                }"#,
            )
            .dispatch()
            .await
            .into_json()
            .await
            .expect("invalid listing response");

        let auth = Header::new("Authorization", format!("Bearer {}", student.token));
        client
            .post("/api/v1/swipe")
            .header(ContentType::JSON)
            .header(auth.clone())
            .body(format!(
                r#"{{"listing_id":"{}","interested":true}}"#,
                listing.id
            ))
            .dispatch()
            .await;

        let response = client
            .get("/api/v1/matches/student")
            .header(auth)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let matches: Vec<StudentMatchView> =
            response.into_json().await.expect("invalid response json");
        let entry = matches
            .iter()
            .find(|m| m.listing.id == listing.id)
            .expect("swiped listing missing from matches");
        assert_eq!(entry.status, SwipeStatus::Pending);
    }

    #[rocket::async_test]
    #[ignore = "requires a running MongoDB instance"]
    async fn v1_faculty_accept_promotes_match_to_accepted() {
        let client = client().await;
        let faculty = register(&client, "v1_accept_promotes_f", true).await;
        let student = register(&client, "v1_accept_promotes_s", false).await;

        let listing: crate::data::listing::Listing = client
            .post("/api/v1/listings")
            .header(ContentType::JSON)
            .header(Header::new("Authorization", format!("Bearer {}", faculty.token)))
            .body(
                r#"{
                    "title": "Robotics perception stack",
                    "description": "Tune sensor fusion pipelines.",
                    "requirements": "C++ or Rust, linear algebra",
                    "duration": { "value": 6, "unit": "months" },
                    "wage": { "type": "hourly", "amount": 20.0, "is_paid": true }
                }"#,
            )
            .dispatch()
            .await
            .into_json()
            .await
            .expect("invalid listing response");

        let student_auth = Header::new("Authorization", format!("Bearer {}", student.token));
        let outcome: crate::data::swipe::SwipeOutcome = client
            .post("/api/v1/swipe")
            .header(ContentType::JSON)
            .header(student_auth.clone())
            .body(format!(
                r#"{{"listing_id":"{}","interested":true}}"#,
                listing.id
            ))
            .dispatch()
            .await
            .into_json()
            .await
            .expect("invalid swipe response");

        let response = client
            .post("/api/v1/swipe/respond")
            .header(ContentType::JSON)
            .header(Header::new("Authorization", format!("Bearer {}", faculty.token)))
            .body(format!(r#"{{"swipe_id":"{}","accept":true}}"#, outcome.swipe_id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let matches: Vec<StudentMatchView> = client
            .get("/api/v1/matches/student")
            .header(student_auth)
            .dispatch()
            .await
            .into_json()
            .await
            .expect("invalid response json");

        let entry = matches
            .iter()
            .find(|m| m.listing.id == listing.id)
            .expect("accepted listing missing from matches");
        assert_eq!(entry.status, SwipeStatus::Accepted);
    }

    #[rocket::async_test]
    #[ignore = "requires a running MongoDB instance"]
    async fn v1_passed_listings_never_appear_in_matches() {
        let client = client().await;
        let faculty = register(&client, "v1_passed_not_in_matches_f", true).await;
        let student = register(&client, "v1_passed_not_in_matches_s", false).await;

        let listing: crate::data::listing::Listing = client
            .post("/api/v1/listings")
            .header(ContentType::JSON)
            .header(Header::new("Authorization", format!("Bearer {}", faculty.token)))
            .body(
                r#"{
                    "title": "Wet lab assistant",
                    "description": "Prep and catalog samples.",
                    "requirements": "Intro biology",
                    "duration": { "value": 10, "unit": "weeks" },
                    "wage": { "type": "monthly", "amount": 400.0, "is_paid": true }
                }"#,
            )
            .dispatch()
            .await
            .into_json()
            .await
            .expect("invalid listing response");

        let auth = Header::new("Authorization", format!("Bearer {}", student.token));
        client
            .post("/api/v1/swipe")
            .header(ContentType::JSON)
            .header(auth.clone())
            .body(format!(
                r#"{{"listing_id":"{}","interested":false}}"#,
                listing.id
            ))
            .dispatch()
            .await;

        let matches: Vec<StudentMatchView> = client
            .get("/api/v1/matches/student")
            .header(auth)
            .dispatch()
            .await
            .into_json()
            .await
            .expect("invalid response json");

        assert!(matches.iter().all(|m| m.listing.id != listing.id));
    }
}
