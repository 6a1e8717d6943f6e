use std::collections::HashMap;

use bson::doc;
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument};
use mongodb::{Database, IndexModel};
use tracing::warn;
use uuid::Uuid;

use crate::data::filter;
use crate::data::listing::db::ListingDbExt;
use crate::data::listing::{Listing, ListingSummary};
use crate::data::user::db::UserDbExt;
use crate::data::user::StudentPreview;

use crate::resp::problem::Problem;

use super::{
    FacultyMatchGroup, StudentMatchView, Swipe, SwipeSummary, SwipeWithListing,
    SWIPE_COLLECTION_NAME,
};

pub mod problem {
    use crate::resp::problem::Problem;
    use rocket::http::Status;
    use uuid::Uuid;

    /// The stored `interested` value rides along so clients can reconcile
    /// their local state with what the server already has.
    #[inline]
    pub fn already_swiped(interested: Option<bool>) -> Problem {
        Problem::with_code(
            Status::BadRequest,
            "ALREADY_SWIPED",
            "Listing was already swiped on.",
        )
        .insert("interested", interested)
        .to_owned()
    }

    #[inline]
    pub fn not_found(id: Uuid) -> Problem {
        Problem::with_code(Status::NotFound, "NOT_FOUND", "Swipe doesn't exist.")
            .insert_str("id", id)
            .to_owned()
    }
}

const DUPLICATE_KEY: i32 = 11000;

fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};

    matches!(
        error.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY
    )
}

#[inline]
fn newest_first() -> FindOptions {
    FindOptions::builder()
        .sort(doc! { "created_at": -1 })
        .build()
}

#[allow(async_fn_in_trait)]
pub trait SwipeDbExt {
    /// One swipe per (student, listing) pair, enforced by the database so
    /// concurrent submissions can't slip through.
    async fn ensure_swipe_indexes(&self) -> Result<(), mongodb::error::Error>;

    async fn record_swipe(&self, swipe: Swipe) -> Result<Swipe, Problem>;

    async fn get_swipe(&self, id: Uuid) -> Result<Option<Swipe>, Problem>;
    async fn find_swipe(
        &self,
        student_id: Uuid,
        listing_id: Uuid,
    ) -> Result<Option<Swipe>, Problem>;

    async fn update_interest(
        &self,
        id: Uuid,
        student_id: Uuid,
        interested: bool,
    ) -> Result<Option<Swipe>, Problem>;
    async fn set_response(&self, id: Uuid, accept: bool) -> Result<Option<Swipe>, Problem>;

    async fn swipes_by_student(&self, student_id: Uuid) -> Result<Vec<Swipe>, Problem>;
    /// Interested swipes across a set of listings, for faculty match views.
    async fn swipes_on_listings(&self, listing_ids: &[Uuid]) -> Result<Vec<Swipe>, Problem>;

    async fn student_matches(&self, student_id: Uuid) -> Result<Vec<StudentMatchView>, Problem>;
    async fn faculty_matches(&self, faculty_id: Uuid) -> Result<Vec<FacultyMatchGroup>, Problem>;
    async fn swipes_with_listings(
        &self,
        student_id: Uuid,
    ) -> Result<Vec<SwipeWithListing>, Problem>;
}

impl SwipeDbExt for Database {
    async fn ensure_swipe_indexes(&self) -> Result<(), mongodb::error::Error> {
        let index = IndexModel::builder()
            .keys(doc! { "student_id": 1, "listing_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        self.collection::<Swipe>(SWIPE_COLLECTION_NAME)
            .create_index(index, None)
            .await?;

        Ok(())
    }

    async fn record_swipe(&self, swipe: Swipe) -> Result<Swipe, Problem> {
        if let Some(existing) = self.find_swipe(swipe.student_id, swipe.listing_id).await? {
            return Err(problem::already_swiped(Some(existing.interested)));
        }

        let result = self
            .collection::<Swipe>(SWIPE_COLLECTION_NAME)
            .insert_one(&swipe, None)
            .await;

        match result {
            Ok(_) => Ok(swipe),
            // Lost the race against a concurrent submission; report what won.
            Err(e) if is_duplicate_key(&e) => {
                let existing = self.find_swipe(swipe.student_id, swipe.listing_id).await?;
                Err(problem::already_swiped(existing.map(|s| s.interested)))
            }
            Err(e) => Err(Problem::from(e)),
        }
    }

    async fn get_swipe(&self, id: Uuid) -> Result<Option<Swipe>, Problem> {
        self.collection(SWIPE_COLLECTION_NAME)
            .find_one(filter::by_id(id), None)
            .await
            .map_err(Problem::from)
    }

    async fn find_swipe(
        &self,
        student_id: Uuid,
        listing_id: Uuid,
    ) -> Result<Option<Swipe>, Problem> {
        self.collection(SWIPE_COLLECTION_NAME)
            .find_one(
                doc! {
                    "student_id": student_id.to_string(),
                    "listing_id": listing_id.to_string(),
                },
                None,
            )
            .await
            .map_err(Problem::from)
    }

    async fn update_interest(
        &self,
        id: Uuid,
        student_id: Uuid,
        interested: bool,
    ) -> Result<Option<Swipe>, Problem> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        // Any prior faculty verdict is void once the student changes course.
        self.collection(SWIPE_COLLECTION_NAME)
            .find_one_and_update(
                doc! { "_id": id.to_string(), "student_id": student_id.to_string() },
                doc! { "$set": { "interested": interested, "faculty_accepted": null } },
                options,
            )
            .await
            .map_err(Problem::from)
    }

    async fn set_response(&self, id: Uuid, accept: bool) -> Result<Option<Swipe>, Problem> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        self.collection(SWIPE_COLLECTION_NAME)
            .find_one_and_update(
                filter::by_id(id),
                doc! { "$set": { "faculty_accepted": accept } },
                options,
            )
            .await
            .map_err(Problem::from)
    }

    async fn swipes_by_student(&self, student_id: Uuid) -> Result<Vec<Swipe>, Problem> {
        let cursor = self
            .collection(SWIPE_COLLECTION_NAME)
            .find(
                filter::by_uuid_field("student_id", student_id),
                newest_first(),
            )
            .await
            .map_err(Problem::from)?;

        Ok(crate::data::read_all(cursor).await)
    }

    async fn swipes_on_listings(&self, listing_ids: &[Uuid]) -> Result<Vec<Swipe>, Problem> {
        if listing_ids.is_empty() {
            return Ok(vec![]);
        }

        let cursor = self
            .collection(SWIPE_COLLECTION_NAME)
            .find(
                doc! {
                    "listing_id": { "$in": filter::id_strings(listing_ids) },
                    "interested": true,
                },
                newest_first(),
            )
            .await
            .map_err(Problem::from)?;

        Ok(crate::data::read_all(cursor).await)
    }

    async fn student_matches(&self, student_id: Uuid) -> Result<Vec<StudentMatchView>, Problem> {
        let swipes: Vec<Swipe> = self
            .swipes_by_student(student_id)
            .await?
            .into_iter()
            .filter(|swipe| swipe.interested)
            .collect();

        let listing_ids: Vec<Uuid> = swipes.iter().map(|s| s.listing_id).collect();
        let listings = self.attach_faculty(self.listings_by_ids(&listing_ids).await?).await?;
        let by_id: HashMap<Uuid, _> = listings
            .into_iter()
            .map(|entry| (entry.listing.id, entry))
            .collect();

        let mut views = Vec::with_capacity(swipes.len());
        for swipe in swipes {
            match by_id.get(&swipe.listing_id) {
                Some(entry) => views.push(StudentMatchView {
                    swipe_id: swipe.id,
                    status: swipe.status(),
                    listing: entry.listing.clone(),
                    faculty: entry.faculty.clone(),
                }),
                None => {
                    warn!(
                        "Swipe {} references missing listing {}",
                        swipe.id, swipe.listing_id
                    );
                }
            }
        }

        Ok(views)
    }

    async fn faculty_matches(&self, faculty_id: Uuid) -> Result<Vec<FacultyMatchGroup>, Problem> {
        let cursor = self
            .collection::<Listing>(crate::data::listing::LISTING_COLLECTION_NAME)
            .find(filter::by_uuid_field("faculty_id", faculty_id), None)
            .await
            .map_err(Problem::from)?;
        let listings: Vec<Listing> = crate::data::read_all(cursor).await;

        let listing_ids: Vec<Uuid> = listings.iter().map(|l| l.id).collect();
        let swipes = self.swipes_on_listings(&listing_ids).await?;

        let listings_by_id: HashMap<Uuid, &Listing> =
            listings.iter().map(|l| (l.id, l)).collect();

        let mut student_ids: Vec<Uuid> = swipes.iter().map(|s| s.student_id).collect();
        student_ids.sort_unstable();
        student_ids.dedup();
        let students: HashMap<Uuid, StudentPreview> = self
            .users_by_ids(&student_ids)
            .await?
            .iter()
            .map(|user| (user.id, StudentPreview::from(user)))
            .collect();

        let mut groups: HashMap<Uuid, FacultyMatchGroup> = HashMap::new();
        for swipe in &swipes {
            let student = match students.get(&swipe.student_id) {
                Some(student) => student,
                None => {
                    warn!(
                        "Swipe {} references missing student {}",
                        swipe.id, swipe.student_id
                    );
                    continue;
                }
            };
            let listing = match listings_by_id.get(&swipe.listing_id) {
                Some(listing) => *listing,
                None => continue,
            };

            let group = groups
                .entry(swipe.student_id)
                .or_insert_with(|| FacultyMatchGroup {
                    student: student.clone(),
                    listings: vec![],
                    swipes: vec![],
                });
            group.listings.push(ListingSummary::from(listing));
            group.swipes.push(SwipeSummary::from(swipe));
        }

        let mut result: Vec<FacultyMatchGroup> = groups.into_values().collect();
        result.sort_by(|a, b| a.student.name.cmp(&b.student.name));
        Ok(result)
    }

    async fn swipes_with_listings(
        &self,
        student_id: Uuid,
    ) -> Result<Vec<SwipeWithListing>, Problem> {
        let swipes = self.swipes_by_student(student_id).await?;

        let listing_ids: Vec<Uuid> = swipes.iter().map(|s| s.listing_id).collect();
        let listings = self.attach_faculty(self.listings_by_ids(&listing_ids).await?).await?;
        let by_id: HashMap<Uuid, _> = listings
            .into_iter()
            .map(|entry| (entry.listing.id, entry))
            .collect();

        Ok(swipes
            .into_iter()
            .map(|swipe| {
                let entry = by_id.get(&swipe.listing_id);
                SwipeWithListing {
                    listing: entry.map(|e| e.listing.clone()),
                    faculty: entry.and_then(|e| e.faculty.clone()),
                    swipe,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::http::Status;

    #[test]
    fn already_swiped_carries_stored_direction() {
        let p = problem::already_swiped(Some(true));
        assert_eq!(p.status, Status::BadRequest);
        assert_eq!(p.code(), Some("ALREADY_SWIPED"));
        assert_eq!(p.body.get("interested"), Some(&serde_json::json!(true)));
    }

    #[test]
    fn already_swiped_tolerates_unknown_direction() {
        let p = problem::already_swiped(None);
        assert_eq!(p.body.get("interested"), Some(&serde_json::Value::Null));
    }
}
