use std::collections::HashMap;

use bson::{doc, Document};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::Database;
use uuid::Uuid;

use crate::data::filter;
use crate::data::swipe::{Swipe, SWIPE_COLLECTION_NAME};
use crate::data::user::db::UserDbExt;
use crate::data::user::FacultyPreview;
use crate::resp::problem::Problem;

use super::{Listing, ListingUpdate, ListingWithFaculty, LISTING_COLLECTION_NAME};

pub mod problem {
    use crate::resp::problem::Problem;
    use rocket::http::Status;
    use uuid::Uuid;

    #[inline]
    pub fn not_found(id: Uuid) -> Problem {
        Problem::with_code(Status::NotFound, "NOT_FOUND", "Listing doesn't exist.")
            .insert_str("id", id)
            .to_owned()
    }
}

/// Search filters for the listing browse endpoint.
#[derive(Debug, Clone, Default, FromForm)]
pub struct ListingQuery {
    pub search: Option<String>,
    pub min_wage: Option<f64>,
    pub max_wage: Option<f64>,
    pub wage_type: Option<String>,
    pub paid: Option<bool>,
    pub duration_min: Option<u32>,
    pub duration_unit: Option<String>,
}

impl ListingQuery {
    pub fn to_filter(&self) -> Document {
        let mut filter = doc! { "active": true };

        if let Some(term) = &self.search {
            filter.insert(
                "$or",
                vec![
                    doc! { "title": { "$regex": term.as_str(), "$options": "i" } },
                    doc! { "description": { "$regex": term.as_str(), "$options": "i" } },
                ],
            );
        }

        if let Some(kind) = &self.wage_type {
            filter.insert("wage.type", kind.as_str());
        }

        let mut amount = Document::new();
        if let Some(min) = self.min_wage {
            amount.insert("$gte", min);
        }
        if let Some(max) = self.max_wage {
            amount.insert("$lte", max);
        }
        if !amount.is_empty() {
            filter.insert("wage.amount", amount);
        }

        if let Some(paid) = self.paid {
            filter.insert("wage.is_paid", paid);
        }

        if let (Some(min), Some(unit)) = (self.duration_min, &self.duration_unit) {
            filter.insert("duration.value", doc! { "$gte": min });
            filter.insert("duration.unit", unit.as_str());
        }

        filter
    }
}

#[inline]
fn newest_first() -> FindOptions {
    FindOptions::builder()
        .sort(doc! { "created_at": -1 })
        .build()
}

#[allow(async_fn_in_trait)]
pub trait ListingDbExt {
    async fn create_listing(&self, listing: Listing) -> Result<Listing, Problem>;

    /// Active listing lookup; retired listings read as absent.
    async fn get_listing(&self, id: Uuid) -> Result<Option<Listing>, Problem>;
    /// Lookup that ignores the `active` flag, for resolving swipe targets.
    async fn get_listing_any(&self, id: Uuid) -> Result<Option<Listing>, Problem>;

    /// Active listings the student hasn't swiped on yet.
    async fn listings_for_student(&self, student_id: Uuid) -> Result<Vec<Listing>, Problem>;
    async fn listings_by_faculty(&self, faculty_id: Uuid) -> Result<Vec<Listing>, Problem>;
    async fn listings_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Listing>, Problem>;
    async fn filter_listings(&self, query: &ListingQuery) -> Result<Vec<Listing>, Problem>;

    async fn update_listing(
        &self,
        id: Uuid,
        faculty_id: Uuid,
        update: ListingUpdate,
    ) -> Result<Option<Listing>, Problem>;
    /// Soft delete: flips `active` off, keeping swipe references resolvable.
    async fn retire_listing(&self, id: Uuid, faculty_id: Uuid) -> Result<bool, Problem>;

    async fn attach_faculty(
        &self,
        listings: Vec<Listing>,
    ) -> Result<Vec<ListingWithFaculty>, Problem>;
}

impl ListingDbExt for Database {
    async fn create_listing(&self, listing: Listing) -> Result<Listing, Problem> {
        self.collection::<Listing>(LISTING_COLLECTION_NAME)
            .insert_one(&listing, None)
            .await
            .map_err(Problem::from)?;

        Ok(listing)
    }

    async fn get_listing(&self, id: Uuid) -> Result<Option<Listing>, Problem> {
        self.collection(LISTING_COLLECTION_NAME)
            .find_one(doc! { "_id": id.to_string(), "active": true }, None)
            .await
            .map_err(Problem::from)
    }

    async fn get_listing_any(&self, id: Uuid) -> Result<Option<Listing>, Problem> {
        self.collection(LISTING_COLLECTION_NAME)
            .find_one(filter::by_id(id), None)
            .await
            .map_err(Problem::from)
    }

    async fn listings_for_student(&self, student_id: Uuid) -> Result<Vec<Listing>, Problem> {
        let swipes = self
            .collection::<Swipe>(SWIPE_COLLECTION_NAME)
            .find(filter::by_uuid_field("student_id", student_id), None)
            .await
            .map_err(Problem::from)?;

        let swiped: Vec<String> = crate::data::read_all(swipes)
            .await
            .into_iter()
            .map(|swipe| swipe.listing_id.to_string())
            .collect();

        let cursor = self
            .collection(LISTING_COLLECTION_NAME)
            .find(
                doc! { "active": true, "_id": { "$nin": swiped } },
                newest_first(),
            )
            .await
            .map_err(Problem::from)?;

        Ok(crate::data::read_all(cursor).await)
    }

    async fn listings_by_faculty(&self, faculty_id: Uuid) -> Result<Vec<Listing>, Problem> {
        let cursor = self
            .collection(LISTING_COLLECTION_NAME)
            .find(
                doc! { "faculty_id": faculty_id.to_string(), "active": true },
                newest_first(),
            )
            .await
            .map_err(Problem::from)?;

        Ok(crate::data::read_all(cursor).await)
    }

    async fn listings_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Listing>, Problem> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let cursor = self
            .collection(LISTING_COLLECTION_NAME)
            .find(doc! { "_id": { "$in": filter::id_strings(ids) } }, None)
            .await
            .map_err(Problem::from)?;

        Ok(crate::data::read_all(cursor).await)
    }

    async fn filter_listings(&self, query: &ListingQuery) -> Result<Vec<Listing>, Problem> {
        let cursor = self
            .collection(LISTING_COLLECTION_NAME)
            .find(query.to_filter(), newest_first())
            .await
            .map_err(Problem::from)?;

        Ok(crate::data::read_all(cursor).await)
    }

    async fn update_listing(
        &self,
        id: Uuid,
        faculty_id: Uuid,
        update: ListingUpdate,
    ) -> Result<Option<Listing>, Problem> {
        let mut set = Document::new();
        if let Some(title) = &update.title {
            set.insert("title", title.as_str());
        }
        if let Some(description) = &update.description {
            set.insert("description", description.as_str());
        }
        if let Some(requirements) = &update.requirements {
            set.insert("requirements", requirements.as_str());
        }
        if let Some(duration) = &update.duration {
            set.insert(
                "duration",
                bson::to_bson(duration).expect("ListingDuration must be serializable to BSON"),
            );
        }
        if let Some(wage) = &update.wage {
            set.insert(
                "wage",
                bson::to_bson(wage).expect("Wage must be serializable to BSON"),
            );
        }

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        self.collection(LISTING_COLLECTION_NAME)
            .find_one_and_update(
                doc! { "_id": id.to_string(), "faculty_id": faculty_id.to_string() },
                doc! { "$set": set },
                options,
            )
            .await
            .map_err(Problem::from)
    }

    async fn retire_listing(&self, id: Uuid, faculty_id: Uuid) -> Result<bool, Problem> {
        let result = self
            .collection::<Listing>(LISTING_COLLECTION_NAME)
            .update_one(
                doc! { "_id": id.to_string(), "faculty_id": faculty_id.to_string() },
                doc! { "$set": { "active": false } },
                None,
            )
            .await
            .map_err(Problem::from)?;

        Ok(result.matched_count > 0)
    }

    async fn attach_faculty(
        &self,
        listings: Vec<Listing>,
    ) -> Result<Vec<ListingWithFaculty>, Problem> {
        let mut faculty_ids: Vec<Uuid> = listings.iter().map(|l| l.faculty_id).collect();
        faculty_ids.sort_unstable();
        faculty_ids.dedup();

        let previews: HashMap<Uuid, FacultyPreview> = self
            .users_by_ids(&faculty_ids)
            .await?
            .iter()
            .map(|user| (user.id, FacultyPreview::from(user)))
            .collect();

        Ok(listings
            .into_iter()
            .map(|listing| {
                let faculty = previews.get(&listing.faculty_id).cloned();
                ListingWithFaculty { listing, faculty }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_query_only_filters_active() {
        let filter = ListingQuery::default().to_filter();
        assert_eq!(filter, doc! { "active": true });
    }

    #[test]
    fn search_becomes_case_insensitive_regex() {
        let query = ListingQuery {
            search: Some("robotics".into()),
            ..Default::default()
        };
        let filter = query.to_filter();
        let alternatives = filter.get_array("$or").unwrap();
        assert_eq!(alternatives.len(), 2);
    }

    #[test]
    fn wage_range_builds_single_amount_clause() {
        let query = ListingQuery {
            min_wage: Some(10.0),
            max_wage: Some(25.0),
            paid: Some(true),
            ..Default::default()
        };
        let filter = query.to_filter();
        let amount = filter.get_document("wage.amount").unwrap();
        assert_eq!(amount.get_f64("$gte").unwrap(), 10.0);
        assert_eq!(amount.get_f64("$lte").unwrap(), 25.0);
        assert_eq!(filter.get_bool("wage.is_paid").unwrap(), true);
    }

    #[test]
    fn duration_filter_requires_both_parts() {
        let only_min = ListingQuery {
            duration_min: Some(2),
            ..Default::default()
        };
        assert!(!only_min.to_filter().contains_key("duration.value"));

        let both = ListingQuery {
            duration_min: Some(2),
            duration_unit: Some("months".into()),
            ..Default::default()
        };
        let filter = both.to_filter();
        assert_eq!(filter.get_str("duration.unit").unwrap(), "months");
    }
}
