use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::data::user::FacultyPreview;
use crate::resp::problem::problems;
use crate::resp::problem::Problem;

pub mod db;

pub static LISTING_COLLECTION_NAME: &str = "listing";

fn true_bool() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Days,
    Weeks,
    Months,
    Years,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ListingDuration {
    pub value: u32,
    pub unit: DurationUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WageKind {
    Hourly,
    Monthly,
    Total,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wage {
    #[serde(rename = "type")]
    pub kind: WageKind,
    pub amount: f64,
    #[serde(default = "true_bool")]
    pub is_paid: bool,
}

/// A faculty-authored research opportunity posting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    #[serde(rename = "_id", default = "Uuid::new_v4")]
    pub id: Uuid,
    pub faculty_id: Uuid,
    pub title: String,
    pub description: String,
    pub requirements: String,
    pub duration: ListingDuration,
    pub wage: Wage,
    #[serde(default = "true_bool")]
    pub active: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// Creation payload; the owner and bookkeeping fields are filled in
/// server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewListing {
    pub title: String,
    pub description: String,
    pub requirements: String,
    pub duration: ListingDuration,
    pub wage: Wage,
}

impl NewListing {
    pub fn validate(&self) -> Result<(), Problem> {
        if self.title.trim().is_empty() {
            return Err(problems::validation("Title is required."));
        }
        if self.description.trim().is_empty() {
            return Err(problems::validation("Description is required."));
        }
        if self.requirements.trim().is_empty() {
            return Err(problems::validation("Requirements are required."));
        }
        if self.duration.value == 0 {
            return Err(problems::validation("Duration must be at least one unit."));
        }
        if self.wage.amount < 0.0 {
            return Err(problems::validation("Wage amount can't be negative."));
        }
        Ok(())
    }

    pub fn into_listing(self, faculty_id: Uuid) -> Listing {
        Listing {
            id: Uuid::new_v4(),
            faculty_id,
            title: self.title,
            description: self.description,
            requirements: self.requirements,
            duration: self.duration,
            wage: self.wage,
            active: true,
            created_at: Utc::now(),
        }
    }
}

/// Partial edit of an owned listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListingUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub requirements: Option<String>,
    #[serde(default)]
    pub duration: Option<ListingDuration>,
    #[serde(default)]
    pub wage: Option<Wage>,
}

impl ListingUpdate {
    pub fn validate(&self) -> Result<(), Problem> {
        for text in [&self.title, &self.description, &self.requirements]
            .into_iter()
            .flatten()
        {
            if text.trim().is_empty() {
                return Err(problems::validation("Text fields must not be blank."));
            }
        }
        if matches!(self.duration, Some(d) if d.value == 0) {
            return Err(problems::validation("Duration must be at least one unit."));
        }
        if matches!(self.wage, Some(w) if w.amount < 0.0) {
            return Err(problems::validation("Wage amount can't be negative."));
        }
        Ok(())
    }
}

/// Listing hydrated with the owning faculty member's display fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingWithFaculty {
    #[serde(flatten)]
    pub listing: Listing,
    #[serde(default)]
    pub faculty: Option<FacultyPreview>,
}

/// Minimal reference used in grouped match views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSummary {
    pub id: Uuid,
    pub title: String,
}

impl From<&Listing> for ListingSummary {
    fn from(listing: &Listing) -> Self {
        ListingSummary {
            id: listing.id,
            title: listing.title.clone(),
        }
    }
}
