use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::data::listing::{Listing, ListingSummary};
use crate::data::user::{FacultyPreview, StudentPreview};

pub mod db;

pub static SWIPE_COLLECTION_NAME: &str = "swipe";

/// Faculty-side verdict on an interested swipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeStatus {
    Pending,
    Accepted,
    Rejected,
}

impl fmt::Display for SwipeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SwipeStatus::Pending => "pending",
            SwipeStatus::Accepted => "accepted",
            SwipeStatus::Rejected => "rejected",
        };
        write!(f, "{}", name)
    }
}

/// One student's recorded decision on one listing.
///
/// `faculty_accepted` stays `None` until the owning faculty member
/// responds; a match exists only once it's `Some(true)` on an
/// interested swipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Swipe {
    #[serde(rename = "_id", default = "Uuid::new_v4")]
    pub id: Uuid,
    pub student_id: Uuid,
    pub listing_id: Uuid,
    pub interested: bool,
    #[serde(default)]
    pub faculty_accepted: Option<bool>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Swipe {
    pub fn new(student_id: Uuid, listing_id: Uuid, interested: bool) -> Swipe {
        Swipe {
            id: Uuid::new_v4(),
            student_id,
            listing_id,
            interested,
            faculty_accepted: None,
            created_at: Utc::now(),
        }
    }

    pub fn status(&self) -> SwipeStatus {
        match self.faculty_accepted {
            None => SwipeStatus::Pending,
            Some(true) => SwipeStatus::Accepted,
            Some(false) => SwipeStatus::Rejected,
        }
    }

    pub fn is_match(&self) -> bool {
        self.interested && self.faculty_accepted == Some(true)
    }

    /// Changing the student's mind resets any faculty verdict.
    pub fn change_interest(&mut self, interested: bool) {
        self.interested = interested;
        self.faculty_accepted = None;
    }

    pub fn respond(&mut self, accept: bool) {
        self.faculty_accepted = Some(accept);
    }
}

/// Response body for a freshly recorded swipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwipeOutcome {
    pub swipe_id: Uuid,
    pub is_match: bool,
}

impl From<&Swipe> for SwipeOutcome {
    fn from(swipe: &Swipe) -> Self {
        SwipeOutcome {
            swipe_id: swipe.id,
            is_match: swipe.is_match(),
        }
    }
}

/// Student-facing match entry: every interested swipe, annotated with
/// where it stands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentMatchView {
    pub swipe_id: Uuid,
    pub status: SwipeStatus,
    pub listing: Listing,
    #[serde(default)]
    pub faculty: Option<FacultyPreview>,
}

/// Swipe reference inside a grouped faculty match view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwipeSummary {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub status: SwipeStatus,
}

impl From<&Swipe> for SwipeSummary {
    fn from(swipe: &Swipe) -> Self {
        SwipeSummary {
            id: swipe.id,
            listing_id: swipe.listing_id,
            status: swipe.status(),
        }
    }
}

/// Faculty-facing match view: one entry per interested student, with
/// all of the faculty member's listings that student swiped on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacultyMatchGroup {
    pub student: StudentPreview,
    pub listings: Vec<ListingSummary>,
    pub swipes: Vec<SwipeSummary>,
}

/// Swipe history entry hydrated with its listing and owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwipeWithListing {
    #[serde(flatten)]
    pub swipe: Swipe,
    #[serde(default)]
    pub listing: Option<Listing>,
    #[serde(default)]
    pub faculty: Option<FacultyPreview>,
}
