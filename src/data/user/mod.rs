use chrono::{DateTime, Utc};
use crypto::bcrypt::bcrypt;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::resp::problem::problems;
use crate::resp::problem::Problem;
use crate::security::Salt;

pub mod db;

pub static USER_COLLECTION_NAME: &str = "user";

/// Passwords are pre-hashed with SHA-256 so bcrypt's 72 byte input limit
/// never truncates long passphrases.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PasswordHash([u8; 24]);

impl PasswordHash {
    pub fn new(password: impl AsRef<str>, salt: &Salt) -> PasswordHash {
        let mut pw_hash: [u8; 24] = [0; 24];

        let mut sha = Sha256::new();
        sha2::Digest::update(&mut sha, password.as_ref().as_bytes());

        bcrypt(12, salt, sha.finalize().as_slice(), &mut pw_hash);

        PasswordHash(pw_hash)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub university: String,
    pub major: String,
    pub skills: String,
    #[serde(default)]
    pub experience: Option<String>,
    #[serde(default)]
    pub projects: Option<String>,
    #[serde(default)]
    pub certifications: Option<String>,
    #[serde(default)]
    pub resume_text: Option<String>,
}

impl StudentProfile {
    pub fn validate(&self) -> Result<(), Problem> {
        if self.university.trim().is_empty() {
            return Err(problems::validation("University is required."));
        }
        if self.major.trim().is_empty() {
            return Err(problems::validation("Major is required."));
        }
        if self.skills.trim().is_empty() {
            return Err(problems::validation("Skills are required."));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacultyProfile {
    #[serde(default)]
    pub university: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub research_interests: Option<String>,
    #[serde(default)]
    pub biography: Option<String>,
    #[serde(default)]
    pub publications: Option<String>,
    #[serde(default)]
    pub office_hours: Option<String>,
    #[serde(default)]
    pub contact_info: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub pw_hash: PasswordHash,
    #[serde(default)]
    pub faculty: bool,
    #[serde(default)]
    pub student: Option<StudentProfile>,
    #[serde(default)]
    pub faculty_profile: Option<FacultyProfile>,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        email: impl ToString,
        name: impl ToString,
        password: impl ToString,
        faculty: bool,
        salt: &Salt,
    ) -> User {
        let pw_hash = PasswordHash::new(password.to_string(), salt);

        let id = Uuid::new_v4();
        tracing::info!("Creating a new user with UUID: {}", id.to_string());

        let now = Utc::now();
        User {
            id,
            name: name.to_string(),
            email: email.to_string(),
            pw_hash,
            faculty,
            student: None,
            faculty_profile: None,
            profile_image: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn verify_password(&self, password: impl AsRef<str>, salt: &Salt) -> bool {
        self.pw_hash == PasswordHash::new(password, salt)
    }
}

/// Caller-facing view of a user, with credentials stripped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub faculty: bool,
    #[serde(default)]
    pub student: Option<StudentProfile>,
    #[serde(default)]
    pub faculty_profile: Option<FacultyProfile>,
    #[serde(default)]
    pub profile_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            name: user.name,
            email: user.email,
            faculty: user.faculty,
            student: user.student,
            faculty_profile: user.faculty_profile,
            profile_image: user.profile_image,
            created_at: user.created_at,
        }
    }
}

/// Faculty fields attached to listings and match views for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacultyPreview {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub university: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
}

impl From<&User> for FacultyPreview {
    fn from(user: &User) -> Self {
        let profile = user.faculty_profile.clone().unwrap_or_default();
        FacultyPreview {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            university: profile.university,
            department: profile.department,
        }
    }
}

/// Student fields shown to faculty in match views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentPreview {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub university: Option<String>,
    #[serde(default)]
    pub major: Option<String>,
    #[serde(default)]
    pub skills: Option<String>,
}

impl From<&User> for StudentPreview {
    fn from(user: &User) -> Self {
        let profile = user.student.clone();
        StudentPreview {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            university: profile.as_ref().map(|p| p.university.clone()),
            major: profile.as_ref().map(|p| p.major.clone()),
            skills: profile.map(|p| p.skills),
        }
    }
}

/// Profile as shown to other authenticated users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicProfile {
    pub id: Uuid,
    pub name: String,
    pub faculty: bool,
    #[serde(default)]
    pub university: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub research_interests: Option<String>,
    #[serde(default)]
    pub biography: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
}

impl From<&User> for PublicProfile {
    fn from(user: &User) -> Self {
        let faculty_profile = user.faculty_profile.clone().unwrap_or_default();
        let university = match &user.student {
            Some(s) => Some(s.university.clone()),
            None => faculty_profile.university,
        };
        PublicProfile {
            id: user.id,
            name: user.name.clone(),
            faculty: user.faculty,
            university,
            department: faculty_profile.department,
            research_interests: faculty_profile.research_interests,
            biography: faculty_profile.biography,
            profile_image: user.profile_image.clone(),
        }
    }
}
