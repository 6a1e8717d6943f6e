use bson::{doc, Document};
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use mongodb::Database;
use uuid::Uuid;

use crate::data::filter;
use crate::resp::problem::Problem;
use crate::security::Salt;

use super::{FacultyProfile, StudentProfile, User, USER_COLLECTION_NAME};

pub mod problem {
    use crate::resp::problem::Problem;
    use rocket::http::Status;
    use uuid::Uuid;

    #[inline]
    pub fn bad_email(email: impl ToString, detail: impl ToString) -> Problem {
        Problem::with_code(Status::BadRequest, "VALIDATION", "Bad email.")
            .insert_str("email", email)
            .detail(detail)
            .to_owned()
    }

    #[inline]
    pub fn bad_password(detail: impl ToString) -> Problem {
        Problem::with_code(Status::BadRequest, "VALIDATION", "Bad password.")
            .detail(detail)
            .to_owned()
    }

    #[inline]
    pub fn not_found(id: Uuid) -> Problem {
        Problem::with_code(Status::NotFound, "NOT_FOUND", "User doesn't exist.")
            .insert_str("id", id)
            .to_owned()
    }

    #[inline]
    pub fn bad_login() -> Problem {
        Problem::with_code(Status::Unauthorized, "AUTH_INVALID", "Bad email or password.")
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct UserSignupData {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub faculty: bool,
    #[serde(default)]
    pub student: Option<StudentProfile>,
    #[serde(default)]
    pub faculty_profile: Option<FacultyProfile>,
}

impl std::fmt::Debug for UserSignupData {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UserSignupData:{}", self.email)
    }
}

impl UserSignupData {
    pub fn validate(&self) -> Result<(), Problem> {
        if !self.email.contains('@') {
            return Err(problem::bad_email(
                self.email.to_string(),
                "Not a valid e-mail address.",
            ));
        }

        if self.name.trim().is_empty() {
            return Err(crate::resp::problem::problems::validation(
                "Name must not be empty.",
            ));
        }

        if self.password.len() < 8 {
            return Err(problem::bad_password(
                "Password must be at least 8 characters (bytes) long.",
            ));
        }

        if self.password.len() > 1024 {
            return Err(problem::bad_password(
                "Passwords longer than 1024 characters aren't supported.",
            ));
        }

        if let Some(student) = &self.student {
            student.validate()?;
        }

        Ok(())
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct UserLoginData {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for UserLoginData {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UserLoginData:{}", self.email)
    }
}

/// Role-filtered profile edit. Fields for the other role are rejected
/// instead of being silently dropped.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub student: Option<StudentProfile>,
    #[serde(default)]
    pub faculty_profile: Option<FacultyProfile>,
    #[serde(default)]
    pub profile_image: Option<String>,
}

impl ProfileUpdate {
    pub fn validate(&self, faculty: bool) -> Result<(), Problem> {
        use crate::resp::problem::problems::validation;

        if faculty && self.student.is_some() {
            return Err(validation("Faculty accounts have no student profile."));
        }
        if !faculty && self.faculty_profile.is_some() {
            return Err(validation("Student accounts have no faculty profile."));
        }
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(validation("Name must not be empty."));
            }
        }
        if let Some(student) = &self.student {
            student.validate()?;
        }
        if self.name.is_none()
            && self.student.is_none()
            && self.faculty_profile.is_none()
            && self.profile_image.is_none()
        {
            return Err(validation("No valid fields to update."));
        }
        Ok(())
    }

    fn set_document(&self) -> Document {
        let mut set = Document::new();
        if let Some(name) = &self.name {
            set.insert("name", name.as_str());
        }
        if let Some(student) = &self.student {
            set.insert(
                "student",
                bson::to_bson(student).expect("StudentProfile must be serializable to BSON"),
            );
        }
        if let Some(faculty_profile) = &self.faculty_profile {
            set.insert(
                "faculty_profile",
                bson::to_bson(faculty_profile)
                    .expect("FacultyProfile must be serializable to BSON"),
            );
        }
        if let Some(profile_image) = &self.profile_image {
            set.insert("profile_image", profile_image.as_str());
        }
        set.insert(
            "updated_at",
            bson::to_bson(&chrono::Utc::now()).expect("timestamps must be serializable"),
        );
        set
    }
}

#[allow(async_fn_in_trait)]
pub trait UserDbExt {
    async fn create_user(&self, signup: UserSignupData, salt: &Salt) -> Result<User, Problem>;

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, Problem>;
    async fn find_user_by_email(&self, email: impl AsRef<str>) -> Result<Option<User>, Problem>;
    async fn users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, Problem>;

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<User>, Problem>;
    async fn delete_user(&self, id: Uuid) -> Result<Option<User>, Problem>;
}

impl UserDbExt for Database {
    async fn create_user(&self, signup: UserSignupData, salt: &Salt) -> Result<User, Problem> {
        if self.find_user_by_email(&signup.email).await?.is_some() {
            return Err(problem::bad_email(
                signup.email.to_string(),
                "Email already registered.",
            ));
        }

        let mut user = User::new(
            &signup.email,
            &signup.name,
            &signup.password,
            signup.faculty,
            salt,
        );
        if user.faculty {
            user.faculty_profile = signup.faculty_profile;
        } else {
            user.student = signup.student;
        }

        self.collection::<User>(USER_COLLECTION_NAME)
            .insert_one(&user, None)
            .await
            .map_err(Problem::from)?;

        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, Problem> {
        self.collection(USER_COLLECTION_NAME)
            .find_one(filter::by_id(id), None)
            .await
            .map_err(Problem::from)
    }

    async fn find_user_by_email(&self, email: impl AsRef<str>) -> Result<Option<User>, Problem> {
        self.collection(USER_COLLECTION_NAME)
            .find_one(filter::by_email(email), None)
            .await
            .map_err(Problem::from)
    }

    async fn users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, Problem> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let cursor = self
            .collection(USER_COLLECTION_NAME)
            .find(doc! { "_id": { "$in": filter::id_strings(ids) } }, None)
            .await
            .map_err(Problem::from)?;

        Ok(crate::data::read_all(cursor).await)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<User>, Problem> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        self.collection(USER_COLLECTION_NAME)
            .find_one_and_update(
                filter::by_id(id),
                doc! { "$set": update.set_document() },
                options,
            )
            .await
            .map_err(Problem::from)
    }

    async fn delete_user(&self, id: Uuid) -> Result<Option<User>, Problem> {
        self.collection(USER_COLLECTION_NAME)
            .find_one_and_delete(filter::by_id(id), None)
            .await
            .map_err(Problem::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup(email: &str, password: &str) -> UserSignupData {
        UserSignupData {
            name: "Example".to_string(),
            email: email.to_string(),
            password: password.to_string(),
            faculty: false,
            student: None,
            faculty_profile: None,
        }
    }

    #[test]
    fn signup_rejects_bad_email() {
        let err = signup("not-an-email", "long-enough").validate().unwrap_err();
        assert_eq!(err.code(), Some("VALIDATION"));
    }

    #[test]
    fn signup_rejects_short_password() {
        let err = signup("a@b.edu", "short").validate().unwrap_err();
        assert_eq!(err.code(), Some("VALIDATION"));
    }

    #[test]
    fn signup_accepts_reasonable_data() {
        assert!(signup("a@b.edu", "long-enough").validate().is_ok());
    }

    #[test]
    fn profile_update_is_role_checked() {
        let update = ProfileUpdate {
            student: Some(StudentProfile {
                university: "RPI".into(),
                major: "CS".into(),
                skills: "Rust".into(),
                ..Default::default()
            }),
            ..Default::default()
        };

        assert!(update.validate(false).is_ok());
        assert!(update.validate(true).is_err());
    }

    #[test]
    fn empty_profile_update_is_rejected() {
        let err = ProfileUpdate::default().validate(false).unwrap_err();
        assert_eq!(err.code(), Some("VALIDATION"));
    }

    #[test]
    fn set_document_always_bumps_updated_at() {
        let update = ProfileUpdate {
            name: Some("New Name".into()),
            ..Default::default()
        };
        let set = update.set_document();
        assert_eq!(set.get_str("name").unwrap(), "New Name");
        assert!(set.contains_key("updated_at"));
        assert!(!set.contains_key("student"));
    }
}
