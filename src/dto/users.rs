use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::validation::{
    max_length, required, validate_email_format, validate_password, validate_username_format, Validate,
    ValidationErrors,
};
use crate::database::models::{Attachment, Course, Role, User};

/// Registration payload, also used to replace a user's editable fields
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct UserForCreation {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

impl Validate for UserForCreation {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check("first_name", required(&self.first_name));
        errors.check("first_name", max_length(&self.first_name, 50));
        errors.check("last_name", required(&self.last_name));
        errors.check("last_name", max_length(&self.last_name, 50));
        errors.check("username", validate_username_format(&self.username));
        errors.check("email", validate_email_format(&self.email));
        errors.check("password", validate_password(&self.password));
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct UserForChangePassword {
    pub username: String,
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl Validate for UserForChangePassword {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check("username", required(&self.username));
        if self.old_password.is_empty() {
            errors.add("old_password", "Old password must not be null or empty!");
        }
        if self.new_password.is_empty() {
            errors.add("new_password", "New password must not be null or empty!");
        }
        errors.check("new_password", validate_password(&self.new_password));
        if self.new_password != self.confirm_password {
            errors.add("confirm_password", "Passwords do not match");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check("username", required(&self.username));
        errors.check("password", required(&self.password));
        errors.into_result()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: String,
    /// Seconds until the token expires
    pub expires_in: i64,
    pub user: UserView,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserView {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub image: Option<Attachment>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl UserView {
    pub fn new(user: User, image: Option<Attachment>) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            username: user.username,
            email: user.email,
            role: user.role,
            image,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self::new(user, None)
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct SavedCourseForCreation {
    pub course_id: i64,
}

impl Validate for SavedCourseForCreation {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.course_id <= 0 {
            errors.add("course_id", "Value must not be null or empty!");
        }
        errors.into_result()
    }
}

/// Outcome of toggling a saved course
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SavedCourseToggle {
    pub course_id: i64,
    pub saved: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SavedCourseView {
    pub id: i64,
    pub course: Option<Course>,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_user() -> UserForCreation {
        UserForCreation {
            first_name: "Ali".to_string(),
            last_name: "Valiyev".to_string(),
            username: "ali".to_string(),
            email: "ali@zamin.uz".to_string(),
            password: "password1".to_string(),
        }
    }

    #[test]
    fn accepts_valid_registration() {
        assert!(valid_user().validate().is_ok());
    }

    #[test]
    fn reports_each_bad_field() {
        let dto = UserForCreation {
            email: "nope".to_string(),
            password: "short".to_string(),
            ..valid_user()
        };
        let errors = dto.validate().unwrap_err();
        assert!(errors.get("email").is_some());
        assert!(errors.get("password").is_some());
        assert!(errors.get("username").is_none());
    }

    #[test]
    fn password_confirmation_must_match() {
        let dto = UserForChangePassword {
            username: "ali".to_string(),
            old_password: "password1".to_string(),
            new_password: "password2".to_string(),
            confirm_password: "password3".to_string(),
        };
        let errors = dto.validate().unwrap_err();
        assert_eq!(errors.get("confirm_password"), Some("Passwords do not match"));
    }

    #[test]
    fn missing_fields_deserialize_to_empty() {
        let dto: LoginRequest = serde_json::from_str("{}").unwrap();
        assert!(dto.validate().is_err());
    }
}
