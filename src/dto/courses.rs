use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::users::UserView;
use super::validation::{max_length, required, Validate, ValidationErrors};
use crate::database::models::{Attachment, CourseCategory, CourseLevel, CourseTarget};

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct CourseForCreation {
    pub name: String,
    pub description: Option<String>,
    /// Defaults to the caller; only administrators may name another author
    pub author_id: Option<i64>,
    pub image_id: Option<i64>,
    pub category_id: i64,
    pub level: Option<CourseLevel>,
}

impl Validate for CourseForCreation {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check("name", required(&self.name));
        errors.check("name", max_length(&self.name, 50));
        if let Some(description) = &self.description {
            errors.check("description", max_length(description, 100));
        }
        if self.category_id <= 0 {
            errors.add("category_id", "Value must not be null or empty!");
        }
        if self.level.is_none() {
            errors.add("level", "Value must not be null or empty!");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CourseView {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub level: CourseLevel,
    pub author_id: i64,
    pub category_id: i64,
    pub author: Option<UserView>,
    pub category: Option<CourseCategory>,
    pub image: Option<Attachment>,
    pub targets: Vec<CourseTarget>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct CourseTargetForCreation {
    pub name: String,
    pub course_id: i64,
}

impl Validate for CourseTargetForCreation {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check("name", required(&self.name));
        errors.check("name", max_length(&self.name, 200));
        if self.course_id <= 0 {
            errors.add("course_id", "Value must not be null or empty!");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct CourseCategoryForCreation {
    pub name: String,
}

impl Validate for CourseCategoryForCreation {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check("name", required(&self.name));
        errors.check("name", max_length(&self.name, 50));
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CourseFilter {
    pub category_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_requires_name_category_and_level() {
        let errors = CourseForCreation::default().validate().unwrap_err();
        assert!(errors.get("name").is_some());
        assert!(errors.get("category_id").is_some());
        assert!(errors.get("level").is_some());
    }

    #[test]
    fn course_length_limits() {
        let dto = CourseForCreation {
            name: "n".repeat(51),
            description: Some("d".repeat(101)),
            category_id: 1,
            level: Some(CourseLevel::Beginner),
            ..Default::default()
        };
        let errors = dto.validate().unwrap_err();
        assert!(errors.get("name").is_some());
        assert!(errors.get("description").is_some());

        let dto = CourseForCreation {
            name: "n".repeat(50),
            description: Some("d".repeat(100)),
            category_id: 1,
            level: Some(CourseLevel::Advanced),
            ..Default::default()
        };
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn level_deserializes_from_variant_name() {
        let dto: CourseForCreation =
            serde_json::from_str(r#"{"name":"Rust","category_id":1,"level":"Intermediate"}"#).unwrap();
        assert_eq!(dto.level, Some(CourseLevel::Intermediate));
    }
}
