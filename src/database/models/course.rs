use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::database::entity::{Entity, Relation};
use crate::database::value::SqlValue;

use super::{Attachment, Quiz, UnknownVariant, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum CourseLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl CourseLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseLevel::Beginner => "Beginner",
            CourseLevel::Intermediate => "Intermediate",
            CourseLevel::Advanced => "Advanced",
        }
    }
}

impl TryFrom<String> for CourseLevel {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "Beginner" => Ok(CourseLevel::Beginner),
            "Intermediate" => Ok(CourseLevel::Intermediate),
            "Advanced" => Ok(CourseLevel::Advanced),
            _ => Err(UnknownVariant { kind: "course level", value }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CourseCategory {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

impl Entity for CourseCategory {
    const TABLE: &'static str = "course_categories";
    const COLUMNS: &'static [&'static str] = &["name", "created_at"];

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![(&self.name).into(), (&self.created_at).into()]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Course {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub author_id: i64,
    pub image_id: Option<i64>,
    pub category_id: i64,
    #[sqlx(try_from = "String")]
    pub level: CourseLevel,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl Entity for Course {
    const TABLE: &'static str = "courses";
    const COLUMNS: &'static [&'static str] = &[
        "name",
        "description",
        "author_id",
        "image_id",
        "category_id",
        "level",
        "created_at",
        "updated_at",
    ];

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            (&self.name).into(),
            (&self.description).into(),
            self.author_id.into(),
            self.image_id.into(),
            self.category_id.into(),
            self.level.as_str().into(),
            (&self.created_at).into(),
            (&self.updated_at).into(),
        ]
    }

    fn relations() -> Vec<Relation> {
        vec![
            Relation::belongs_to::<User>("author", "author_id"),
            Relation::belongs_to::<Attachment>("image", "image_id"),
            Relation::belongs_to::<CourseCategory>("category", "category_id"),
            Relation::has_many::<CourseTarget>("targets", "course_id"),
            Relation::has_many::<Quiz>("quizzes", "course_id"),
        ]
    }
}

/// A learning outcome listed on a course page
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CourseTarget {
    pub id: i64,
    pub course_id: i64,
    pub name: String,
    pub created_at: String,
}

impl Entity for CourseTarget {
    const TABLE: &'static str = "course_targets";
    const COLUMNS: &'static [&'static str] = &["course_id", "name", "created_at"];

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![self.course_id.into(), (&self.name).into(), (&self.created_at).into()]
    }

    fn relations() -> Vec<Relation> {
        vec![Relation::belongs_to::<Course>("course", "course_id")]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SavedCourse {
    pub id: i64,
    pub user_id: i64,
    pub course_id: i64,
    pub created_at: String,
}

impl Entity for SavedCourse {
    const TABLE: &'static str = "saved_courses";
    const COLUMNS: &'static [&'static str] = &["user_id", "course_id", "created_at"];

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![self.user_id.into(), self.course_id.into(), (&self.created_at).into()]
    }

    fn relations() -> Vec<Relation> {
        vec![
            Relation::belongs_to::<User>("user", "user_id"),
            Relation::belongs_to::<Course>("course", "course_id"),
        ]
    }
}
