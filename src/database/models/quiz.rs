use serde::{Deserialize, Serialize};
use sqlx::any::AnyRow;
use sqlx::{FromRow, Row};
use utoipa::ToSchema;

use crate::database::entity::{Entity, Relation};
use crate::database::value::SqlValue;

use super::{Attachment, Course};

/// The question text shared by a quiz and its attached media
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct QuizContent {
    pub id: i64,
    pub question: String,
    pub created_at: String,
}

impl Entity for QuizContent {
    const TABLE: &'static str = "quiz_contents";
    const COLUMNS: &'static [&'static str] = &["question", "created_at"];

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![(&self.question).into(), (&self.created_at).into()]
    }

    fn relations() -> Vec<Relation> {
        vec![Relation::has_many::<QuizAsset>("assets", "quiz_content_id")]
    }
}

/// A file (image, audio) attached to a question
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct QuizAsset {
    pub id: i64,
    pub quiz_content_id: i64,
    pub file_id: i64,
    pub created_at: String,
}

impl Entity for QuizAsset {
    const TABLE: &'static str = "quiz_assets";
    const COLUMNS: &'static [&'static str] = &["quiz_content_id", "file_id", "created_at"];

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![self.quiz_content_id.into(), self.file_id.into(), (&self.created_at).into()]
    }

    fn relations() -> Vec<Relation> {
        vec![
            Relation::belongs_to::<QuizContent>("content", "quiz_content_id"),
            Relation::belongs_to::<Attachment>("file", "file_id"),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Quiz {
    pub id: i64,
    pub course_id: i64,
    pub quiz_content_id: i64,
    pub created_at: String,
}

impl Entity for Quiz {
    const TABLE: &'static str = "quizzes";
    const COLUMNS: &'static [&'static str] = &["course_id", "quiz_content_id", "created_at"];

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![self.course_id.into(), self.quiz_content_id.into(), (&self.created_at).into()]
    }

    fn relations() -> Vec<Relation> {
        vec![
            Relation::belongs_to::<Course>("course", "course_id"),
            Relation::belongs_to::<QuizContent>("content", "quiz_content_id"),
            Relation::has_many::<QuestionAnswer>("answers", "quiz_id"),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuestionAnswer {
    pub id: i64,
    pub quiz_id: i64,
    pub answer: String,
    /// Stored as 0/1 so the column type is the same on every backend
    #[serde(deserialize_with = "bool_from_int")]
    pub is_correct: bool,
    pub created_at: String,
}

impl<'r> FromRow<'r, AnyRow> for QuestionAnswer {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            quiz_id: row.try_get("quiz_id")?,
            answer: row.try_get("answer")?,
            is_correct: row.try_get::<i64, _>("is_correct")? != 0,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl Entity for QuestionAnswer {
    const TABLE: &'static str = "question_answers";
    const COLUMNS: &'static [&'static str] = &["quiz_id", "answer", "is_correct", "created_at"];

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.quiz_id.into(),
            (&self.answer).into(),
            self.is_correct.into(),
            (&self.created_at).into(),
        ]
    }
}

/// Accepts `true`/`false` as well as the 0/1 form produced by eager loading
fn bool_from_int<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrInt {
        Bool(bool),
        Int(i64),
    }
    Ok(match BoolOrInt::deserialize(deserializer)? {
        BoolOrInt::Bool(b) => b,
        BoolOrInt::Int(i) => i != 0,
    })
}
