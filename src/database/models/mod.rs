pub mod attachment;
pub mod course;
pub mod quiz;
pub mod user;

pub use attachment::Attachment;
pub use course::{Course, CourseCategory, CourseLevel, CourseTarget, SavedCourse};
pub use quiz::{QuestionAnswer, Quiz, QuizAsset, QuizContent};
pub use user::{Role, User};

/// Current time in the RFC 3339 form stored in timestamp columns
pub fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// A stored enum column held a value no variant matches
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}
