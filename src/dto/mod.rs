pub mod attachments;
pub mod courses;
pub mod quizzes;
pub mod users;
pub mod validation;

pub use validation::{Validate, ValidationErrors};
