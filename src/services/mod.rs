pub mod attachment_service;
pub mod auth_service;
pub mod course_service;
pub mod error;
pub mod quiz_service;
pub mod saved_course_service;
pub mod user_service;

pub use attachment_service::AttachmentService;
pub use auth_service::AuthService;
pub use course_service::CourseService;
pub use error::{ServiceError, ServiceResult};
pub use quiz_service::QuizService;
pub use saved_course_service::SavedCourseService;
pub use user_service::UserService;

use crate::database::models::Role;

/// The authenticated caller, used for ownership and role checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i64,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: i64, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Owners and administrators may act on a record
    pub fn can_manage(&self, owner_id: i64) -> bool {
        self.is_admin() || self.user_id == owner_id
    }

    pub fn ensure_can_manage(&self, owner_id: i64) -> ServiceResult<()> {
        if self.can_manage(owner_id) {
            Ok(())
        } else {
            Err(ServiceError::forbidden("You are not allowed to modify this resource"))
        }
    }
}
