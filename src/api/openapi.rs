use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::database::models::{
    Attachment, Course, CourseCategory, CourseLevel, CourseTarget, QuestionAnswer, Quiz, Role, User,
};
use crate::database::PageMeta;
use crate::dto::attachments::FileUpload;
use crate::dto::courses::{CourseCategoryForCreation, CourseForCreation, CourseTargetForCreation, CourseView};
use crate::dto::quizzes::{AnswerForCreation, AnswerView, QuizAnswerCheck, QuizForCreation, QuizResultView, QuizView};
use crate::dto::users::{
    LoginRequest, SavedCourseForCreation, SavedCourseToggle, SavedCourseView, TokenResponse, UserForChangePassword,
    UserForCreation, UserView,
};
use crate::handlers::{elevated, protected, public};

/// OpenAPI document served at `/openapi.json`
#[derive(OpenApi)]
#[openapi(
    info(title = "Zamin Education API", description = "Users, courses, quizzes and attachments"),
    paths(
        public::auth::login,
        public::users::register,
        protected::users::info,
        protected::users::get,
        protected::users::update,
        protected::users::change_password,
        protected::users::upload_image,
        protected::saved_courses::toggle,
        protected::saved_courses::list,
        protected::categories::list,
        protected::courses::create,
        protected::courses::list,
        protected::courses::get,
        protected::courses::update,
        protected::courses::delete,
        protected::courses::add_target,
        protected::courses::targets,
        protected::quizzes::create,
        protected::quizzes::list,
        protected::quizzes::get,
        protected::quizzes::delete,
        protected::quizzes::check,
        protected::quizzes::add_asset,
        protected::attachments::upload,
        protected::attachments::get,
        protected::attachments::download,
        elevated::users::list,
        elevated::users::delete,
        elevated::categories::create,
    ),
    components(schemas(
        Attachment,
        Course,
        CourseCategory,
        CourseLevel,
        CourseTarget,
        QuestionAnswer,
        Quiz,
        Role,
        User,
        PageMeta,
        FileUpload,
        CourseForCreation,
        CourseView,
        CourseTargetForCreation,
        CourseCategoryForCreation,
        AnswerForCreation,
        AnswerView,
        QuizForCreation,
        QuizView,
        QuizAnswerCheck,
        QuizResultView,
        LoginRequest,
        TokenResponse,
        UserForCreation,
        UserForChangePassword,
        UserView,
        SavedCourseForCreation,
        SavedCourseToggle,
        SavedCourseView,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Token acquisition"),
        (name = "users", description = "Accounts, profile images and saved courses"),
        (name = "categories", description = "Course categories"),
        (name = "courses", description = "Courses and their targets"),
        (name = "quizzes", description = "Quizzes, answers and assets"),
        (name = "attachments", description = "Uploaded files"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by protected paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
        );
    }
}
