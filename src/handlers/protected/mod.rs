// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Middleware: jwt_auth → validate_tenant → validate_user. Handlers receive
// the tenant pool as `TenantContext` and the caller as `ValidatedUser`.
// Ownership rules (author or admin) are enforced by the services.
pub mod attachments;
pub mod categories;
pub mod courses;
pub mod quizzes;
pub mod saved_courses;
pub mod users;
