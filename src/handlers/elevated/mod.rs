// handlers/elevated/mod.rs - Elevated handlers (admin role required)
//
// Middleware: jwt_auth → validate_tenant → validate_user → require_admin.
pub mod categories;
pub mod users;
