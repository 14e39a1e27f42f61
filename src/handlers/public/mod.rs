// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition and self-registration. The tenant comes from the
// `X-Tenant` header or the configured default.
pub mod auth;
pub mod users;

pub use auth::login;
pub use users::register;
