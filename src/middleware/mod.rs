pub mod auth;
pub mod response;
pub mod validate_tenant;
pub mod validate_user;

pub use auth::{jwt_auth_middleware, AuthUser};
pub use response::{ApiResponse, ApiResult, Paged, PagedResult};
pub use validate_tenant::{validate_tenant_middleware, TenantContext};
pub use validate_user::{require_admin_middleware, validate_user_middleware, ValidatedUser};
