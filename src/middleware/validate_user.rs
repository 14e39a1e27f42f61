use axum::{extract::Request, middleware::Next, response::Response};
use serde_json::json;

use super::auth::AuthUser;
use super::validate_tenant::TenantContext;
use crate::database::models::{Role, User};
use crate::database::{QuerySpec, UnitOfWork};
use crate::error::ApiError;
use crate::services::Actor;

/// The authenticated user as currently stored in the tenant database
#[derive(Clone, Debug)]
pub struct ValidatedUser {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

impl ValidatedUser {
    pub fn actor(&self) -> Actor {
        Actor::new(self.id, self.role)
    }
}

/// Ensures the user named by the token still exists in the tenant. The
/// stored role is authoritative over the role in the token.
pub async fn validate_user_middleware(mut request: Request, next: Next) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("JWT authentication required before user validation"))?;

    let tenant = request
        .extensions()
        .get::<TenantContext>()
        .cloned()
        .ok_or_else(|| ApiError::internal_server_error("Tenant pool required before user validation"))?;

    let mut uow = UnitOfWork::new(tenant.pool);
    let user = uow
        .repository::<User>()
        .query(Some(QuerySpec::new().predicate(json!({ "id": auth_user.user_id })).no_tracking()))
        .fetch_optional()
        .await?
        .ok_or_else(|| {
            tracing::warn!(
                "User validation failed: user '{}' (ID: {}) not found in tenant '{}'",
                auth_user.username,
                auth_user.user_id,
                tenant.name
            );
            ApiError::unauthorized(format!("User '{}' is not active in tenant '{}'", auth_user.username, tenant.name))
        })?;

    if user.username != auth_user.username {
        tracing::warn!(
            "User validation failed: JWT user '{}' doesn't match stored username '{}'",
            auth_user.username,
            user.username
        );
        return Err(ApiError::unauthorized("User authentication mismatch"));
    }

    let validated_user = ValidatedUser {
        id: user.id,
        username: user.username.clone(),
        role: user.role,
    };
    tracing::debug!(
        "User validation successful: {} ({}) in tenant '{}'",
        validated_user.username,
        validated_user.role,
        tenant.name
    );
    request.extensions_mut().insert(validated_user);

    Ok(next.run(request).await)
}

/// Rejects callers without the administrator role
pub async fn require_admin_middleware(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<ValidatedUser>()
        .ok_or_else(|| ApiError::unauthorized("User validation required before role check"))?;

    if user.role != Role::Admin {
        tracing::warn!("Admin route refused for user '{}'", user.username);
        return Err(ApiError::forbidden("Administrator role required"));
    }

    Ok(next.run(request).await)
}
