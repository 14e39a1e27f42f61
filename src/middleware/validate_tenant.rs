use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sqlx::AnyPool;

use super::auth::AuthUser;
use crate::app::AppState;
use crate::error::ApiError;

pub const TENANT_HEADER: &str = "x-tenant";

/// Resolved tenant and its database pool, injected by middleware
#[derive(Clone)]
pub struct TenantContext {
    pub name: String,
    pub pool: AnyPool,
}

/// Resolve the tenant for this request: from the JWT when authenticated,
/// otherwise from the `X-Tenant` header or the configured default.
pub async fn validate_tenant_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let name = match request.extensions().get::<AuthUser>() {
        Some(auth_user) => auth_user.tenant.clone(),
        None => request
            .headers()
            .get(TENANT_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| state.databases.default_tenant().to_string()),
    };

    let pool = state.databases.tenant_pool(&name).await.map_err(|e| {
        tracing::warn!("Tenant resolution failed for '{}': {}", name, e);
        ApiError::from(e)
    })?;

    tracing::debug!("Tenant database pool acquired for: {}", name);
    request.extensions_mut().insert(TenantContext { name, pool });

    Ok(next.run(request).await)
}
