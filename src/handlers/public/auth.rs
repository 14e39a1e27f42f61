use axum::{extract::State, Extension, Json};

use crate::app::AppState;
use crate::dto::users::{LoginRequest, TokenResponse};
use crate::middleware::{ApiResponse, ApiResult, TenantContext};
use crate::services::AuthService;

/// POST /api/auth/login - exchange username and password for a JWT
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Missing credentials"),
        (status = 401, description = "Invalid username or password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<TokenResponse> {
    let service = AuthService::new(tenant.pool, state.config.security.clone(), tenant.name);
    Ok(ApiResponse::success(service.login(payload).await?))
}
