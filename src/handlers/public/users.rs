use axum::{extract::State, Extension, Json};

use crate::app::AppState;
use crate::dto::users::{UserForCreation, UserView};
use crate::middleware::{ApiResponse, ApiResult, TenantContext};
use crate::services::UserService;

/// POST /api/users - register a new account with the `User` role
#[utoipa::path(
    post,
    path = "/api/users",
    tag = "users",
    request_body = UserForCreation,
    responses(
        (status = 201, description = "Account created", body = UserView),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Username or email already taken")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    Json(payload): Json<UserForCreation>,
) -> ApiResult<UserView> {
    let user = UserService::new(tenant.pool)
        .with_password_cost(state.config.security.password_hash_cost)
        .create(payload)
        .await?;
    Ok(ApiResponse::created(user))
}
