use axum::{
    extract::{Multipart, Path, State},
    Extension, Json,
};

use crate::app::AppState;
use crate::dto::users::{UserForChangePassword, UserForCreation, UserView};
use crate::handlers::utils::read_upload;
use crate::middleware::{ApiResponse, ApiResult, TenantContext, ValidatedUser};
use crate::services::{AttachmentService, UserService};

/// GET /api/users/info - the calling user
#[utoipa::path(
    get,
    path = "/api/users/info",
    tag = "users",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Current user", body = UserView))
)]
pub async fn info(
    Extension(tenant): Extension<TenantContext>,
    Extension(user): Extension<ValidatedUser>,
) -> ApiResult<UserView> {
    let view = UserService::new(tenant.pool).get_info(&user.actor()).await?;
    Ok(ApiResponse::success(view))
}

/// GET /api/users/:id
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = UserView),
        (status = 404, description = "No such user")
    )
)]
pub async fn get(Extension(tenant): Extension<TenantContext>, Path(id): Path<i64>) -> ApiResult<UserView> {
    Ok(ApiResponse::success(UserService::new(tenant.pool).get(id).await?))
}

/// PUT /api/users/:id - replace the editable fields (self or admin)
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "User id")),
    request_body = UserForCreation,
    responses(
        (status = 200, description = "Updated user", body = UserView),
        (status = 403, description = "Not your account"),
        (status = 409, description = "Username or email already taken")
    )
)]
pub async fn update(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    Extension(user): Extension<ValidatedUser>,
    Path(id): Path<i64>,
    Json(payload): Json<UserForCreation>,
) -> ApiResult<UserView> {
    let view = UserService::new(tenant.pool)
        .with_password_cost(state.config.security.password_hash_cost)
        .update(&user.actor(), id, payload)
        .await?;
    Ok(ApiResponse::success(view))
}

/// POST /api/users/change-password
#[utoipa::path(
    post,
    path = "/api/users/change-password",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = UserForChangePassword,
    responses(
        (status = 200, description = "Password changed", body = UserView),
        (status = 400, description = "Old password wrong or confirmation mismatch")
    )
)]
pub async fn change_password(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    Extension(user): Extension<ValidatedUser>,
    Json(payload): Json<UserForChangePassword>,
) -> ApiResult<UserView> {
    let view = UserService::new(tenant.pool)
        .with_password_cost(state.config.security.password_hash_cost)
        .change_password(&user.actor(), payload)
        .await?;
    Ok(ApiResponse::success(view))
}

/// POST /api/users/attachments/:id - upload a profile image for the user
#[utoipa::path(
    post,
    path = "/api/users/attachments/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "User id")),
    request_body(content = crate::dto::attachments::FileUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Image stored", body = UserView),
        (status = 413, description = "File too large")
    )
)]
pub async fn upload_image(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    Extension(user): Extension<ValidatedUser>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<UserView> {
    let file = read_upload(multipart).await?;
    let attachments = AttachmentService::new(tenant.pool.clone(), state.config.storage.clone(), tenant.name);
    let view = UserService::new(tenant.pool)
        .set_image(&user.actor(), id, file, &attachments)
        .await?;
    Ok(ApiResponse::success(view))
}
