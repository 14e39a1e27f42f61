use axum::{Extension, Json};

use crate::database::models::CourseCategory;
use crate::dto::courses::CourseCategoryForCreation;
use crate::middleware::{ApiResponse, ApiResult, TenantContext};
use crate::services::CourseService;

/// POST /api/categories
#[utoipa::path(
    post,
    path = "/api/categories",
    tag = "categories",
    security(("bearer_auth" = [])),
    request_body = CourseCategoryForCreation,
    responses(
        (status = 201, description = "Category created", body = CourseCategory),
        (status = 409, description = "Category name already exists")
    )
)]
pub async fn create(
    Extension(tenant): Extension<TenantContext>,
    Json(payload): Json<CourseCategoryForCreation>,
) -> ApiResult<CourseCategory> {
    Ok(ApiResponse::created(CourseService::new(tenant.pool).create_category(payload).await?))
}
