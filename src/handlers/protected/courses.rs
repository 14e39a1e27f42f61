use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};

use crate::app::AppState;
use crate::database::models::CourseTarget;
use crate::dto::courses::{CourseFilter, CourseForCreation, CourseTargetForCreation, CourseView};
use crate::handlers::utils::PageQuery;
use crate::middleware::{ApiResponse, ApiResult, Paged, PagedResult, TenantContext, ValidatedUser};
use crate::services::CourseService;

/// POST /api/courses - the caller becomes the author unless an admin names one
#[utoipa::path(
    post,
    path = "/api/courses",
    tag = "courses",
    security(("bearer_auth" = [])),
    request_body = CourseForCreation,
    responses(
        (status = 201, description = "Course created", body = CourseView),
        (status = 400, description = "Validation failed or unknown category")
    )
)]
pub async fn create(
    Extension(tenant): Extension<TenantContext>,
    Extension(user): Extension<ValidatedUser>,
    Json(payload): Json<CourseForCreation>,
) -> ApiResult<CourseView> {
    let course = CourseService::new(tenant.pool).create(&user.actor(), payload).await?;
    Ok(ApiResponse::created(course))
}

/// GET /api/courses
#[utoipa::path(
    get,
    path = "/api/courses",
    tag = "courses",
    security(("bearer_auth" = [])),
    params(PageQuery, CourseFilter),
    responses((status = 200, description = "Courses", body = [CourseView]))
)]
pub async fn list(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    Query(page): Query<PageQuery>,
    Query(filter): Query<CourseFilter>,
) -> PagedResult<CourseView> {
    let params = page.resolve(&state.config.pagination)?;
    Ok(Paged::from(CourseService::new(tenant.pool).get_all(&filter, &params).await?))
}

/// GET /api/courses/:id - with author, category, image and targets
#[utoipa::path(
    get,
    path = "/api/courses/{id}",
    tag = "courses",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course", body = CourseView),
        (status = 404, description = "No such course")
    )
)]
pub async fn get(Extension(tenant): Extension<TenantContext>, Path(id): Path<i64>) -> ApiResult<CourseView> {
    Ok(ApiResponse::success(CourseService::new(tenant.pool).get(id).await?))
}

/// PUT /api/courses/:id (author or admin)
#[utoipa::path(
    put,
    path = "/api/courses/{id}",
    tag = "courses",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Course id")),
    request_body = CourseForCreation,
    responses(
        (status = 200, description = "Updated course", body = CourseView),
        (status = 403, description = "Not the author")
    )
)]
pub async fn update(
    Extension(tenant): Extension<TenantContext>,
    Extension(user): Extension<ValidatedUser>,
    Path(id): Path<i64>,
    Json(payload): Json<CourseForCreation>,
) -> ApiResult<CourseView> {
    let course = CourseService::new(tenant.pool).update(&user.actor(), id, payload).await?;
    Ok(ApiResponse::success(course))
}

/// DELETE /api/courses/:id (author or admin)
#[utoipa::path(
    delete,
    path = "/api/courses/{id}",
    tag = "courses",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Course id")),
    responses(
        (status = 204, description = "Course deleted"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "No such course")
    )
)]
pub async fn delete(
    Extension(tenant): Extension<TenantContext>,
    Extension(user): Extension<ValidatedUser>,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    CourseService::new(tenant.pool).delete(&user.actor(), id).await?;
    Ok(ApiResponse::<()>::no_content())
}

/// POST /api/courses/targets - add a learning target to a course
#[utoipa::path(
    post,
    path = "/api/courses/targets",
    tag = "courses",
    security(("bearer_auth" = [])),
    request_body = CourseTargetForCreation,
    responses((status = 201, description = "Target added", body = CourseTarget))
)]
pub async fn add_target(
    Extension(tenant): Extension<TenantContext>,
    Extension(user): Extension<ValidatedUser>,
    Json(payload): Json<CourseTargetForCreation>,
) -> ApiResult<CourseTarget> {
    let target = CourseService::new(tenant.pool).add_target(&user.actor(), payload).await?;
    Ok(ApiResponse::created(target))
}

/// GET /api/courses/:id/targets
#[utoipa::path(
    get,
    path = "/api/courses/{id}/targets",
    tag = "courses",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Course id")),
    responses((status = 200, description = "Course targets", body = [CourseTarget]))
)]
pub async fn targets(Extension(tenant): Extension<TenantContext>, Path(id): Path<i64>) -> ApiResult<Vec<CourseTarget>> {
    Ok(ApiResponse::success(CourseService::new(tenant.pool).get_targets(id).await?))
}
