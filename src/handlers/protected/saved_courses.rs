use axum::{
    extract::{Query, State},
    Extension, Json,
};

use crate::app::AppState;
use crate::dto::users::{SavedCourseForCreation, SavedCourseToggle, SavedCourseView};
use crate::handlers::utils::PageQuery;
use crate::middleware::{ApiResponse, ApiResult, Paged, PagedResult, TenantContext, ValidatedUser};
use crate::services::SavedCourseService;

/// POST /api/users/saved-course - save the course, or unsave it if already saved
#[utoipa::path(
    post,
    path = "/api/users/saved-course",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = SavedCourseForCreation,
    responses((status = 200, description = "New saved state", body = SavedCourseToggle))
)]
pub async fn toggle(
    Extension(tenant): Extension<TenantContext>,
    Extension(user): Extension<ValidatedUser>,
    Json(payload): Json<SavedCourseForCreation>,
) -> ApiResult<SavedCourseToggle> {
    let toggled = SavedCourseService::new(tenant.pool).toggle(&user.actor(), payload).await?;
    Ok(ApiResponse::success(toggled))
}

/// GET /api/users/saved-course - the caller's saved courses
#[utoipa::path(
    get,
    path = "/api/users/saved-course",
    tag = "users",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses((status = 200, description = "Saved courses", body = [SavedCourseView]))
)]
pub async fn list(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    Extension(user): Extension<ValidatedUser>,
    Query(page): Query<PageQuery>,
) -> PagedResult<SavedCourseView> {
    let params = page.resolve(&state.config.pagination)?;
    let page = SavedCourseService::new(tenant.pool).get_all(&user.actor(), &params).await?;
    Ok(Paged::from(page))
}
