use axum::{
    extract::{Query, State},
    Extension,
};

use crate::app::AppState;
use crate::database::models::CourseCategory;
use crate::handlers::utils::PageQuery;
use crate::middleware::{Paged, PagedResult, TenantContext};
use crate::services::CourseService;

/// GET /api/categories
#[utoipa::path(
    get,
    path = "/api/categories",
    tag = "categories",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses((status = 200, description = "Course categories", body = [CourseCategory]))
)]
pub async fn list(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    Query(page): Query<PageQuery>,
) -> PagedResult<CourseCategory> {
    let params = page.resolve(&state.config.pagination)?;
    Ok(Paged::from(CourseService::new(tenant.pool).get_categories(&params).await?))
}
