use axum::{
    extract::{Path, Query, State},
    Extension,
};

use crate::app::AppState;
use crate::dto::users::UserView;
use crate::handlers::utils::PageQuery;
use crate::middleware::{ApiResponse, ApiResult, Paged, PagedResult, TenantContext};
use crate::services::UserService;

/// GET /api/users - every user in the tenant
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Users", body = [UserView]),
        (status = 403, description = "Administrator role required")
    )
)]
pub async fn list(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    Query(page): Query<PageQuery>,
) -> PagedResult<UserView> {
    let params = page.resolve(&state.config.pagination)?;
    Ok(Paged::from(UserService::new(tenant.pool).get_all(&params).await?))
}

/// DELETE /api/users/:id
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "No such user")
    )
)]
pub async fn delete(Extension(tenant): Extension<TenantContext>, Path(id): Path<i64>) -> ApiResult<()> {
    UserService::new(tenant.pool).delete(id).await?;
    Ok(ApiResponse::<()>::no_content())
}
