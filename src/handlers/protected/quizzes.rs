use axum::{
    extract::{Multipart, Path, Query, State},
    Extension, Json,
};

use crate::app::AppState;
use crate::dto::quizzes::{QuizAnswerCheck, QuizFilter, QuizForCreation, QuizResultView, QuizView};
use crate::handlers::utils::{read_upload, PageQuery};
use crate::middleware::{ApiResponse, ApiResult, Paged, PagedResult, TenantContext, ValidatedUser};
use crate::services::{AttachmentService, QuizService};

/// POST /api/quizzes - question, answers and quiz in one request
#[utoipa::path(
    post,
    path = "/api/quizzes",
    tag = "quizzes",
    security(("bearer_auth" = [])),
    request_body = QuizForCreation,
    responses(
        (status = 201, description = "Quiz created", body = QuizView),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Not the course author")
    )
)]
pub async fn create(
    Extension(tenant): Extension<TenantContext>,
    Extension(user): Extension<ValidatedUser>,
    Json(payload): Json<QuizForCreation>,
) -> ApiResult<QuizView> {
    let quiz = QuizService::new(tenant.pool).create(&user.actor(), payload).await?;
    Ok(ApiResponse::created(quiz))
}

/// GET /api/quizzes?course_id=
#[utoipa::path(
    get,
    path = "/api/quizzes",
    tag = "quizzes",
    security(("bearer_auth" = [])),
    params(PageQuery, QuizFilter),
    responses((status = 200, description = "Quizzes", body = [QuizView]))
)]
pub async fn list(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    Query(page): Query<PageQuery>,
    Query(filter): Query<QuizFilter>,
) -> PagedResult<QuizView> {
    let params = page.resolve(&state.config.pagination)?;
    Ok(Paged::from(QuizService::new(tenant.pool).get_all(&filter, &params).await?))
}

/// GET /api/quizzes/:id - with question, assets and answers
#[utoipa::path(
    get,
    path = "/api/quizzes/{id}",
    tag = "quizzes",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Quiz id")),
    responses(
        (status = 200, description = "Quiz", body = QuizView),
        (status = 404, description = "No such quiz")
    )
)]
pub async fn get(Extension(tenant): Extension<TenantContext>, Path(id): Path<i64>) -> ApiResult<QuizView> {
    Ok(ApiResponse::success(QuizService::new(tenant.pool).get(id).await?))
}

/// DELETE /api/quizzes/:id (course author or admin)
#[utoipa::path(
    delete,
    path = "/api/quizzes/{id}",
    tag = "quizzes",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Quiz id")),
    responses(
        (status = 204, description = "Quiz deleted"),
        (status = 403, description = "Not the course author")
    )
)]
pub async fn delete(
    Extension(tenant): Extension<TenantContext>,
    Extension(user): Extension<ValidatedUser>,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    QuizService::new(tenant.pool).delete(&user.actor(), id).await?;
    Ok(ApiResponse::<()>::no_content())
}

/// POST /api/quizzes/:id/check - grade a chosen answer
#[utoipa::path(
    post,
    path = "/api/quizzes/{id}/check",
    tag = "quizzes",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Quiz id")),
    request_body = QuizAnswerCheck,
    responses(
        (status = 200, description = "Result", body = QuizResultView),
        (status = 400, description = "Answer does not belong to the quiz")
    )
)]
pub async fn check(
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<i64>,
    Json(payload): Json<QuizAnswerCheck>,
) -> ApiResult<QuizResultView> {
    Ok(ApiResponse::success(QuizService::new(tenant.pool).check(id, payload).await?))
}

/// POST /api/quizzes/:id/assets - attach a file to the quiz question
#[utoipa::path(
    post,
    path = "/api/quizzes/{id}/assets",
    tag = "quizzes",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Quiz id")),
    request_body(content = crate::dto::attachments::FileUpload, content_type = "multipart/form-data"),
    responses((status = 200, description = "Quiz with the new asset", body = QuizView))
)]
pub async fn add_asset(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    Extension(user): Extension<ValidatedUser>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<QuizView> {
    let file = read_upload(multipart).await?;
    let attachments = AttachmentService::new(tenant.pool.clone(), state.config.storage.clone(), tenant.name);
    let quiz = QuizService::new(tenant.pool)
        .add_asset(&user.actor(), id, file, &attachments)
        .await?;
    Ok(ApiResponse::success(quiz))
}
