use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Extension,
};

use crate::app::AppState;
use crate::database::models::Attachment;
use crate::error::ApiError;
use crate::handlers::utils::read_upload;
use crate::middleware::{ApiResponse, ApiResult, TenantContext};
use crate::services::AttachmentService;

fn service(state: &AppState, tenant: TenantContext) -> AttachmentService {
    AttachmentService::new(tenant.pool, state.config.storage.clone(), tenant.name)
}

/// POST /api/attachments - store a file and return its metadata
#[utoipa::path(
    post,
    path = "/api/attachments",
    tag = "attachments",
    security(("bearer_auth" = [])),
    request_body(content = crate::dto::attachments::FileUpload, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "File stored", body = Attachment),
        (status = 413, description = "File too large")
    )
)]
pub async fn upload(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    multipart: Multipart,
) -> ApiResult<Attachment> {
    let file = read_upload(multipart).await?;
    let attachment = service(&state, tenant).upload(file).await?;
    Ok(ApiResponse::created(attachment))
}

/// GET /api/attachments/:id - metadata
#[utoipa::path(
    get,
    path = "/api/attachments/{id}",
    tag = "attachments",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Attachment id")),
    responses(
        (status = 200, description = "Attachment", body = Attachment),
        (status = 404, description = "No such attachment")
    )
)]
pub async fn get(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<i64>,
) -> ApiResult<Attachment> {
    Ok(ApiResponse::success(service(&state, tenant).get(id).await?))
}

/// GET /api/attachments/:id/content - raw file bytes
#[utoipa::path(
    get,
    path = "/api/attachments/{id}/content",
    tag = "attachments",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Attachment id")),
    responses(
        (status = 200, description = "File contents with the stored content type"),
        (status = 404, description = "No such attachment")
    )
)]
pub async fn download(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let (attachment, bytes) = service(&state, tenant).read(id).await?;

    let content_type = attachment
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&format!("inline; filename=\"{}\"", attachment.name.replace('"', "")))
        .unwrap_or_else(|_| HeaderValue::from_static("inline"));

    Ok(([(header::CONTENT_TYPE, content_type), (header::CONTENT_DISPOSITION, disposition)], bytes).into_response())
}
