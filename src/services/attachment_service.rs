use serde_json::json;
use sqlx::AnyPool;
use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

use super::{ServiceError, ServiceResult};
use crate::config::StorageConfig;
use crate::database::models::{timestamp, Attachment};
use crate::database::{UnitOfWork, UNASSIGNED_ID};
use crate::dto::attachments::UploadedFile;

/// Files on disk under `<root>/<tenant>/`, metadata in the tenant database
pub struct AttachmentService {
    pool: AnyPool,
    storage: StorageConfig,
    tenant: String,
}

impl AttachmentService {
    pub fn new(pool: AnyPool, storage: StorageConfig, tenant: impl Into<String>) -> Self {
        Self {
            pool,
            storage,
            tenant: tenant.into(),
        }
    }

    pub async fn upload(&self, file: UploadedFile) -> ServiceResult<Attachment> {
        if file.bytes.is_empty() {
            return Err(ServiceError::BadRequest("Uploaded file is empty".to_string()));
        }
        if file.bytes.len() > self.storage.max_upload_bytes {
            return Err(ServiceError::PayloadTooLarge(format!(
                "File exceeds the {} byte upload limit",
                self.storage.max_upload_bytes
            )));
        }

        let relative = format!("{}/{}_{}", self.tenant, Uuid::new_v4().simple(), file.safe_name());
        let full_path = self.storage.root.join(&relative);
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full_path, &file.bytes).await?;

        let mut uow = UnitOfWork::new(self.pool.clone());
        let mut attachments = uow.repository::<Attachment>();
        let pending = attachments.add(Attachment {
            id: UNASSIGNED_ID,
            name: file.name.clone(),
            path: relative,
            content_type: file.content_type.clone(),
            size: file.bytes.len() as i64,
            created_at: timestamp(),
        })?;

        if let Err(e) = attachments.commit().await {
            if let Err(io) = tokio::fs::remove_file(&full_path).await {
                warn!("Failed to remove orphaned upload {}: {}", full_path.display(), io);
            }
            return Err(ServiceError::from_commit(e, "Attachment"));
        }

        let attachment = pending.into_committed()?;
        info!("Stored attachment {} ({} bytes)", attachment.id, attachment.size);
        Ok(attachment)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Attachment> {
        let mut uow = UnitOfWork::new(self.pool.clone());
        uow.repository::<Attachment>()
            .get_one(json!({ "id": id }), &[])
            .await?
            .map(|loaded| loaded.into_inner())
            .ok_or_else(|| ServiceError::not_found("Attachment"))
    }

    /// Metadata and file contents
    pub async fn read(&self, id: i64) -> ServiceResult<(Attachment, Vec<u8>)> {
        let attachment = self.get(id).await?;
        let bytes = tokio::fs::read(self.path_of(&attachment)).await?;
        Ok((attachment, bytes))
    }

    pub fn path_of(&self, attachment: &Attachment) -> PathBuf {
        self.storage.root.join(&attachment.path)
    }
}
