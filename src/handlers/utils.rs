use axum::extract::Multipart;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::config::PaginationConfig;
use crate::database::PaginationParams;
use crate::dto::attachments::UploadedFile;
use crate::error::ApiError;

/// Multipart field carrying the uploaded file
pub const FILE_FIELD: &str = "file";

/// Paging query string. Missing values fall back to the configured defaults
/// and the page size is capped at the configured maximum.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1-based page number
    pub page_index: Option<u32>,
    pub page_size: Option<u32>,
}

impl PageQuery {
    pub fn resolve(self, config: &PaginationConfig) -> Result<PaginationParams, ApiError> {
        let params = PaginationParams::new(
            self.page_index.unwrap_or(1),
            self.page_size.unwrap_or(config.default_page_size),
        );
        if !params.is_valid() {
            return Err(ApiError::bad_request("page_index and page_size must be at least 1"));
        }
        Ok(params.capped(config.max_page_size))
    }
}

/// Pull the `file` field out of a multipart body
pub async fn read_upload(mut multipart: Multipart) -> Result<UploadedFile, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let name = field.file_name().unwrap_or("file").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {}", e)))?;
        return Ok(UploadedFile {
            name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    Err(ApiError::validation_error(
        "Validation failed",
        Some([(FILE_FIELD.to_string(), "A file is required".to_string())].into_iter().collect()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pagination() -> PaginationConfig {
        PaginationConfig {
            default_page_size: 10,
            max_page_size: 50,
        }
    }

    #[test]
    fn missing_values_use_defaults() {
        let params = PageQuery::default().resolve(&pagination()).unwrap();
        assert_eq!(params, PaginationParams::new(1, 10));
    }

    #[test]
    fn page_size_is_capped() {
        let query = PageQuery {
            page_index: Some(3),
            page_size: Some(500),
        };
        assert_eq!(query.resolve(&pagination()).unwrap(), PaginationParams::new(3, 50));
    }

    #[test]
    fn zero_page_is_rejected() {
        let query = PageQuery {
            page_index: Some(0),
            page_size: None,
        };
        assert!(query.resolve(&pagination()).is_err());
    }
}
