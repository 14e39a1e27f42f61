use utoipa::ToSchema;

/// Multipart body for file uploads
#[allow(dead_code)]
#[derive(ToSchema)]
pub struct FileUpload {
    /// File contents
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

/// An uploaded file as received from a multipart form
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Strip directories and anything unsafe from a client-provided name
    pub fn safe_name(&self) -> String {
        let base = self.name.rsplit(['/', '\\']).next().unwrap_or_default();
        let cleaned: String = base
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
            .collect();
        let cleaned = cleaned.trim_start_matches('.');
        if cleaned.is_empty() {
            "file".to_string()
        } else {
            cleaned.to_string()
        }
    }
}
