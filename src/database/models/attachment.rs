use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::database::entity::Entity;
use crate::database::value::SqlValue;

/// Metadata of an uploaded file; the bytes live under the storage root
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Attachment {
    pub id: i64,
    pub name: String,
    /// Path relative to the storage root
    pub path: String,
    pub content_type: Option<String>,
    pub size: i64,
    pub created_at: String,
}

impl Entity for Attachment {
    const TABLE: &'static str = "attachments";
    const COLUMNS: &'static [&'static str] = &["name", "path", "content_type", "size", "created_at"];

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            (&self.name).into(),
            (&self.path).into(),
            (&self.content_type).into(),
            self.size.into(),
            (&self.created_at).into(),
        ]
    }
}
