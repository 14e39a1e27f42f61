use thiserror::Error;

use crate::auth::AuthError;
use crate::database::DatabaseError;
use crate::dto::ValidationErrors;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("Validation failed")]
    Validation(ValidationErrors),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Failed to map related data: {0}")]
    Mapping(#[from] serde_json::Error),
}

impl From<ValidationErrors> for ServiceError {
    fn from(errors: ValidationErrors) -> Self {
        ServiceError::Validation(errors)
    }
}

impl ServiceError {
    pub fn not_found(what: impl Into<String>) -> Self {
        ServiceError::NotFound(what.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ServiceError::Forbidden(message.into())
    }

    /// Translate constraint violations raised at commit into domain errors.
    /// `what` names the record being written.
    pub fn from_commit(err: DatabaseError, what: &str) -> Self {
        if err.is_unique_violation() {
            ServiceError::AlreadyExists(what.to_string())
        } else if err.is_foreign_key_violation() {
            ServiceError::Conflict(format!("{} references a missing record or is still in use", what))
        } else if let DatabaseError::NotFound { .. } = err {
            ServiceError::NotFound(what.to_string())
        } else {
            ServiceError::Database(err)
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
