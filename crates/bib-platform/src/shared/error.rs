//! Platform Error Types

use thiserror::Error;

use crate::usecase::UseCaseError;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Duplicate entity: {entity_type} with {field}={value}")]
    Duplicate {
        entity_type: String,
        field: String,
        value: String,
    },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bson::ser::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] bson::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PlatformError {
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(
        entity_type: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::Duplicate {
            entity_type: entity_type.into(),
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// True when the error is a domain outcome the caller can act on,
    /// as opposed to an infrastructure failure.
    pub fn is_domain(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::Duplicate { .. }
                | Self::Validation { .. }
                | Self::InvalidState { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PlatformError>;

impl From<UseCaseError> for PlatformError {
    fn from(err: UseCaseError) -> Self {
        match err {
            UseCaseError::ValidationError { message, .. } => {
                PlatformError::Validation { message }
            }
            UseCaseError::BusinessRuleViolation { message, .. } => PlatformError::Duplicate {
                entity_type: "Subscriber".to_string(),
                field: "identity".to_string(),
                value: message,
            },
            UseCaseError::NotFoundError { message, .. } => PlatformError::NotFound {
                entity_type: "Subscriber".to_string(),
                id: message,
            },
            UseCaseError::InvalidStateError { message, .. } => {
                PlatformError::InvalidState { message }
            }
            UseCaseError::ConflictError { message, .. } => {
                PlatformError::Internal { message }
            }
            UseCaseError::CommitError { message, .. } => PlatformError::Internal { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infrastructure_distinct_from_domain() {
        let not_found = PlatformError::not_found("Subscriber", "abc");
        let internal = PlatformError::internal("connection reset");

        assert!(not_found.is_domain());
        assert!(!internal.is_domain());
    }

    #[test]
    fn test_use_case_error_mapping() {
        let err: PlatformError =
            UseCaseError::not_found("SUBSCRIBER_NOT_FOUND", "abc").into();
        assert!(matches!(err, PlatformError::NotFound { .. }));

        let err: PlatformError =
            UseCaseError::business_rule("EMAIL_EXISTS", "taken").into();
        assert!(matches!(err, PlatformError::Duplicate { .. }));
    }
}
