//! Use Case Errors
//!
//! Categorized error types for operation failures. The categories let the
//! API-layer collaborator map outcomes without inspecting codes:
//! validation and business-rule failures are caller errors, commit failures
//! are infrastructure.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UseCaseError {
    /// Input failed a structural check (missing id, empty field).
    ValidationError { code: String, message: String },

    /// Business rule violation. Duplicate identity (email/phone collision)
    /// is reported here.
    BusinessRuleViolation { code: String, message: String },

    /// Subscriber not found.
    NotFoundError { code: String, message: String },

    /// Operation not permitted in the subscriber's current lifecycle state
    /// (e.g. mutating a deactivated record).
    InvalidStateError { code: String, message: String },

    /// The store rejected a conditional update; the caller may retry.
    ConflictError { code: String, message: String },

    /// Persisting the outcome failed. Infrastructure, not a caller error.
    CommitError { code: String, message: String },
}

impl UseCaseError {
    pub fn validation(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError { code: code.into(), message: message.into() }
    }

    pub fn business_rule(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BusinessRuleViolation { code: code.into(), message: message.into() }
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFoundError { code: code.into(), message: message.into() }
    }

    pub fn invalid_state(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidStateError { code: code.into(), message: message.into() }
    }

    pub fn conflict(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConflictError { code: code.into(), message: message.into() }
    }

    pub fn commit(message: impl Into<String>) -> Self {
        Self::CommitError {
            code: "COMMIT_FAILED".to_string(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::ValidationError { code, .. } => code,
            Self::BusinessRuleViolation { code, .. } => code,
            Self::NotFoundError { code, .. } => code,
            Self::InvalidStateError { code, .. } => code,
            Self::ConflictError { code, .. } => code,
            Self::CommitError { code, .. } => code,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::ValidationError { message, .. } => message,
            Self::BusinessRuleViolation { message, .. } => message,
            Self::NotFoundError { message, .. } => message,
            Self::InvalidStateError { message, .. } => message,
            Self::ConflictError { message, .. } => message,
            Self::CommitError { message, .. } => message,
        }
    }
}

impl std::fmt::Display for UseCaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message())
    }
}

impl std::error::Error for UseCaseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let err = UseCaseError::business_rule("EMAIL_EXISTS", "Email already registered");
        assert_eq!(err.code(), "EMAIL_EXISTS");
        assert_eq!(err.message(), "Email already registered");
        assert_eq!(err.to_string(), "[EMAIL_EXISTS] Email already registered");
    }

    #[test]
    fn test_serialization_tags_variant() {
        let err = UseCaseError::not_found("SUBSCRIBER_NOT_FOUND", "no such subscriber");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("NotFoundError"));
    }
}
