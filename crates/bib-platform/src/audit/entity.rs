//! Audit Log Entity
//!
//! Records every committed operation for compliance and debugging. The
//! operation name is the command type's simple name, the payload the
//! serialized command.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    #[serde(rename = "_id")]
    pub id: String,

    /// Entity type affected (e.g. "Subscriber").
    pub entity_type: String,

    /// Entity id affected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,

    /// Operation name - the command type's simple name
    /// (e.g. "MarkPenaltyCommand").
    pub operation: String,

    /// Full command payload as a JSON string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_json: Option<String>,

    /// Principal who performed the action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<String>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub performed_at: DateTime<Utc>,
}

impl AuditLog {
    /// Build an audit record from a command (for use in the unit of work).
    pub fn from_command<C: Serialize>(
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        command: &C,
        principal_id: Option<String>,
    ) -> Self {
        let command_name = std::any::type_name::<C>()
            .rsplit("::")
            .next()
            .unwrap_or("Unknown")
            .to_string();

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            entity_type: entity_type.into(),
            entity_id: Some(entity_id.into()),
            operation: command_name,
            operation_json: serde_json::to_string(command).ok(),
            principal_id,
            performed_at: Utc::now(),
        }
    }

    pub fn with_performed_at(mut self, time: DateTime<Utc>) -> Self {
        self.performed_at = time;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct FakeCommand {
        subscriber_id: String,
        reason: Option<String>,
    }

    #[test]
    fn test_from_command_captures_name_and_payload() {
        let cmd = FakeCommand {
            subscriber_id: "abc".to_string(),
            reason: Some("late return".to_string()),
        };

        let log = AuditLog::from_command("Subscriber", "abc", &cmd, Some("api".to_string()));

        assert_eq!(log.entity_type, "Subscriber");
        assert_eq!(log.entity_id.as_deref(), Some("abc"));
        assert_eq!(log.operation, "FakeCommand");
        assert!(log.operation_json.as_deref().unwrap().contains("late return"));
        assert_eq!(log.principal_id.as_deref(), Some("api"));
    }
}
