//! Structured metadata stored in `notifications.metadata` (JSONB).

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Fallback actor name used by content templates.
pub const DEFAULT_ACTOR_NAME: &str = "Someone";

/// Fallback target title used by content templates.
pub const DEFAULT_TARGET_TITLE: &str = "your content";

/// Fallback group name used by content templates.
pub const DEFAULT_GROUP_NAME: &str = "a group";

/// Key/value bag attached to every notification. All fields are optional;
/// unknown keys are preserved in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<DbId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<DbId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<DbId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_id: Option<DbId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invite_token: Option<String>,
    /// Number of batched occurrences; absent means 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_actor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_at: Option<Timestamp>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl NotificationMetadata {
    pub fn actor_name_or_default(&self) -> &str {
        self.actor_name.as_deref().unwrap_or(DEFAULT_ACTOR_NAME)
    }

    pub fn target_title_or_default(&self) -> &str {
        self.target_title.as_deref().unwrap_or(DEFAULT_TARGET_TITLE)
    }

    pub fn group_name_or_default(&self) -> &str {
        self.group_name.as_deref().unwrap_or(DEFAULT_GROUP_NAME)
    }

    /// Parse from a stored JSON value.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, CoreError> {
        serde_json::from_value(value.clone())
            .map_err(|e| CoreError::Internal(format!("Malformed notification metadata: {e}")))
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_fields_missing() {
        let m = NotificationMetadata::default();
        assert_eq!(m.actor_name_or_default(), "Someone");
        assert_eq!(m.target_title_or_default(), "your content");
        assert_eq!(m.group_name_or_default(), "a group");
    }

    #[test]
    fn unknown_keys_survive_json_round_trip() {
        let raw = serde_json::json!({ "actor_name": "Ada", "emoji": "tada" });
        let m = NotificationMetadata::from_json(&raw).unwrap();
        assert_eq!(m.actor_name.as_deref(), Some("Ada"));
        assert_eq!(m.to_json()["emoji"], "tada");
        assert!(m.to_json().get("count").is_none());
    }

    #[test]
    fn mistyped_keys_are_reported() {
        for raw in [
            serde_json::json!("not an object"),
            serde_json::json!({ "actor_name": "Ada", "group_id": "seven" }),
        ] {
            assert!(matches!(
                NotificationMetadata::from_json(&raw),
                Err(CoreError::Internal(_))
            ));
        }
    }
}
