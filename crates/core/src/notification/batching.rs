//! Pure merge rules for batched notifications.
//!
//! When a batched event arrives and the recipient already has an unread row
//! with the same group key inside the lookback window, the row absorbs the
//! event instead of a new row being created. This module computes the merged
//! state; the dispatcher owns the read/write against the store.

use chrono::Duration;
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::notification::content::MessageBody;
use crate::notification::preferences::{PreferenceFlags, DEFAULT_BATCH_WINDOW_MINUTES};
use crate::types::Timestamp;

/// Maximum attempts for an optimistic merge before falling back to an error.
pub const MAX_MERGE_ATTEMPTS: u32 = 3;

/// Earliest `created_at` that can still absorb a new event.
pub fn lookback_cutoff(now: Timestamp, window_minutes: i32) -> Timestamp {
    now - Duration::minutes(i64::from(window_minutes.max(0)))
}

/// Batching policy for one recipient, derived from their preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPolicy {
    pub enabled: bool,
    pub window_minutes: i32,
}

impl BatchPolicy {
    /// Policy for a recipient; missing preferences use the defaults.
    pub fn for_recipient(preferences: Option<&PreferenceFlags>) -> Self {
        match preferences {
            Some(p) => Self {
                enabled: p.batch_similar,
                window_minutes: p.batch_window_minutes,
            },
            None => Self::default(),
        }
    }
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            window_minutes: DEFAULT_BATCH_WINDOW_MINUTES,
        }
    }
}

/// Actor segment for a batch of `total` occurrences, led by `latest_actor`.
///
/// `total` includes the latest actor: 2 renders "X and 1 other", 3+ renders
/// "X and N-1 others". A single occurrence is just the actor name.
pub fn batched_actor_label(latest_actor: &str, total: i64) -> String {
    match total {
        i64::MIN..=1 => latest_actor.to_string(),
        2 => format!("{latest_actor} and 1 other"),
        n => format!("{latest_actor} and {} others", n - 1),
    }
}

/// The existing row a new event is merged into.
///
/// `metadata` is the stored JSON object as-is. Merging only touches the
/// batch keys, so every other key survives untouched.
#[derive(Debug, Clone)]
pub struct MergeTarget {
    pub body: MessageBody,
    pub metadata: serde_json::Value,
}

/// New state for a row after absorbing one more event.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedNotification {
    pub body: MessageBody,
    pub metadata: serde_json::Value,
    pub count: i64,
}

impl MergedNotification {
    pub fn message(&self) -> String {
        self.body.render()
    }
}

/// Batched occurrence count stored under `count`; absent means 1.
///
/// Integer strings are accepted. Anything else is an error.
fn stored_count(metadata: &Map<String, Value>) -> Result<i64, CoreError> {
    match metadata.get("count") {
        None | Some(Value::Null) => Ok(1),
        Some(Value::Number(n)) => n.as_i64().ok_or_else(|| bad_count(n)),
        Some(Value::String(s)) => s.trim().parse().map_err(|_| bad_count(s)),
        Some(other) => Err(bad_count(other)),
    }
}

fn bad_count(value: impl std::fmt::Display) -> CoreError {
    CoreError::Internal(format!("Batched notification has a malformed count: {value}"))
}

/// Fold an event by `new_actor` into `target`.
///
/// The count starts from the stored counter (1 when absent) and increases by
/// one. Actor-less bodies keep their text and only bump the counter. Stored
/// metadata that is not an object, or whose counter is not an integer, fails
/// the merge instead of being replaced.
pub fn merge(
    target: &MergeTarget,
    new_actor: &str,
    now: Timestamp,
) -> Result<MergedNotification, CoreError> {
    let Value::Object(stored) = &target.metadata else {
        return Err(CoreError::Internal(
            "Batched notification metadata is not a JSON object".to_string(),
        ));
    };
    let count = stored_count(stored)? + 1;

    let body = match &target.body.actor {
        Some(_) => MessageBody::with_actor(
            batched_actor_label(new_actor, count),
            target.body.suffix.clone(),
        ),
        None => target.body.clone(),
    };

    let mut metadata = stored.clone();
    metadata.insert("count".to_string(), Value::from(count));
    metadata.insert("latest_actor".to_string(), Value::from(new_actor));
    metadata.insert("latest_at".to_string(), serde_json::json!(now));

    Ok(MergedNotification {
        body,
        metadata: Value::Object(metadata),
        count,
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::*;
    use crate::notification::metadata::NotificationMetadata;

    fn liked_note_target(actor: &str) -> MergeTarget {
        MergeTarget {
            body: MessageBody::with_actor(actor, "liked your note \"Organic Chem\""),
            metadata: NotificationMetadata {
                actor_name: Some(actor.to_string()),
                ..Default::default()
            }
            .to_json(),
        }
    }

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn typed(merged: &MergedNotification) -> NotificationMetadata {
        NotificationMetadata::from_json(&merged.metadata).unwrap()
    }

    #[test]
    fn labels_pluralize_by_total() {
        assert_eq!(batched_actor_label("Ana", 1), "Ana");
        assert_eq!(batched_actor_label("Ana", 2), "Ana and 1 other");
        assert_eq!(batched_actor_label("Ana", 5), "Ana and 4 others");
    }

    #[test]
    fn first_merge_counts_two() {
        let merged = merge(&liked_note_target("Alice"), "Bob", now()).unwrap();
        assert_eq!(merged.count, 2);
        assert_eq!(merged.message(), "Bob and 1 other liked your note \"Organic Chem\"");
        let metadata = typed(&merged);
        assert_eq!(metadata.latest_actor.as_deref(), Some("Bob"));
        assert_eq!(metadata.latest_at, Some(now()));
        assert_eq!(metadata.actor_name.as_deref(), Some("Alice"));
    }

    #[test]
    fn repeated_merges_accumulate() {
        let mut target = liked_note_target("Alice");
        for actor in ["Bob", "Cy"] {
            let merged = merge(&target, actor, now()).unwrap();
            target = MergeTarget {
                body: merged.body,
                metadata: merged.metadata,
            };
        }
        assert_eq!(target.metadata["count"], 3);
        assert_eq!(target.body.render(), "Cy and 2 others liked your note \"Organic Chem\"");
    }

    #[test]
    fn merge_keeps_keys_it_does_not_own() {
        let target = MergeTarget {
            body: MessageBody::with_actor("Alice", "liked your note \"Enzymes\""),
            metadata: json!({
                "actor_name": "Alice",
                "actor_id": 4,
                "group_id": 7,
                "note_title": "Enzymes",
                "count": "2",
                "reaction": {"emoji": "tada"}
            }),
        };
        let merged = merge(&target, "Bob", now()).unwrap();

        assert_eq!(merged.count, 3);
        assert_eq!(merged.metadata["count"], 3);
        assert_eq!(merged.metadata["actor_id"], 4);
        assert_eq!(merged.metadata["group_id"], 7);
        assert_eq!(merged.metadata["note_title"], "Enzymes");
        assert_eq!(merged.metadata["reaction"]["emoji"], "tada");
        assert_eq!(merged.metadata["latest_actor"], "Bob");
        assert_eq!(merged.message(), "Bob and 2 others liked your note \"Enzymes\"");
    }

    #[test]
    fn malformed_metadata_fails_the_merge() {
        let body = MessageBody::with_actor("Alice", "liked your note");
        let malformed = [
            json!("not an object"),
            json!({"count": "many"}),
            json!({"count": 1.5}),
        ];
        for metadata in malformed {
            let target = MergeTarget {
                body: body.clone(),
                metadata,
            };
            assert_matches!(merge(&target, "Bob", now()), Err(CoreError::Internal(_)));
        }
    }

    #[test]
    fn suffix_survives_multi_word_actor_names() {
        let target = liked_note_target("Mary Jane Watson");
        let merged = merge(&target, "Peter Parker", now()).unwrap();
        assert_eq!(
            merged.message(),
            "Peter Parker and 1 other liked your note \"Organic Chem\""
        );
    }

    #[test]
    fn actorless_body_only_bumps_count() {
        let target = MergeTarget {
            body: MessageBody::plain("Create or join a study group to get started."),
            metadata: json!({}),
        };
        let merged = merge(&target, "Someone", now()).unwrap();
        assert_eq!(merged.count, 2);
        assert_eq!(merged.message(), target.body.render());
    }

    #[test]
    fn cutoff_subtracts_window() {
        let cutoff = lookback_cutoff(now(), 30);
        assert_eq!(now() - cutoff, Duration::minutes(30));
    }

    #[test]
    fn policy_follows_preferences() {
        assert_eq!(BatchPolicy::for_recipient(None), BatchPolicy::default());
        let mut p = PreferenceFlags::defaults(1);
        p.batch_similar = false;
        p.batch_window_minutes = 10;
        let policy = BatchPolicy::for_recipient(Some(&p));
        assert!(!policy.enabled);
        assert_eq!(policy.window_minutes, 10);
    }
}
