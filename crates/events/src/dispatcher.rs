//! Notification dispatcher.
//!
//! [`NotificationDispatcher::create_notification`] narrows recipients by
//! preference, renders content once, then per recipient either merges into
//! an open batch row or inserts a new row. Newly inserted high-priority rows
//! are signalled to the [`AlertSink`] when the caller asks for it, unless
//! the recipient is inside their quiet hours.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{Timelike, Utc};
use studybuddy_core::error::CoreError;
use studybuddy_core::notification::batching::{
    self, lookback_cutoff, BatchPolicy, MergeTarget, MAX_MERGE_ATTEMPTS,
};
use studybuddy_core::notification::{
    filter_by_preferences, generate_content, Action, NotificationContent, NotificationMetadata,
    PreferenceFlags, Priority,
};
use studybuddy_core::types::{DbId, Timestamp};
use studybuddy_db::models::notification::{NewNotification, Notification, NotificationMerge};
use studybuddy_db::repositories::{NotificationPreferenceRepo, NotificationRepo};
use studybuddy_db::DbPool;

use crate::alert::{AlertSignal, AlertSink};
use crate::error::EventError;

// ---------------------------------------------------------------------------
// Options / outcome
// ---------------------------------------------------------------------------

/// Per-call dispatch options.
#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    pub priority: Priority,
    /// Batching key. Batching is only attempted when this is set.
    pub group_key: Option<String>,
    /// Signal the alert sink for newly inserted high-priority rows.
    pub alert: bool,
}

impl DispatchOptions {
    pub fn high_priority() -> Self {
        Self {
            priority: Priority::High,
            ..Default::default()
        }
    }

    pub fn batched(group_key: impl Into<String>) -> Self {
        Self {
            group_key: Some(group_key.into()),
            ..Default::default()
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_alert(mut self, alert: bool) -> Self {
        self.alert = alert;
        self
    }
}

/// What happened for one recipient.
#[derive(Debug, Clone)]
pub enum Dispatched {
    Inserted(Notification),
    Merged(Notification),
}

impl Dispatched {
    pub fn notification(&self) -> &Notification {
        match self {
            Self::Inserted(row) | Self::Merged(row) => row,
        }
    }

    pub fn is_merged(&self) -> bool {
        matches!(self, Self::Merged(_))
    }
}

// ---------------------------------------------------------------------------
// NotificationDispatcher
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct NotificationDispatcher {
    pool: DbPool,
    alerts: Arc<dyn AlertSink>,
}

impl NotificationDispatcher {
    pub fn new(pool: DbPool, alerts: Arc<dyn AlertSink>) -> Self {
        Self { pool, alerts }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Create or merge notifications for `recipients`.
    ///
    /// Duplicate recipient ids are collapsed. Returns one entry per recipient
    /// that passed the preference filter. Persistence errors propagate.
    pub async fn create_notification(
        &self,
        recipients: &[DbId],
        action: Action,
        metadata: NotificationMetadata,
        options: DispatchOptions,
    ) -> Result<Vec<Dispatched>, EventError> {
        let mut seen = HashSet::new();
        let recipients: Vec<DbId> = recipients
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();
        if recipients.is_empty() {
            return Ok(Vec::new());
        }

        let preferences: Vec<PreferenceFlags> =
            NotificationPreferenceRepo::list_for_users(&self.pool, &recipients)
                .await?
                .iter()
                .map(|row| row.flags())
                .collect();
        let allowed = filter_by_preferences(&recipients, action, &preferences);
        let filtered = recipients.len() - allowed.len();
        if allowed.is_empty() {
            tracing::debug!(action = %action, filtered, "All recipients filtered by preferences");
            return Ok(Vec::new());
        }

        let by_user: HashMap<DbId, &PreferenceFlags> =
            preferences.iter().map(|p| (p.user_id, p)).collect();
        let content = generate_content(action, &metadata);
        let group_key = options
            .group_key
            .clone()
            .unwrap_or_else(|| action.group_key(&metadata));

        let mut results = Vec::with_capacity(allowed.len());
        let mut alerted = 0usize;
        for user_id in allowed {
            let prefs = by_user.get(&user_id).copied();
            let policy = BatchPolicy::for_recipient(prefs);

            let outcome = if options.group_key.is_some() && policy.enabled {
                self.merge_or_insert(
                    user_id,
                    action,
                    &metadata,
                    &content,
                    &group_key,
                    &options,
                    policy,
                )
                .await?
            } else {
                Dispatched::Inserted(
                    self.insert(user_id, action, &metadata, &content, &group_key, &options)
                        .await?,
                )
            };

            if let Dispatched::Inserted(row) = &outcome {
                if should_alert(&options, prefs, Utc::now()) {
                    self.alerts.signal(AlertSignal::from(row)).await;
                    alerted += 1;
                }
            }
            results.push(outcome);
        }

        let merged = results.iter().filter(|d| d.is_merged()).count();
        tracing::info!(
            action = %action,
            inserted = results.len() - merged,
            merged,
            filtered,
            alerted,
            "Notifications dispatched"
        );

        Ok(results)
    }

    async fn insert(
        &self,
        user_id: DbId,
        action: Action,
        metadata: &NotificationMetadata,
        content: &NotificationContent,
        group_key: &str,
        options: &DispatchOptions,
    ) -> Result<Notification, EventError> {
        let input = NewNotification {
            user_id,
            action,
            priority: options.priority,
            title: content.title.clone(),
            body: content.body.clone(),
            metadata: metadata.clone(),
            action_url: content.action_url.clone(),
            group_key: group_key.to_string(),
        };
        Ok(NotificationRepo::insert(&self.pool, &input).await?)
    }

    /// Merge into the recipient's open batch row, or insert when none exists.
    ///
    /// The lookback is the recipient's `batch_window_minutes` preference
    /// (30 minutes by default), not a fixed window; recipients with
    /// `batch_similar` off never reach this path.
    ///
    /// The merge is a compare-and-swap on the row version. A lost race
    /// re-reads the candidate; after [`MAX_MERGE_ATTEMPTS`] losses the
    /// dispatch fails with a conflict. Two concurrent first events can still
    /// both insert. Stored metadata that cannot be merged fails the dispatch
    /// and leaves the row untouched.
    #[allow(clippy::too_many_arguments)]
    async fn merge_or_insert(
        &self,
        user_id: DbId,
        action: Action,
        metadata: &NotificationMetadata,
        content: &NotificationContent,
        group_key: &str,
        options: &DispatchOptions,
        policy: BatchPolicy,
    ) -> Result<Dispatched, EventError> {
        let actor = metadata.actor_name_or_default();

        for attempt in 1..=MAX_MERGE_ATTEMPTS {
            let now = Utc::now();
            let cutoff = lookback_cutoff(now, policy.window_minutes);
            let Some(candidate) =
                NotificationRepo::find_merge_candidate(&self.pool, user_id, group_key, cutoff)
                    .await?
            else {
                let row = self
                    .insert(user_id, action, metadata, content, group_key, options)
                    .await?;
                return Ok(Dispatched::Inserted(row));
            };

            let target = MergeTarget {
                body: candidate.body(),
                metadata: candidate.metadata.clone(),
            };
            let merged = batching::merge(&target, actor, now).map_err(|e| {
                tracing::error!(
                    notification_id = candidate.id,
                    user_id,
                    error = %e,
                    "Cannot merge into batched notification"
                );
                e
            })?;
            let update = NotificationMerge {
                body: merged.body,
                metadata: merged.metadata,
                bumped_at: now,
            };

            let applied =
                NotificationRepo::apply_merge(&self.pool, candidate.id, candidate.version, &update)
                    .await?;
            if let Some(row) = applied {
                tracing::debug!(
                    notification_id = row.id,
                    user_id,
                    group_key,
                    count = merged.count,
                    "Merged into batched notification"
                );
                return Ok(Dispatched::Merged(row));
            }

            tracing::debug!(
                notification_id = candidate.id,
                attempt,
                "Batched notification changed concurrently, retrying merge"
            );
        }

        Err(CoreError::Conflict(format!(
            "Could not merge into batch '{group_key}' for user {user_id} \
             after {MAX_MERGE_ATTEMPTS} attempts"
        ))
        .into())
    }
}

/// Whether a newly inserted row should be signalled at `now`.
fn should_alert(
    options: &DispatchOptions,
    prefs: Option<&PreferenceFlags>,
    now: Timestamp,
) -> bool {
    options.alert
        && options.priority == Priority::High
        && !prefs.is_some_and(|p| p.in_quiet_hours(now.hour()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at_hour(hour: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 1, hour, 15, 0).unwrap()
    }

    #[test]
    fn alerts_need_high_priority_and_opt_in() {
        let normal = DispatchOptions::default().with_alert(true);
        let high_no_alert = DispatchOptions::high_priority();
        let high = DispatchOptions::high_priority().with_alert(true);
        assert!(!should_alert(&normal, None, at_hour(12)));
        assert!(!should_alert(&high_no_alert, None, at_hour(12)));
        assert!(should_alert(&high, None, at_hour(12)));
    }

    #[test]
    fn quiet_hours_suppress_alerts() {
        let high = DispatchOptions::high_priority().with_alert(true);
        let mut prefs = PreferenceFlags::defaults(1);
        prefs.quiet_hours_enabled = true;
        assert!(!should_alert(&high, Some(&prefs), at_hour(23)));
        assert!(!should_alert(&high, Some(&prefs), at_hour(2)));
        assert!(should_alert(&high, Some(&prefs), at_hour(9)));
    }

    #[test]
    fn options_builders_compose() {
        let opts = DispatchOptions::batched("note-like-4").with_priority(Priority::Low);
        assert_eq!(opts.group_key.as_deref(), Some("note-like-4"));
        assert_eq!(opts.priority, Priority::Low);
        assert!(!opts.alert);
    }
}
