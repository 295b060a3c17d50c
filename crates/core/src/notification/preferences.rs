//! Per-user notification preferences: defaults, recipient filtering, quiet
//! hours, and the validated update DTO.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::notification::action::{Action, PreferenceField};
use crate::types::DbId;

/// Default lookback for merging batched notifications, in minutes.
pub const DEFAULT_BATCH_WINDOW_MINUTES: i32 = 30;

/// Default quiet-hours start (UTC hour, inclusive).
pub const DEFAULT_QUIET_START_HOUR: i32 = 22;

/// Default quiet-hours end (UTC hour, exclusive).
pub const DEFAULT_QUIET_END_HOUR: i32 = 8;

/// The decision-relevant subset of a `notification_preferences` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceFlags {
    pub user_id: DbId,
    pub social_enabled: bool,
    pub group_enabled: bool,
    pub invite_enabled: bool,
    pub content_enabled: bool,
    pub note_likes_enabled: bool,
    pub note_comments_enabled: bool,
    pub message_replies_enabled: bool,
    pub new_notes_enabled: bool,
    pub member_joins_enabled: bool,
    pub batch_similar: bool,
    pub batch_window_minutes: i32,
    pub quiet_hours_enabled: bool,
    pub quiet_start_hour: i32,
    pub quiet_end_hour: i32,
}

impl PreferenceFlags {
    /// Values used when a preference row is auto-created.
    ///
    /// `new_notes` and `member_joins` start disabled; everything else is on.
    pub fn defaults(user_id: DbId) -> Self {
        Self {
            user_id,
            social_enabled: true,
            group_enabled: true,
            invite_enabled: true,
            content_enabled: true,
            note_likes_enabled: true,
            note_comments_enabled: true,
            message_replies_enabled: true,
            new_notes_enabled: false,
            member_joins_enabled: false,
            batch_similar: true,
            batch_window_minutes: DEFAULT_BATCH_WINDOW_MINUTES,
            quiet_hours_enabled: false,
            quiet_start_hour: DEFAULT_QUIET_START_HOUR,
            quiet_end_hour: DEFAULT_QUIET_END_HOUR,
        }
    }

    pub fn is_enabled(&self, field: PreferenceField) -> bool {
        match field {
            PreferenceField::NoteLikesEnabled => self.note_likes_enabled,
            PreferenceField::NoteCommentsEnabled => self.note_comments_enabled,
            PreferenceField::MessageRepliesEnabled => self.message_replies_enabled,
            PreferenceField::GroupEnabled => self.group_enabled,
            PreferenceField::MemberJoinsEnabled => self.member_joins_enabled,
            PreferenceField::InviteEnabled => self.invite_enabled,
            PreferenceField::NewNotesEnabled => self.new_notes_enabled,
            PreferenceField::ContentEnabled => self.content_enabled,
        }
    }

    /// Whether this user accepts `action`. System actions always pass.
    pub fn allows(&self, action: Action) -> bool {
        action
            .preference_field()
            .map_or(true, |field| self.is_enabled(field))
    }

    /// Whether `hour` (0-23, UTC) falls inside the quiet-hours window.
    ///
    /// The window is `[start, end)` and wraps past midnight when
    /// `start > end`. Equal bounds describe an empty window.
    pub fn in_quiet_hours(&self, hour: u32) -> bool {
        if !self.quiet_hours_enabled {
            return false;
        }
        let hour = hour as i32;
        let (start, end) = (self.quiet_start_hour, self.quiet_end_hour);
        if start == end {
            false
        } else if start < end {
            hour >= start && hour < end
        } else {
            hour >= start || hour < end
        }
    }
}

/// Narrow `user_ids` to the recipients whose preferences allow `action`.
///
/// Users without a preference row are included (opt-out model). Order and
/// duplicates of the input are preserved.
pub fn filter_by_preferences(
    user_ids: &[DbId],
    action: Action,
    preferences: &[PreferenceFlags],
) -> Vec<DbId> {
    if action.preference_field().is_none() {
        return user_ids.to_vec();
    }

    let by_user: HashMap<DbId, &PreferenceFlags> =
        preferences.iter().map(|p| (p.user_id, p)).collect();

    user_ids
        .iter()
        .copied()
        .filter(|id| by_user.get(id).map_or(true, |p| p.allows(action)))
        .collect()
}

/// DTO for `PUT /notifications/preferences`. Only `Some` fields are written.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdatePreferences {
    pub social_enabled: Option<bool>,
    pub group_enabled: Option<bool>,
    pub invite_enabled: Option<bool>,
    pub content_enabled: Option<bool>,
    pub note_likes_enabled: Option<bool>,
    pub note_comments_enabled: Option<bool>,
    pub message_replies_enabled: Option<bool>,
    pub new_notes_enabled: Option<bool>,
    pub member_joins_enabled: Option<bool>,
    pub batch_similar: Option<bool>,
    #[validate(range(min = 1, max = 1440))]
    pub batch_window_minutes: Option<i32>,
    pub quiet_hours_enabled: Option<bool>,
    #[validate(range(min = 0, max = 23))]
    pub quiet_start_hour: Option<i32>,
    #[validate(range(min = 0, max = 23))]
    pub quiet_end_hour: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_disable_new_notes_and_member_joins() {
        let p = PreferenceFlags::defaults(1);
        assert!(!p.new_notes_enabled);
        assert!(!p.member_joins_enabled);
        assert!(p.note_likes_enabled && p.invite_enabled && p.batch_similar);
        assert_eq!(p.batch_window_minutes, 30);
        assert_eq!((p.quiet_start_hour, p.quiet_end_hour), (22, 8));
        assert!(!p.quiet_hours_enabled);
    }

    #[test]
    fn missing_row_defaults_to_include() {
        let kept = filter_by_preferences(&[1, 2], Action::NoteLiked, &[]);
        assert_eq!(kept, vec![1, 2]);
    }

    #[test]
    fn disabled_field_excludes_recipient() {
        let mut opted_out = PreferenceFlags::defaults(1);
        opted_out.note_likes_enabled = false;
        let kept = filter_by_preferences(&[1, 2], Action::NoteLiked, &[opted_out]);
        assert_eq!(kept, vec![2]);
    }

    #[test]
    fn comment_actions_share_the_comment_flag() {
        let mut p = PreferenceFlags::defaults(5);
        p.note_comments_enabled = false;
        for action in [Action::NoteCommented, Action::CommentLiked, Action::CommentReplied] {
            assert!(filter_by_preferences(&[5], action, &[p.clone()]).is_empty());
        }
        assert_eq!(filter_by_preferences(&[5], Action::NoteLiked, &[p]), vec![5]);
    }

    #[test]
    fn system_actions_are_never_filtered() {
        let mut p = PreferenceFlags::defaults(1);
        p.social_enabled = false;
        p.group_enabled = false;
        p.invite_enabled = false;
        p.content_enabled = false;
        for action in [Action::Welcome, Action::SystemAnnouncement] {
            assert_eq!(filter_by_preferences(&[1], action, &[p.clone()]), vec![1]);
        }
    }

    #[test]
    fn default_row_filters_member_joins() {
        let p = PreferenceFlags::defaults(4);
        assert!(filter_by_preferences(&[4], Action::MemberJoined, &[p]).is_empty());
    }

    #[test]
    fn quiet_hours_wrap_midnight() {
        let mut p = PreferenceFlags::defaults(1);
        assert!(!p.in_quiet_hours(23), "disabled window never matches");
        p.quiet_hours_enabled = true;
        assert!(p.in_quiet_hours(22));
        assert!(p.in_quiet_hours(3));
        assert!(!p.in_quiet_hours(8));
        assert!(!p.in_quiet_hours(12));
    }

    #[test]
    fn quiet_hours_same_day_window() {
        let mut p = PreferenceFlags::defaults(1);
        p.quiet_hours_enabled = true;
        p.quiet_start_hour = 9;
        p.quiet_end_hour = 17;
        assert!(p.in_quiet_hours(9));
        assert!(!p.in_quiet_hours(17));
        p.quiet_end_hour = 9;
        assert!(!p.in_quiet_hours(9), "equal bounds form an empty window");
    }

    #[test]
    fn update_dto_rejects_out_of_range_hours() {
        let input = UpdatePreferences {
            quiet_start_hour: Some(24),
            ..Default::default()
        };
        assert!(input.validate().is_err());

        let input = UpdatePreferences {
            batch_window_minutes: Some(0),
            ..Default::default()
        };
        assert!(input.validate().is_err());

        let input = UpdatePreferences {
            quiet_end_hour: Some(6),
            note_likes_enabled: Some(false),
            ..Default::default()
        };
        assert!(input.validate().is_ok());
    }
}
