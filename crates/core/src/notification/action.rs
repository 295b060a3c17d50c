//! The closed set of notification actions and their static properties.
//!
//! Every action maps to exactly one [`Category`], one group-key template, one
//! deep-link shape, and at most one governing [`PreferenceField`]. System
//! actions have no preference field and are never filtered.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::notification::metadata::NotificationMetadata;

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Top-level grouping used by the notification list UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Social,
    Group,
    Invite,
    Content,
    System,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Social => "social",
            Self::Group => "group",
            Self::Invite => "invite",
            Self::Content => "content",
            Self::System => "system",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "social" => Ok(Self::Social),
            "group" => Ok(Self::Group),
            "invite" => Ok(Self::Invite),
            "content" => Ok(Self::Content),
            "system" => Ok(Self::System),
            _ => Err(CoreError::Validation(format!(
                "Invalid notification category '{s}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Delivery priority. Only `High` rows can raise an alert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "low" => Ok(Self::Low),
            "normal" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            _ => Err(CoreError::Validation(format!(
                "Invalid notification priority '{s}'. Must be one of: low, normal, high"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// PreferenceField
// ---------------------------------------------------------------------------

/// A boolean column of `notification_preferences` that can gate an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferenceField {
    NoteLikesEnabled,
    NoteCommentsEnabled,
    MessageRepliesEnabled,
    GroupEnabled,
    MemberJoinsEnabled,
    InviteEnabled,
    NewNotesEnabled,
    ContentEnabled,
}

impl PreferenceField {
    /// Column name in `notification_preferences`.
    pub fn column(&self) -> &'static str {
        match self {
            Self::NoteLikesEnabled => "note_likes_enabled",
            Self::NoteCommentsEnabled => "note_comments_enabled",
            Self::MessageRepliesEnabled => "message_replies_enabled",
            Self::GroupEnabled => "group_enabled",
            Self::MemberJoinsEnabled => "member_joins_enabled",
            Self::InviteEnabled => "invite_enabled",
            Self::NewNotesEnabled => "new_notes_enabled",
            Self::ContentEnabled => "content_enabled",
        }
    }
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// A domain event that can produce a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    NoteLiked,
    NoteCommented,
    CommentLiked,
    CommentReplied,
    MessageReplied,
    GroupJoined,
    GroupLeft,
    MemberJoined,
    GroupInvited,
    NoteCreated,
    NoteShared,
    MessageSent,
    Welcome,
    SystemAnnouncement,
}

impl Action {
    /// Every action, in table order.
    pub const ALL: [Action; 14] = [
        Self::NoteLiked,
        Self::NoteCommented,
        Self::CommentLiked,
        Self::CommentReplied,
        Self::MessageReplied,
        Self::GroupJoined,
        Self::GroupLeft,
        Self::MemberJoined,
        Self::GroupInvited,
        Self::NoteCreated,
        Self::NoteShared,
        Self::MessageSent,
        Self::Welcome,
        Self::SystemAnnouncement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoteLiked => "note_liked",
            Self::NoteCommented => "note_commented",
            Self::CommentLiked => "comment_liked",
            Self::CommentReplied => "comment_replied",
            Self::MessageReplied => "message_replied",
            Self::GroupJoined => "group_joined",
            Self::GroupLeft => "group_left",
            Self::MemberJoined => "member_joined",
            Self::GroupInvited => "group_invited",
            Self::NoteCreated => "note_created",
            Self::NoteShared => "note_shared",
            Self::MessageSent => "message_sent",
            Self::Welcome => "welcome",
            Self::SystemAnnouncement => "system_announcement",
        }
    }

    /// Parse an action from its stored text form.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Invalid notification action '{s}'")))
    }

    pub fn category(&self) -> Category {
        match self {
            Self::NoteLiked
            | Self::NoteCommented
            | Self::CommentLiked
            | Self::CommentReplied
            | Self::MessageReplied => Category::Social,
            Self::GroupJoined | Self::GroupLeft | Self::MemberJoined => Category::Group,
            Self::GroupInvited => Category::Invite,
            Self::NoteCreated | Self::NoteShared | Self::MessageSent => Category::Content,
            Self::Welcome | Self::SystemAnnouncement => Category::System,
        }
    }

    /// The preference column that can suppress this action, or `None` for
    /// system actions which are always delivered.
    pub fn preference_field(&self) -> Option<PreferenceField> {
        match self {
            Self::NoteLiked => Some(PreferenceField::NoteLikesEnabled),
            Self::NoteCommented | Self::CommentLiked | Self::CommentReplied => {
                Some(PreferenceField::NoteCommentsEnabled)
            }
            Self::MessageReplied => Some(PreferenceField::MessageRepliesEnabled),
            Self::GroupJoined | Self::GroupLeft => Some(PreferenceField::GroupEnabled),
            Self::MemberJoined => Some(PreferenceField::MemberJoinsEnabled),
            Self::GroupInvited => Some(PreferenceField::InviteEnabled),
            Self::NoteCreated => Some(PreferenceField::NewNotesEnabled),
            Self::NoteShared | Self::MessageSent => Some(PreferenceField::ContentEnabled),
            Self::Welcome | Self::SystemAnnouncement => None,
        }
    }

    /// Derive the deterministic group key for this action.
    ///
    /// Missing identifiers render as `none` so the key stays stable.
    pub fn group_key(&self, metadata: &NotificationMetadata) -> String {
        let target = id_or_none(metadata.target_id);
        let group = id_or_none(metadata.group_id);
        match self {
            Self::NoteLiked => format!("note-like-{target}"),
            Self::NoteCommented => format!("note-comment-{target}"),
            Self::CommentLiked => format!("comment-like-{target}"),
            Self::CommentReplied => format!("comment_replied-{target}"),
            Self::MessageReplied => format!("message_replied-{target}"),
            Self::GroupJoined => format!("group_joined-{group}"),
            Self::GroupLeft => format!("group_left-{group}"),
            Self::MemberJoined => format!("member-join-{group}"),
            Self::GroupInvited => format!("group_invited-{target}"),
            Self::NoteCreated => format!("note-create-{group}"),
            Self::NoteShared => format!("note_shared-{group}"),
            Self::MessageSent => format!("message_sent-{group}"),
            Self::Welcome => "welcome-general".to_string(),
            Self::SystemAnnouncement => "system_announcement-general".to_string(),
        }
    }

    /// Deep link into the web client for this action, if one can be built.
    pub fn action_url(&self, metadata: &NotificationMetadata) -> Option<String> {
        match self {
            Self::NoteLiked
            | Self::NoteCommented
            | Self::CommentLiked
            | Self::CommentReplied
            | Self::NoteCreated
            | Self::NoteShared => {
                let group_id = metadata.group_id?;
                let note_id = metadata.note_id.or(metadata.target_id)?;
                Some(format!("/groups/{group_id}?tab=notes&n={note_id}&m=view"))
            }
            Self::MessageReplied | Self::MessageSent => metadata
                .group_id
                .map(|group_id| format!("/groups/{group_id}?tab=chat")),
            Self::GroupJoined | Self::GroupLeft | Self::MemberJoined => metadata
                .group_id
                .map(|group_id| format!("/groups/{group_id}")),
            Self::GroupInvited => Some("/dashboard/notifications".to_string()),
            Self::Welcome | Self::SystemAnnouncement => Some("/dashboard".to_string()),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn id_or_none(id: Option<crate::types::DbId>) -> String {
    id.map(|v| v.to_string()).unwrap_or_else(|| "none".to_string())
}
