//! Notification content templates.
//!
//! [`generate_content`] is a pure lookup keyed by [`Action`]. The body is
//! kept as an actor segment plus a suffix ([`MessageBody`]) so that batching
//! can rewrite the actor segment without parsing the rendered text.

use serde::{Deserialize, Serialize};

use crate::notification::action::{Action, Category};
use crate::notification::metadata::NotificationMetadata;

/// Templated notification body: `"{actor} {suffix}"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    /// Actor segment. `None` for templates that do not start with an actor.
    pub actor: Option<String>,
    /// Everything after the actor segment.
    pub suffix: String,
}

impl MessageBody {
    pub fn with_actor(actor: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            actor: Some(actor.into()),
            suffix: suffix.into(),
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            actor: None,
            suffix: text.into(),
        }
    }

    /// Flatten to the display string stored in `notifications.message`.
    pub fn render(&self) -> String {
        match &self.actor {
            Some(actor) => format!("{actor} {}", self.suffix),
            None => self.suffix.clone(),
        }
    }
}

/// Output of [`generate_content`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationContent {
    pub title: String,
    pub body: MessageBody,
    pub category: Category,
    pub action_url: Option<String>,
}

impl NotificationContent {
    pub fn message(&self) -> String {
        self.body.render()
    }
}

/// Map an action and its metadata to display content.
pub fn generate_content(action: Action, metadata: &NotificationMetadata) -> NotificationContent {
    let actor = metadata.actor_name_or_default();
    let target = metadata.target_title_or_default();
    let group = metadata.group_name_or_default();

    let (title, body) = match action {
        Action::NoteLiked => (
            "New like on your note".to_string(),
            MessageBody::with_actor(actor, format!("liked your note \"{target}\"")),
        ),
        Action::NoteCommented => (
            "New comment on your note".to_string(),
            MessageBody::with_actor(actor, format!("commented on your note \"{target}\"")),
        ),
        Action::CommentLiked => (
            "New like on your comment".to_string(),
            MessageBody::with_actor(actor, format!("liked your comment on \"{target}\"")),
        ),
        Action::CommentReplied => (
            "New reply to your comment".to_string(),
            MessageBody::with_actor(actor, format!("replied to your comment on \"{target}\"")),
        ),
        Action::MessageReplied => (
            format!("New reply in {group}"),
            MessageBody::with_actor(actor, format!("replied to your message in {group}")),
        ),
        Action::GroupJoined => (
            format!("Welcome to {group}"),
            MessageBody::plain(format!("You are now a member of {group}")),
        ),
        Action::GroupLeft => (
            format!("Member left {group}"),
            MessageBody::with_actor(actor, format!("left {group}")),
        ),
        Action::MemberJoined => (
            format!("New member in {group}"),
            MessageBody::with_actor(actor, format!("joined {group}")),
        ),
        Action::GroupInvited => (
            "Study group invitation".to_string(),
            MessageBody::with_actor(actor, format!("invited you to join {group}")),
        ),
        Action::NoteCreated => (
            format!("New note in {group}"),
            MessageBody::with_actor(actor, format!("created a new note \"{target}\" in {group}")),
        ),
        Action::NoteShared => (
            format!("Note shared in {group}"),
            MessageBody::with_actor(actor, format!("shared \"{target}\" with {group}")),
        ),
        Action::MessageSent => (
            format!("New message in {group}"),
            MessageBody::with_actor(actor, format!("sent a message in {group}")),
        ),
        Action::Welcome => (
            "Welcome to StudyBuddy!".to_string(),
            MessageBody::plain("Create or join a study group to get started."),
        ),
        Action::SystemAnnouncement => (
            "Announcement".to_string(),
            MessageBody::plain(
                metadata
                    .preview_text
                    .clone()
                    .unwrap_or_else(|| target.to_string()),
            ),
        ),
    };

    NotificationContent {
        title,
        body,
        category: action.category(),
        action_url: action.action_url(metadata),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_action_has_non_empty_content() {
        let metadata = NotificationMetadata::default();
        for action in Action::ALL {
            let content = generate_content(action, &metadata);
            assert!(!content.title.is_empty(), "{action} has an empty title");
            assert!(!content.message().is_empty(), "{action} has an empty message");
            assert_eq!(content.category, action.category());
        }
    }

    #[test]
    fn note_liked_interpolates_actor_and_title() {
        let metadata = NotificationMetadata {
            actor_name: Some("Alice".into()),
            target_title: Some("Cell Biology".into()),
            ..Default::default()
        };
        let content = generate_content(Action::NoteLiked, &metadata);
        assert_eq!(content.message(), "Alice liked your note \"Cell Biology\"");
        assert_eq!(content.body.actor.as_deref(), Some("Alice"));
    }

    #[test]
    fn defaults_fill_missing_metadata() {
        let content = generate_content(Action::GroupInvited, &NotificationMetadata::default());
        assert_eq!(content.message(), "Someone invited you to join a group");
        assert_eq!(content.category, Category::Invite);
    }

    #[test]
    fn system_announcement_prefers_preview_text() {
        let metadata = NotificationMetadata {
            preview_text: Some("Maintenance tonight at 22:00 UTC".into()),
            ..Default::default()
        };
        let content = generate_content(Action::SystemAnnouncement, &metadata);
        assert_eq!(content.message(), "Maintenance tonight at 22:00 UTC");
        assert!(content.body.actor.is_none());
    }

    #[test]
    fn generation_is_deterministic() {
        let metadata = NotificationMetadata {
            actor_name: Some("Bo".into()),
            group_name: Some("Physics 101".into()),
            group_id: Some(9),
            ..Default::default()
        };
        assert_eq!(
            generate_content(Action::MemberJoined, &metadata),
            generate_content(Action::MemberJoined, &metadata)
        );
    }
}
