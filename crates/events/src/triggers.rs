//! One entry point per domain event.
//!
//! Each trigger drops the actor from its recipients, shapes the metadata,
//! picks priority and batching, and hands off to the dispatcher. Triggers
//! never fail: errors are logged and swallowed so the action that caused the
//! notification always succeeds. Only likes, member joins and new notes are
//! batched.

use std::sync::Arc;

use studybuddy_core::notification::{Action, NotificationMetadata, Priority};
use studybuddy_core::types::DbId;

use crate::delivery::email::{EmailDelivery, InviteEmail};
use crate::dispatcher::{DispatchOptions, NotificationDispatcher};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// The user whose action caused the notification.
#[derive(Debug, Clone)]
pub struct ActorInfo {
    pub id: DbId,
    pub name: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GroupRef {
    pub id: DbId,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct NoteRef {
    pub id: DbId,
    pub title: String,
    pub group: GroupRef,
}

/// Who an invite is addressed to.
#[derive(Debug, Clone)]
pub enum Invitee {
    /// An existing user; receives an in-app notification.
    User(DbId),
    /// Someone without an account; receives an email.
    Email(String),
}

// ---------------------------------------------------------------------------
// Metadata helpers
// ---------------------------------------------------------------------------

fn actor_metadata(actor: &ActorInfo) -> NotificationMetadata {
    NotificationMetadata {
        actor_id: Some(actor.id),
        actor_name: Some(actor.name.clone()),
        actor_avatar: actor.avatar.clone(),
        ..Default::default()
    }
}

fn with_group(mut metadata: NotificationMetadata, group: &GroupRef) -> NotificationMetadata {
    metadata.group_id = Some(group.id);
    metadata.group_name = Some(group.name.clone());
    metadata
}

fn with_note(metadata: NotificationMetadata, note: &NoteRef) -> NotificationMetadata {
    let mut metadata = with_group(metadata, &note.group);
    metadata.target_id = Some(note.id);
    metadata.target_type = Some("note".to_string());
    metadata.target_title = Some(note.title.clone());
    metadata.note_id = Some(note.id);
    metadata.note_title = Some(note.title.clone());
    metadata
}

/// Recipients minus the actor, preserving order.
fn others(recipients: &[DbId], actor_id: DbId) -> Vec<DbId> {
    recipients
        .iter()
        .copied()
        .filter(|id| *id != actor_id)
        .collect()
}

// ---------------------------------------------------------------------------
// NotificationTriggers
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct NotificationTriggers {
    dispatcher: NotificationDispatcher,
    email: Option<Arc<EmailDelivery>>,
    alerts_enabled: bool,
}

impl NotificationTriggers {
    pub fn new(
        dispatcher: NotificationDispatcher,
        email: Option<Arc<EmailDelivery>>,
        alerts_enabled: bool,
    ) -> Self {
        Self {
            dispatcher,
            email,
            alerts_enabled,
        }
    }

    async fn dispatch(
        &self,
        recipients: &[DbId],
        action: Action,
        metadata: NotificationMetadata,
        options: DispatchOptions,
    ) {
        if recipients.is_empty() {
            tracing::debug!(action = %action, "No recipients after self-notification guard");
            return;
        }
        if let Err(e) = self
            .dispatcher
            .create_notification(recipients, action, metadata, options)
            .await
        {
            tracing::error!(action = %action, error = %e, "Failed to dispatch notification");
        }
    }

    pub async fn notify_note_liked(&self, owner_id: DbId, actor: &ActorInfo, note: &NoteRef) {
        let metadata = with_note(actor_metadata(actor), note);
        let key = Action::NoteLiked.group_key(&metadata);
        self.dispatch(
            &others(&[owner_id], actor.id),
            Action::NoteLiked,
            metadata,
            DispatchOptions::batched(key),
        )
        .await;
    }

    pub async fn notify_note_commented(
        &self,
        owner_id: DbId,
        actor: &ActorInfo,
        note: &NoteRef,
        preview: &str,
    ) {
        let mut metadata = with_note(actor_metadata(actor), note);
        metadata.preview_text = Some(preview.to_string());
        self.dispatch(
            &others(&[owner_id], actor.id),
            Action::NoteCommented,
            metadata,
            DispatchOptions::default(),
        )
        .await;
    }

    pub async fn notify_comment_liked(
        &self,
        comment_author_id: DbId,
        actor: &ActorInfo,
        note: &NoteRef,
        comment_id: DbId,
    ) {
        let mut metadata = with_note(actor_metadata(actor), note);
        metadata.target_id = Some(comment_id);
        metadata.target_type = Some("comment".to_string());
        let key = Action::CommentLiked.group_key(&metadata);
        self.dispatch(
            &others(&[comment_author_id], actor.id),
            Action::CommentLiked,
            metadata,
            DispatchOptions::batched(key),
        )
        .await;
    }

    pub async fn notify_comment_replied(
        &self,
        comment_author_id: DbId,
        actor: &ActorInfo,
        note: &NoteRef,
        comment_id: DbId,
        preview: &str,
    ) {
        let mut metadata = with_note(actor_metadata(actor), note);
        metadata.target_id = Some(comment_id);
        metadata.target_type = Some("comment".to_string());
        metadata.preview_text = Some(preview.to_string());
        self.dispatch(
            &others(&[comment_author_id], actor.id),
            Action::CommentReplied,
            metadata,
            DispatchOptions::default(),
        )
        .await;
    }

    pub async fn notify_message_replied(
        &self,
        original_sender_id: DbId,
        actor: &ActorInfo,
        group: &GroupRef,
        message_id: DbId,
        preview: &str,
    ) {
        let mut metadata = with_group(actor_metadata(actor), group);
        metadata.target_id = Some(message_id);
        metadata.target_type = Some("message".to_string());
        metadata.preview_text = Some(preview.to_string());
        self.dispatch(
            &others(&[original_sender_id], actor.id),
            Action::MessageReplied,
            metadata,
            DispatchOptions::default(),
        )
        .await;
    }

    /// Confirmation to a user that they joined `group`.
    pub async fn notify_group_joined(&self, user_id: DbId, group: &GroupRef) {
        let metadata = with_group(NotificationMetadata::default(), group);
        self.dispatch(&[user_id], Action::GroupJoined, metadata, DispatchOptions::default())
            .await;
    }

    pub async fn notify_group_left(
        &self,
        member_ids: &[DbId],
        actor: &ActorInfo,
        group: &GroupRef,
    ) {
        let metadata = with_group(actor_metadata(actor), group);
        self.dispatch(
            &others(member_ids, actor.id),
            Action::GroupLeft,
            metadata,
            DispatchOptions::default().with_priority(Priority::Low),
        )
        .await;
    }

    pub async fn notify_member_joined(
        &self,
        member_ids: &[DbId],
        actor: &ActorInfo,
        group: &GroupRef,
    ) {
        let metadata = with_group(actor_metadata(actor), group);
        let key = Action::MemberJoined.group_key(&metadata);
        self.dispatch(
            &others(member_ids, actor.id),
            Action::MemberJoined,
            metadata,
            DispatchOptions::batched(key).with_priority(Priority::Low),
        )
        .await;
    }

    /// Invite someone to `group`.
    ///
    /// Users get a high-priority notification that is never batched. Email
    /// invitees get an SMTP invite; without SMTP configuration the invite is
    /// logged and skipped.
    pub async fn notify_group_invite(
        &self,
        invitee: &Invitee,
        inviter: &ActorInfo,
        group: &GroupRef,
        invite_token: Option<&str>,
    ) {
        match invitee {
            Invitee::User(user_id) => {
                let mut metadata = with_group(actor_metadata(inviter), group);
                metadata.target_id = Some(group.id);
                metadata.target_type = Some("group".to_string());
                metadata.invite_token = invite_token.map(str::to_string);
                self.dispatch(
                    &others(&[*user_id], inviter.id),
                    Action::GroupInvited,
                    metadata,
                    DispatchOptions::high_priority().with_alert(self.alerts_enabled),
                )
                .await;
            }
            Invitee::Email(address) => {
                let Some(email) = &self.email else {
                    tracing::info!(
                        group_id = group.id,
                        "SMTP not configured, skipping invite email"
                    );
                    return;
                };
                let invite = InviteEmail {
                    inviter_name: inviter.name.clone(),
                    group_name: group.name.clone(),
                    invite_token: invite_token.map(str::to_string),
                };
                if let Err(e) = email.send_invite(address, &invite).await {
                    tracing::error!(group_id = group.id, error = %e, "Failed to send invite email");
                }
            }
        }
    }

    pub async fn notify_note_created(
        &self,
        member_ids: &[DbId],
        actor: &ActorInfo,
        note: &NoteRef,
    ) {
        let metadata = with_note(actor_metadata(actor), note);
        let key = Action::NoteCreated.group_key(&metadata);
        self.dispatch(
            &others(member_ids, actor.id),
            Action::NoteCreated,
            metadata,
            DispatchOptions::batched(key),
        )
        .await;
    }

    pub async fn notify_note_shared(&self, member_ids: &[DbId], actor: &ActorInfo, note: &NoteRef) {
        let metadata = with_note(actor_metadata(actor), note);
        self.dispatch(
            &others(member_ids, actor.id),
            Action::NoteShared,
            metadata,
            DispatchOptions::default(),
        )
        .await;
    }

    pub async fn notify_message_sent(
        &self,
        member_ids: &[DbId],
        actor: &ActorInfo,
        group: &GroupRef,
        message_id: DbId,
        preview: &str,
    ) {
        let mut metadata = with_group(actor_metadata(actor), group);
        metadata.target_id = Some(message_id);
        metadata.target_type = Some("message".to_string());
        metadata.preview_text = Some(preview.to_string());
        self.dispatch(
            &others(member_ids, actor.id),
            Action::MessageSent,
            metadata,
            DispatchOptions::default().with_priority(Priority::Low),
        )
        .await;
    }

    pub async fn notify_welcome(&self, user_id: DbId) {
        self.dispatch(
            &[user_id],
            Action::Welcome,
            NotificationMetadata::default(),
            DispatchOptions::default(),
        )
        .await;
    }

    pub async fn notify_system_announcement(&self, user_ids: &[DbId], text: &str) {
        let metadata = NotificationMetadata {
            preview_text: Some(text.to_string()),
            ..Default::default()
        };
        self.dispatch(
            user_ids,
            Action::SystemAnnouncement,
            metadata,
            DispatchOptions::default(),
        )
        .await;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
