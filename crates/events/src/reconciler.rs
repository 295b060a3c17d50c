//! Message delivery reconciler.
//!
//! A [`GroupSubscriptionHandle`] owns one open group context for one user:
//! a message cache seeded from the store and a background task that folds
//! the [`RealtimeHub`](crate::realtime::RealtimeHub) message and status streams into it. Closing or
//! dropping the handle releases both streams.
//!
//! Protocol:
//! - A message insert for the group is appended to the cache. When the
//!   sender is someone else, `delivered` is upserted for the current user.
//! - A status change for a cached message replaces the row with the same
//!   `user_id` or appends it. Changes for messages not in the cache are
//!   dropped.
//!
//! Events are applied in arrival order; nothing is reordered.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use studybuddy_core::error::CoreError;
use studybuddy_core::message_status::DeliveryStatus;
use studybuddy_core::types::DbId;
use studybuddy_db::models::message::Message;
use studybuddy_db::models::message_status::MessageStatus;
use studybuddy_db::repositories::{GroupMemberRepo, MessageRepo, MessageStatusRepo};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::EventError;
use crate::realtime::StatusChange;
use crate::status_store::StatusStore;

/// Number of most recent messages loaded when a group is opened.
pub const INITIAL_PAGE_SIZE: i64 = 100;

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// A cached message with its attached status rows.
#[derive(Debug, Clone, Serialize)]
pub struct CachedMessage {
    #[serde(flatten)]
    pub message: Message,
    pub statuses: Vec<MessageStatus>,
}

/// A change applied to the cache, forwarded to the handle owner.
#[derive(Debug, Clone)]
pub enum CacheChange {
    MessageAppended(CachedMessage),
    StatusUpserted(MessageStatus),
}

#[derive(Debug, Default)]
struct MessageCache {
    messages: Vec<CachedMessage>,
    index: HashMap<DbId, usize>,
}

impl MessageCache {
    fn seed(messages: Vec<Message>, statuses: Vec<MessageStatus>) -> Self {
        let mut cache = Self::default();
        for message in messages {
            cache.append(message);
        }
        for status in statuses {
            cache.upsert_status(status);
        }
        cache
    }

    /// Append a message, or replace it in place if already cached.
    fn append(&mut self, message: Message) -> CachedMessage {
        match self.index.get(&message.id) {
            Some(&pos) => {
                self.messages[pos].message = message;
                self.messages[pos].clone()
            }
            None => {
                let entry = CachedMessage {
                    message,
                    statuses: Vec::new(),
                };
                self.index.insert(entry.message.id, self.messages.len());
                self.messages.push(entry.clone());
                entry
            }
        }
    }

    /// Replace-or-append by `user_id`. Returns `false` when the message is
    /// not cached.
    fn upsert_status(&mut self, status: MessageStatus) -> bool {
        let Some(&pos) = self.index.get(&status.message_id) else {
            return false;
        };
        let statuses = &mut self.messages[pos].statuses;
        match statuses.iter_mut().find(|s| s.user_id == status.user_id) {
            Some(existing) => *existing = status,
            None => statuses.push(status),
        }
        true
    }
}

// ---------------------------------------------------------------------------
// GroupSubscriptionHandle
// ---------------------------------------------------------------------------

/// Scoped subscription to one group's realtime streams.
///
/// Cancelled by [`close`](Self::close) or when dropped.
pub struct GroupSubscriptionHandle {
    group_id: DbId,
    user_id: DbId,
    cache: Arc<RwLock<MessageCache>>,
    changes: mpsc::UnboundedReceiver<CacheChange>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl GroupSubscriptionHandle {
    pub fn group_id(&self) -> DbId {
        self.group_id
    }

    pub fn user_id(&self) -> DbId {
        self.user_id
    }

    /// Current cache contents in chronological order.
    pub async fn snapshot(&self) -> Vec<CachedMessage> {
        self.cache.read().await.messages.clone()
    }

    /// Wait for the next change applied to the cache.
    ///
    /// Returns `None` once the subscription has been closed.
    pub async fn next_change(&mut self) -> Option<CacheChange> {
        self.changes.recv().await
    }

    /// Release both streams and wait for the background task to exit.
    pub async fn close(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        tracing::debug!(
            group_id = self.group_id,
            user_id = self.user_id,
            "Group subscription closed"
        );
    }
}

impl Drop for GroupSubscriptionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Opens group subscriptions against a [`StatusStore`].
#[derive(Clone)]
pub struct Reconciler {
    store: StatusStore,
}

impl Reconciler {
    pub fn new(store: StatusStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &StatusStore {
        &self.store
    }

    /// Open `group_id` for `user_id`.
    ///
    /// Both streams are subscribed before the initial page fetch so nothing
    /// published in between is missed. The page is limited to messages
    /// created at or after the user's join date; every message in it not
    /// sent by the user is then marked delivered.
    pub async fn open(
        &self,
        group_id: DbId,
        user_id: DbId,
    ) -> Result<GroupSubscriptionHandle, EventError> {
        let messages_rx = self.store.hub().subscribe_messages();
        let statuses_rx = self.store.hub().subscribe_statuses();

        let pool = self.store.pool();
        let membership = GroupMemberRepo::find(pool, group_id, user_id)
            .await?
            .ok_or_else(|| {
                CoreError::Forbidden(format!("User {user_id} is not a member of group {group_id}"))
            })?;

        let since = Some(membership.joined_at);
        let messages =
            MessageRepo::list_for_group(pool, group_id, since, INITIAL_PAGE_SIZE).await?;
        let ids: Vec<DbId> = messages.iter().map(|m| m.id).collect();
        let statuses = MessageStatusRepo::list_for_messages(pool, &ids).await?;
        let cache = Arc::new(RwLock::new(MessageCache::seed(messages, statuses)));

        // Resulting inserts arrive on the status stream and are folded in
        // by the task.
        if let Err(e) = self
            .store
            .mark_group_delivered(group_id, user_id, Some(membership.joined_at))
            .await
        {
            tracing::warn!(group_id, user_id, error = %e, "Failed to mark group delivered");
        }

        let (changes_tx, changes_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let worker = SubscriptionTask {
            group_id,
            user_id,
            store: self.store.clone(),
            cache: Arc::clone(&cache),
            changes: changes_tx,
        };
        let task = tokio::spawn(worker.run(messages_rx, statuses_rx, cancel.clone()));

        tracing::debug!(group_id, user_id, "Group subscription opened");

        Ok(GroupSubscriptionHandle {
            group_id,
            user_id,
            cache,
            changes: changes_rx,
            cancel,
            task: Some(task),
        })
    }
}

struct SubscriptionTask {
    group_id: DbId,
    user_id: DbId,
    store: StatusStore,
    cache: Arc<RwLock<MessageCache>>,
    changes: mpsc::UnboundedSender<CacheChange>,
}

impl SubscriptionTask {
    async fn run(
        self,
        mut messages: broadcast::Receiver<Message>,
        mut statuses: broadcast::Receiver<StatusChange>,
        cancel: CancellationToken,
    ) {
        loop {
            // Messages are polled before statuses so a status published right
            // after its message finds the message cached.
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                received = messages.recv() => match received {
                    Ok(message) => self.on_message(message).await,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(
                            group_id = self.group_id,
                            skipped = n,
                            "Message stream lagged"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                received = statuses.recv() => match received {
                    Ok(change) => self.on_status(change.status).await,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(
                            group_id = self.group_id,
                            skipped = n,
                            "Status stream lagged"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    }

    async fn on_message(&self, message: Message) {
        if message.group_id != self.group_id {
            return;
        }
        let sender_id = message.sender_id;
        let message_id = message.id;

        let entry = self.cache.write().await.append(message);
        let _ = self.changes.send(CacheChange::MessageAppended(entry));

        if sender_id == self.user_id {
            return;
        }
        if let Err(e) = self
            .store
            .update_status(message_id, self.user_id, DeliveryStatus::Delivered)
            .await
        {
            tracing::warn!(
                message_id,
                user_id = self.user_id,
                error = %e,
                "Failed to record delivered status"
            );
        }
    }

    async fn on_status(&self, status: MessageStatus) {
        let applied = self.cache.write().await.upsert_status(status.clone());
        if applied {
            let _ = self.changes.send(CacheChange::StatusUpserted(status));
        }
    }
}

// ---------------------------------------------------------------------------
// ReconcilerSession
// ---------------------------------------------------------------------------

/// Holds at most one open group for a user. Opening another group closes
/// the previous subscription first.
pub struct ReconcilerSession {
    reconciler: Reconciler,
    user_id: DbId,
    active: Option<GroupSubscriptionHandle>,
}

impl ReconcilerSession {
    pub fn new(reconciler: Reconciler, user_id: DbId) -> Self {
        Self {
            reconciler,
            user_id,
            active: None,
        }
    }

    pub async fn open_group(
        &mut self,
        group_id: DbId,
    ) -> Result<&mut GroupSubscriptionHandle, EventError> {
        self.close_group().await;
        let handle = self.reconciler.open(group_id, self.user_id).await?;
        Ok(self.active.insert(handle))
    }

    pub async fn close_group(&mut self) {
        if let Some(previous) = self.active.take() {
            previous.close().await;
        }
    }

    pub fn active(&self) -> Option<&GroupSubscriptionHandle> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut GroupSubscriptionHandle> {
        self.active.as_mut()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
