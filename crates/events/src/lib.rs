//! StudyBuddy realtime delivery and notification services.
//!
//! - [`RealtimeHub`] -- in-process fan-out of message inserts and status
//!   changes, backed by `tokio::sync::broadcast`.
//! - [`StatusStore`] -- per-recipient delivery status writes that publish
//!   change events.
//! - [`Reconciler`] -- folds both realtime streams into a per-group message
//!   cache and records delivered transitions.
//! - [`NotificationDispatcher`] -- preference filtering, content generation,
//!   batching and alert signalling.
//! - [`NotificationTriggers`] -- one fire-and-forget entry point per domain
//!   event.
//! - [`delivery`] -- SMTP delivery for invites to non-members.

pub mod alert;
pub mod delivery;
pub mod dispatcher;
pub mod error;
pub mod realtime;
pub mod reconciler;
pub mod status_store;
pub mod triggers;

pub use alert::{AlertSignal, AlertSink, NoopAlertSink, RecordingAlertSink};
pub use delivery::email::{EmailConfig, EmailDelivery, InviteEmail};
pub use dispatcher::{DispatchOptions, Dispatched, NotificationDispatcher};
pub use error::EventError;
pub use realtime::{ChangeKind, RealtimeHub, StatusChange};
pub use reconciler::{
    CacheChange, CachedMessage, GroupSubscriptionHandle, Reconciler, ReconcilerSession,
};
pub use status_store::StatusStore;
pub use triggers::{ActorInfo, GroupRef, Invitee, NoteRef, NotificationTriggers};
