//! Notification domain logic.
//!
//! - [`action`] -- the closed action enumeration, categories, priorities and
//!   the action → preference-field table.
//! - [`content`] -- static content templates.
//! - [`preferences`] -- defaults, recipient filtering and quiet hours.
//! - [`batching`] -- merge rules for group-key batching.

pub mod action;
pub mod batching;
pub mod content;
pub mod metadata;
pub mod preferences;

pub use action::{Action, Category, PreferenceField, Priority};
pub use content::{generate_content, MessageBody, NotificationContent};
pub use metadata::NotificationMetadata;
pub use preferences::{filter_by_preferences, PreferenceFlags, UpdatePreferences};
