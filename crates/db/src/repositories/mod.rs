//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod group_repo;
pub mod message_repo;
pub mod message_status_repo;
pub mod notification_preference_repo;
pub mod notification_repo;
pub mod user_repo;

pub use group_repo::{GroupMemberRepo, StudyGroupRepo};
pub use message_repo::MessageRepo;
pub use message_status_repo::MessageStatusRepo;
pub use notification_preference_repo::NotificationPreferenceRepo;
pub use notification_repo::NotificationRepo;
pub use user_repo::UserRepo;
