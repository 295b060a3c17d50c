//! StudyBuddy domain core.
//!
//! Zero internal dependencies: everything here is pure logic shared by the
//! repository layer, the event services, and the HTTP API.
//!
//! - [`message_status`] -- delivery status values and their display order.
//! - [`notification`] -- actions, content templates, preference filtering,
//!   batching merges and quiet hours.

pub mod error;
pub mod message_status;
pub mod notification;
pub mod types;
