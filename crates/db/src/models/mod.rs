//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts where the API creates rows

pub mod group;
pub mod message;
pub mod message_status;
pub mod notification;
pub mod notification_preference;
pub mod user;
