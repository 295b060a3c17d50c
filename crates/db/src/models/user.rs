//! User profile models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use studybuddy_core::types::{DbId, Timestamp};

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub email: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a user.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub email: String,
}
