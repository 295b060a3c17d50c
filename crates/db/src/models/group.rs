//! Study group and membership models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use studybuddy_core::types::{DbId, Timestamp};

/// A row from the `study_groups` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StudyGroup {
    pub id: DbId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a study group.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateStudyGroup {
    pub name: String,
}

/// A row from the `group_members` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GroupMember {
    pub id: DbId,
    pub group_id: DbId,
    pub user_id: DbId,
    pub joined_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
