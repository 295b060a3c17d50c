//! Repositories for the `study_groups` and `group_members` tables.

use sqlx::PgPool;
use studybuddy_core::types::DbId;

use crate::models::group::{CreateStudyGroup, GroupMember, StudyGroup};

/// Column list for `study_groups` queries.
const GROUP_COLUMNS: &str = "id, name, created_at, updated_at";

/// Column list for `group_members` queries.
const MEMBER_COLUMNS: &str = "id, group_id, user_id, joined_at, created_at, updated_at";

/// Provides lookups for study groups.
pub struct StudyGroupRepo;

impl StudyGroupRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateStudyGroup,
    ) -> Result<StudyGroup, sqlx::Error> {
        let query =
            format!("INSERT INTO study_groups (name) VALUES ($1) RETURNING {GROUP_COLUMNS}");
        sqlx::query_as::<_, StudyGroup>(&query)
            .bind(&input.name)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<StudyGroup>, sqlx::Error> {
        let query = format!("SELECT {GROUP_COLUMNS} FROM study_groups WHERE id = $1");
        sqlx::query_as::<_, StudyGroup>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}

/// Provides membership queries.
pub struct GroupMemberRepo;

impl GroupMemberRepo {
    /// Add a user to a group. Re-adding an existing member returns the
    /// existing row unchanged.
    pub async fn add(
        pool: &PgPool,
        group_id: DbId,
        user_id: DbId,
    ) -> Result<GroupMember, sqlx::Error> {
        let query = format!(
            "INSERT INTO group_members (group_id, user_id) \
             VALUES ($1, $2) \
             ON CONFLICT (group_id, user_id) DO UPDATE SET group_id = EXCLUDED.group_id \
             RETURNING {MEMBER_COLUMNS}"
        );
        sqlx::query_as::<_, GroupMember>(&query)
            .bind(group_id)
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    /// Find a user's membership row for a group.
    pub async fn find(
        pool: &PgPool,
        group_id: DbId,
        user_id: DbId,
    ) -> Result<Option<GroupMember>, sqlx::Error> {
        let query = format!(
            "SELECT {MEMBER_COLUMNS} FROM group_members WHERE group_id = $1 AND user_id = $2"
        );
        sqlx::query_as::<_, GroupMember>(&query)
            .bind(group_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }
}
