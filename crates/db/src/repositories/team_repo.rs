//! Repository for the `teams` and `team_members` tables.

use sqlx::PgPool;
use taskforge_core::types::DbId;

use crate::models::team::{CreateTeam, Team, UpdateTeam};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, description, department_id, leader_id, is_active, created_at, updated_at";

pub struct TeamRepo;

impl TeamRepo {
    /// Insert a team. A leader, when given, is added as its first member.
    pub async fn create(pool: &PgPool, input: &CreateTeam) -> Result<Team, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO teams (name, description, department_id, leader_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        let team = sqlx::query_as::<_, Team>(&query)
            .bind(input.name.trim())
            .bind(&input.description)
            .bind(input.department_id)
            .bind(input.leader_id)
            .fetch_one(&mut *tx)
            .await?;

        if let Some(leader_id) = team.leader_id {
            sqlx::query("INSERT INTO team_members (team_id, user_id) VALUES ($1, $2)")
                .bind(team.id)
                .bind(leader_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(team)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Team>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM teams WHERE id = $1 AND is_active");
        sqlx::query_as::<_, Team>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Active teams, optionally restricted to one department.
    pub async fn list(pool: &PgPool, department_id: Option<DbId>) -> Result<Vec<Team>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM teams \
             WHERE is_active AND ($1::BIGINT IS NULL OR department_id = $1) \
             ORDER BY name"
        );
        sqlx::query_as::<_, Team>(&query)
            .bind(department_id)
            .fetch_all(pool)
            .await
    }

    pub async fn update(pool: &PgPool, id: DbId, input: &UpdateTeam) -> Result<Option<Team>, sqlx::Error> {
        let query = format!(
            "UPDATE teams SET \
                name = COALESCE($2, name), \
                description = COALESCE($3, description), \
                department_id = COALESCE($4, department_id), \
                leader_id = COALESCE($5, leader_id) \
             WHERE id = $1 AND is_active \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Team>(&query)
            .bind(id)
            .bind(input.name.as_deref().map(str::trim))
            .bind(&input.description)
            .bind(input.department_id)
            .bind(input.leader_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE teams SET is_active = false WHERE id = $1 AND is_active")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    pub async fn member_ids(pool: &PgPool, team_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>("SELECT user_id FROM team_members WHERE team_id = $1 ORDER BY user_id")
            .bind(team_id)
            .fetch_all(pool)
            .await
    }

    /// Returns `false` when the user was already a member.
    pub async fn add_member(pool: &PgPool, team_id: DbId, user_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO team_members (team_id, user_id) VALUES ($1, $2) \
             ON CONFLICT (team_id, user_id) DO NOTHING",
        )
        .bind(team_id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Returns `false` when the user was not a member.
    pub async fn remove_member(pool: &PgPool, team_id: DbId, user_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM team_members WHERE team_id = $1 AND user_id = $2")
            .bind(team_id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
