use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use taskforge_core::types::{DbId, Timestamp};

/// A row from the `teams` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Team {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub department_id: Option<DbId>,
    pub leader_id: Option<DbId>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamWithMembers {
    #[serde(flatten)]
    pub team: Team,
    pub member_ids: Vec<DbId>,
}

/// DTO for creating a team. The leader is added as a member.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTeam {
    pub name: String,
    pub description: Option<String>,
    pub department_id: Option<DbId>,
    pub leader_id: Option<DbId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTeam {
    pub name: Option<String>,
    pub description: Option<String>,
    pub department_id: Option<DbId>,
    pub leader_id: Option<DbId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddTeamMember {
    pub user_id: DbId,
}
