use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{CreateMemberRequest, Member, MemberStatus},
    error::{AppError, Result},
    repository::MemberRepository,
};

#[derive(FromRow)]
struct MemberRow {
    id: String,
    gym_id: String,
    email: String,
    full_name: String,
    status: String,
    joined_at: NaiveDateTime,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqliteMemberRepository {
    pool: SqlitePool,
}

impl SqliteMemberRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_member(row: MemberRow) -> Result<Member> {
        Ok(Member {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            gym_id: Uuid::parse_str(&row.gym_id).map_err(|e| AppError::Database(e.to_string()))?,
            email: row.email,
            full_name: row.full_name,
            status: Self::parse_member_status(&row.status)?,
            joined_at: DateTime::from_naive_utc_and_offset(row.joined_at, Utc),
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn parse_member_status(s: &str) -> Result<MemberStatus> {
        match s {
            "Active" => Ok(MemberStatus::Active),
            "Inactive" => Ok(MemberStatus::Inactive),
            "Suspended" => Ok(MemberStatus::Suspended),
            _ => Err(AppError::Database(format!("Invalid member status: {}", s))),
        }
    }

    fn member_status_to_str(status: &MemberStatus) -> &'static str {
        match status {
            MemberStatus::Active => "Active",
            MemberStatus::Inactive => "Inactive",
            MemberStatus::Suspended => "Suspended",
        }
    }
}

#[async_trait]
impl MemberRepository for SqliteMemberRepository {
    async fn create(&self, request: CreateMemberRequest) -> Result<Member> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO members (
                id, gym_id, email, full_name, status,
                joined_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, 'Active', ?, ?, ?)
            "#,
        )
        .bind(&id_str)
        .bind(request.gym_id.to_string())
        .bind(&request.email)
        .bind(&request.full_name)
        .bind(now)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve created member".to_string()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Member>> {
        let id_str = id.to_string();
        let row = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT id, gym_id, email, full_name, status,
                   joined_at, created_at, updated_at
            FROM members
            WHERE id = ?
            "#,
        )
        .bind(&id_str)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_member(r)?)),
            None => Ok(None),
        }
    }

    async fn list_active(&self, gym_id: Uuid) -> Result<Vec<Member>> {
        let rows = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT id, gym_id, email, full_name, status,
                   joined_at, created_at, updated_at
            FROM members
            WHERE gym_id = ? AND status = 'Active'
            ORDER BY full_name ASC
            "#,
        )
        .bind(gym_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_member).collect()
    }

    async fn update_status(&self, id: Uuid, status: MemberStatus) -> Result<Member> {
        let id_str = id.to_string();
        let status_str = Self::member_status_to_str(&status);
        let now = Utc::now().naive_utc();

        sqlx::query("UPDATE members SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status_str)
            .bind(now)
            .bind(&id_str)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Member not found".to_string()))
    }
}
