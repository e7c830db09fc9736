use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Activity, CreateActivityRequest, CreateMembershipPlanRequest, MembershipPlan},
    error::{AppError, Result},
    repository::ActivityRepository,
};

#[derive(FromRow)]
struct ActivityRow {
    id: String,
    gym_id: String,
    name: String,
    price_cents: Option<i64>,
    cost_cents: Option<i64>,
    monthly_price_cents: Option<i64>,
    is_active: i32,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

#[derive(FromRow)]
struct PlanRow {
    id: String,
    gym_id: String,
    activity_id: String,
    name: String,
    cost_cents: i64,
    is_active: i32,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqliteActivityRepository {
    pool: SqlitePool,
}

impl SqliteActivityRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_activity(row: ActivityRow) -> Result<Activity> {
        Ok(Activity {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            gym_id: Uuid::parse_str(&row.gym_id).map_err(|e| AppError::Database(e.to_string()))?,
            name: row.name,
            price_cents: row.price_cents,
            cost_cents: row.cost_cents,
            monthly_price_cents: row.monthly_price_cents,
            is_active: row.is_active != 0,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn row_to_plan(row: PlanRow) -> Result<MembershipPlan> {
        Ok(MembershipPlan {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            gym_id: Uuid::parse_str(&row.gym_id).map_err(|e| AppError::Database(e.to_string()))?,
            activity_id: Uuid::parse_str(&row.activity_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            name: row.name,
            cost_cents: row.cost_cents,
            is_active: row.is_active != 0,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }
}

#[async_trait]
impl ActivityRepository for SqliteActivityRepository {
    async fn create(&self, request: CreateActivityRequest) -> Result<Activity> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO activities (
                id, gym_id, name, price_cents, cost_cents, monthly_price_cents,
                is_active, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(&id_str)
        .bind(request.gym_id.to_string())
        .bind(&request.name)
        .bind(request.price_cents)
        .bind(request.cost_cents)
        .bind(request.monthly_price_cents)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(request.gym_id, id)
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve created activity".to_string()))
    }

    async fn find_by_id(&self, gym_id: Uuid, id: Uuid) -> Result<Option<Activity>> {
        let row = sqlx::query_as::<_, ActivityRow>(
            r#"
            SELECT id, gym_id, name, price_cents, cost_cents, monthly_price_cents,
                   is_active, created_at, updated_at
            FROM activities
            WHERE gym_id = ? AND id = ?
            "#,
        )
        .bind(gym_id.to_string())
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_activity(r)?)),
            None => Ok(None),
        }
    }

    async fn create_plan(&self, request: CreateMembershipPlanRequest) -> Result<MembershipPlan> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO membership_plans (
                id, gym_id, activity_id, name, cost_cents,
                is_active, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(&id_str)
        .bind(request.gym_id.to_string())
        .bind(request.activity_id.to_string())
        .bind(&request.name)
        .bind(request.cost_cents)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let row = sqlx::query_as::<_, PlanRow>(
            r#"
            SELECT id, gym_id, activity_id, name, cost_cents,
                   is_active, created_at, updated_at
            FROM membership_plans
            WHERE id = ?
            "#,
        )
        .bind(&id_str)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Self::row_to_plan(r),
            None => Err(AppError::Database(
                "Failed to retrieve created membership plan".to_string(),
            )),
        }
    }

    async fn active_plan_for_activity(
        &self,
        gym_id: Uuid,
        activity_id: Uuid,
    ) -> Result<Option<MembershipPlan>> {
        let row = sqlx::query_as::<_, PlanRow>(
            r#"
            SELECT id, gym_id, activity_id, name, cost_cents,
                   is_active, created_at, updated_at
            FROM membership_plans
            WHERE gym_id = ? AND activity_id = ? AND is_active = 1
            LIMIT 1
            "#,
        )
        .bind(gym_id.to_string())
        .bind(activity_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_plan(r)?)),
            None => Ok(None),
        }
    }
}
