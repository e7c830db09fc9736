use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{
        CreateMembershipRequest, Membership, MembershipRenewal, MembershipStatus, MonthlyPayment,
        RenewalCandidate,
    },
    error::{AppError, Result},
    repository::{payment_repository::payment_status_to_str, MembershipRepository},
};

const MEMBERSHIP_COLUMNS: &str = r#"
    id, member_id, activity_id, activity_name, cost_cents, status,
    auto_renewal, start_date, end_date, max_attendances, current_attendances,
    renewed_automatically, renewal_date, version, created_at, updated_at
"#;

#[derive(FromRow)]
struct MembershipRow {
    id: String,
    member_id: String,
    activity_id: Option<String>,
    activity_name: String,
    cost_cents: i64,
    status: String,
    auto_renewal: i32,
    start_date: NaiveDate,
    end_date: NaiveDate,
    max_attendances: i32,
    current_attendances: i32,
    renewed_automatically: i32,
    renewal_date: Option<NaiveDateTime>,
    version: i64,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

#[derive(FromRow)]
struct CandidateRow {
    member_name: String,
    #[sqlx(flatten)]
    membership: MembershipRow,
}

pub struct SqliteMembershipRepository {
    pool: SqlitePool,
}

impl SqliteMembershipRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_membership(row: MembershipRow) -> Result<Membership> {
        Ok(Membership {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            member_id: Uuid::parse_str(&row.member_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            activity_id: row
                .activity_id
                .as_deref()
                .map(Uuid::parse_str)
                .transpose()
                .map_err(|e| AppError::Database(e.to_string()))?,
            activity_name: row.activity_name,
            cost_cents: row.cost_cents,
            status: Self::parse_membership_status(&row.status)?,
            auto_renewal: row.auto_renewal != 0,
            start_date: row.start_date,
            end_date: row.end_date,
            max_attendances: row.max_attendances,
            current_attendances: row.current_attendances,
            renewed_automatically: row.renewed_automatically != 0,
            renewal_date: row
                .renewal_date
                .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
            version: row.version,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn row_to_candidate(row: CandidateRow) -> Result<RenewalCandidate> {
        Ok(RenewalCandidate {
            member_name: row.member_name,
            membership: Self::row_to_membership(row.membership)?,
        })
    }

    fn parse_membership_status(s: &str) -> Result<MembershipStatus> {
        match s {
            "Active" => Ok(MembershipStatus::Active),
            "Paused" => Ok(MembershipStatus::Paused),
            "Cancelled" => Ok(MembershipStatus::Cancelled),
            _ => Err(AppError::Database(format!("Invalid membership status: {}", s))),
        }
    }

    fn membership_status_to_str(status: &MembershipStatus) -> &'static str {
        match status {
            MembershipStatus::Active => "Active",
            MembershipStatus::Paused => "Paused",
            MembershipStatus::Cancelled => "Cancelled",
        }
    }
}

#[async_trait]
impl MembershipRepository for SqliteMembershipRepository {
    async fn create(&self, request: CreateMembershipRequest) -> Result<Membership> {
        if request.end_date < request.start_date {
            return Err(AppError::BadRequest(
                "Membership end date precedes start date".to_string(),
            ));
        }

        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO memberships (
                id, member_id, activity_id, activity_name, cost_cents, status,
                auto_renewal, start_date, end_date, max_attendances,
                current_attendances, renewed_automatically, renewal_date,
                version, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, 'Active', ?, ?, ?, ?, 0, 0, NULL, 0, ?, ?)
            "#,
        )
        .bind(&id_str)
        .bind(request.member_id.to_string())
        .bind(request.activity_id.map(|a| a.to_string()))
        .bind(&request.activity_name)
        .bind(request.cost_cents)
        .bind(if request.auto_renewal { 1i32 } else { 0i32 })
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(request.max_attendances)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(request.member_id, id)
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve created membership".to_string()))
    }

    async fn find_by_id(
        &self,
        member_id: Uuid,
        membership_id: Uuid,
    ) -> Result<Option<Membership>> {
        let row = sqlx::query_as::<_, MembershipRow>(&format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM memberships WHERE member_id = ? AND id = ?"
        ))
        .bind(member_id.to_string())
        .bind(membership_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_membership(r)?)),
            None => Ok(None),
        }
    }

    async fn list_for_member(&self, member_id: Uuid) -> Result<Vec<Membership>> {
        let rows = sqlx::query_as::<_, MembershipRow>(&format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM memberships WHERE member_id = ? ORDER BY activity_name ASC"
        ))
        .bind(member_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_membership).collect()
    }

    async fn expired_auto_renewals(
        &self,
        gym_id: Uuid,
        today: NaiveDate,
    ) -> Result<Vec<RenewalCandidate>> {
        let rows = sqlx::query_as::<_, CandidateRow>(
            r#"
            SELECT m.full_name AS member_name,
                   ms.id, ms.member_id, ms.activity_id, ms.activity_name,
                   ms.cost_cents, ms.status, ms.auto_renewal, ms.start_date,
                   ms.end_date, ms.max_attendances, ms.current_attendances,
                   ms.renewed_automatically, ms.renewal_date, ms.version,
                   ms.created_at, ms.updated_at
            FROM memberships ms
            JOIN members m ON m.id = ms.member_id
            WHERE m.gym_id = ? AND m.status = 'Active'
              AND ms.status = 'Active' AND ms.auto_renewal = 1
              AND ms.end_date <= ?
            "#,
        )
        .bind(gym_id.to_string())
        .bind(today)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_candidate).collect()
    }

    async fn expiring_within(
        &self,
        gym_id: Uuid,
        today: NaiveDate,
        days_ahead: i64,
    ) -> Result<Vec<RenewalCandidate>> {
        let cutoff = today + Duration::days(days_ahead);
        let rows = sqlx::query_as::<_, CandidateRow>(
            r#"
            SELECT m.full_name AS member_name,
                   ms.id, ms.member_id, ms.activity_id, ms.activity_name,
                   ms.cost_cents, ms.status, ms.auto_renewal, ms.start_date,
                   ms.end_date, ms.max_attendances, ms.current_attendances,
                   ms.renewed_automatically, ms.renewal_date, ms.version,
                   ms.created_at, ms.updated_at
            FROM memberships ms
            JOIN members m ON m.id = ms.member_id
            WHERE m.gym_id = ? AND m.status = 'Active'
              AND ms.status = 'Active' AND ms.auto_renewal = 1
              AND ms.end_date > ? AND ms.end_date <= ?
            ORDER BY ms.end_date ASC
            "#,
        )
        .bind(gym_id.to_string())
        .bind(today)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_candidate).collect()
    }

    async fn update_status(
        &self,
        member_id: Uuid,
        membership_id: Uuid,
        status: MembershipStatus,
    ) -> Result<Membership> {
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            UPDATE memberships
            SET status = ?, version = version + 1, updated_at = ?
            WHERE id = ? AND member_id = ?
            "#,
        )
        .bind(Self::membership_status_to_str(&status))
        .bind(now)
        .bind(membership_id.to_string())
        .bind(member_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(member_id, membership_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Membership not found".to_string()))
    }

    async fn set_auto_renewal(
        &self,
        member_id: Uuid,
        membership_id: Uuid,
        auto_renewal: bool,
    ) -> Result<Membership> {
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            UPDATE memberships
            SET auto_renewal = ?, version = version + 1, updated_at = ?
            WHERE id = ? AND member_id = ?
            "#,
        )
        .bind(if auto_renewal { 1i32 } else { 0i32 })
        .bind(now)
        .bind(membership_id.to_string())
        .bind(member_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(member_id, membership_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Membership not found".to_string()))
    }

    async fn apply_renewal(
        &self,
        renewal: &MembershipRenewal,
        payment: Option<&MonthlyPayment>,
    ) -> Result<Membership> {
        let now = Utc::now().naive_utc();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let updated = sqlx::query(
            r#"
            UPDATE memberships
            SET start_date = ?, end_date = ?, cost_cents = ?,
                current_attendances = 0, renewed_automatically = 1,
                renewal_date = ?, version = version + 1, updated_at = ?
            WHERE id = ? AND member_id = ? AND version = ?
            "#,
        )
        .bind(renewal.new_start)
        .bind(renewal.new_end)
        .bind(renewal.new_cost_cents)
        .bind(renewal.renewal_date.naive_utc())
        .bind(now)
        .bind(renewal.membership_id.to_string())
        .bind(renewal.member_id.to_string())
        .bind(renewal.expected_version)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        if updated.rows_affected() == 0 {
            return Err(AppError::Conflict(
                "Membership was modified concurrently".to_string(),
            ));
        }

        if let Some(p) = payment {
            // Dropping the transaction on error rolls the membership update
            // back with it.
            sqlx::query(
                r#"
                INSERT INTO monthly_payments (
                    id, gym_id, member_id, membership_id, activity_id,
                    amount_cents, status, due_date, billing_period,
                    auto_generated, renewal_payment, price_updated,
                    previous_price_cents, paid_at, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, ?, ?)
                "#,
            )
            .bind(p.id.to_string())
            .bind(p.gym_id.to_string())
            .bind(p.member_id.to_string())
            .bind(p.membership_id.to_string())
            .bind(p.activity_id.map(|a| a.to_string()))
            .bind(p.amount_cents)
            .bind(payment_status_to_str(&p.status))
            .bind(p.due_date)
            .bind(&p.billing_period)
            .bind(if p.auto_generated { 1i32 } else { 0i32 })
            .bind(if p.renewal_payment { 1i32 } else { 0i32 })
            .bind(if p.price_updated { 1i32 } else { 0i32 })
            .bind(p.previous_price_cents)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(renewal.member_id, renewal.membership_id)
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve renewed membership".to_string()))
    }
}
