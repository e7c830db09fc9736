use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{MonthlyPayment, PaymentStatus},
    error::{AppError, Result},
    repository::PaymentRepository,
};

const PAYMENT_COLUMNS: &str = r#"
    id, gym_id, member_id, membership_id, activity_id, amount_cents, status,
    due_date, billing_period, auto_generated, renewal_payment, price_updated,
    previous_price_cents, paid_at, created_at, updated_at
"#;

#[derive(FromRow)]
struct PaymentRow {
    id: String,
    gym_id: String,
    member_id: String,
    membership_id: String,
    activity_id: Option<String>,
    amount_cents: i64,
    status: String,
    due_date: NaiveDate,
    billing_period: String,
    auto_generated: i32,
    renewal_payment: i32,
    price_updated: i32,
    previous_price_cents: Option<i64>,
    paid_at: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub(crate) fn parse_payment_status(s: &str) -> Result<PaymentStatus> {
    match s {
        "Pending" => Ok(PaymentStatus::Pending),
        "Overdue" => Ok(PaymentStatus::Overdue),
        "Paid" => Ok(PaymentStatus::Paid),
        _ => Err(AppError::Database(format!("Invalid payment status: {}", s))),
    }
}

pub(crate) fn payment_status_to_str(status: &PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Pending => "Pending",
        PaymentStatus::Overdue => "Overdue",
        PaymentStatus::Paid => "Paid",
    }
}

pub struct SqlitePaymentRepository {
    pool: SqlitePool,
}

impl SqlitePaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_payment(row: PaymentRow) -> Result<MonthlyPayment> {
        Ok(MonthlyPayment {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            gym_id: Uuid::parse_str(&row.gym_id).map_err(|e| AppError::Database(e.to_string()))?,
            member_id: Uuid::parse_str(&row.member_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            membership_id: Uuid::parse_str(&row.membership_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            activity_id: row
                .activity_id
                .as_deref()
                .map(Uuid::parse_str)
                .transpose()
                .map_err(|e| AppError::Database(e.to_string()))?,
            amount_cents: row.amount_cents,
            status: parse_payment_status(&row.status)?,
            due_date: row.due_date,
            billing_period: row.billing_period,
            auto_generated: row.auto_generated != 0,
            renewal_payment: row.renewal_payment != 0,
            price_updated: row.price_updated != 0,
            previous_price_cents: row.previous_price_cents,
            paid_at: row
                .paid_at
                .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }
}

#[async_trait]
impl PaymentRepository for SqlitePaymentRepository {
    async fn create(&self, payment: MonthlyPayment) -> Result<MonthlyPayment> {
        let id_str = payment.id.to_string();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO monthly_payments (
                id, gym_id, member_id, membership_id, activity_id,
                amount_cents, status, due_date, billing_period,
                auto_generated, renewal_payment, price_updated,
                previous_price_cents, paid_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id_str)
        .bind(payment.gym_id.to_string())
        .bind(payment.member_id.to_string())
        .bind(payment.membership_id.to_string())
        .bind(payment.activity_id.map(|a| a.to_string()))
        .bind(payment.amount_cents)
        .bind(payment_status_to_str(&payment.status))
        .bind(payment.due_date)
        .bind(&payment.billing_period)
        .bind(if payment.auto_generated { 1i32 } else { 0i32 })
        .bind(if payment.renewal_payment { 1i32 } else { 0i32 })
        .bind(if payment.price_updated { 1i32 } else { 0i32 })
        .bind(payment.previous_price_cents)
        .bind(payment.paid_at.map(|dt| dt.naive_utc()))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(payment.id)
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve created payment".to_string()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<MonthlyPayment>> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM monthly_payments WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_payment(r)?)),
            None => Ok(None),
        }
    }

    async fn list_for_member(&self, member_id: Uuid) -> Result<Vec<MonthlyPayment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM monthly_payments WHERE member_id = ? ORDER BY due_date DESC"
        ))
        .bind(member_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_payment).collect()
    }

    async fn list_for_membership(&self, membership_id: Uuid) -> Result<Vec<MonthlyPayment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM monthly_payments WHERE membership_id = ? ORDER BY due_date DESC"
        ))
        .bind(membership_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_payment).collect()
    }

    async fn exists_for_period(&self, membership_id: Uuid, billing_period: &str) -> Result<bool> {
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM monthly_payments
            WHERE membership_id = ? AND billing_period = ?
            "#,
        )
        .bind(membership_id.to_string())
        .bind(billing_period)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(row.0 > 0)
    }

    async fn list_overdue(&self, gym_id: Uuid, today: NaiveDate) -> Result<Vec<MonthlyPayment>> {
        // Overdue is derived, not stored: pending and past due as of `today`.
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS} FROM monthly_payments
            WHERE gym_id = ? AND status = 'Pending' AND due_date < ?
            ORDER BY due_date ASC
            "#
        ))
        .bind(gym_id.to_string())
        .bind(today)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_payment).collect()
    }

    async fn mark_paid(&self, id: Uuid) -> Result<MonthlyPayment> {
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            UPDATE monthly_payments
            SET status = 'Paid', paid_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(now)
        .bind(now)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))
    }
}
