use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{ExecutionType, RenewalHistoryEntry},
    error::{AppError, Result},
    repository::RenewalHistoryRepository,
};

#[derive(FromRow)]
struct HistoryRow {
    id: String,
    gym_id: String,
    executed_at: NaiveDateTime,
    execution_type: String,
    processed_memberships: i64,
    successful_renewals: i64,
    failed_renewals: i64,
    price_updates: i64,
    total_amount_cents: i64,
    errors: String,
    details: String,
}

pub struct SqliteRenewalHistoryRepository {
    pool: SqlitePool,
}

impl SqliteRenewalHistoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_entry(row: HistoryRow) -> Result<RenewalHistoryEntry> {
        Ok(RenewalHistoryEntry {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            gym_id: Uuid::parse_str(&row.gym_id).map_err(|e| AppError::Database(e.to_string()))?,
            executed_at: DateTime::from_naive_utc_and_offset(row.executed_at, Utc),
            execution_type: Self::parse_execution_type(&row.execution_type)?,
            processed_memberships: row.processed_memberships,
            successful_renewals: row.successful_renewals,
            failed_renewals: row.failed_renewals,
            price_updates: row.price_updates,
            total_amount_cents: row.total_amount_cents,
            errors: serde_json::from_str(&row.errors)
                .map_err(|e| AppError::Database(e.to_string()))?,
            details: serde_json::from_str(&row.details)
                .map_err(|e| AppError::Database(e.to_string()))?,
        })
    }

    fn parse_execution_type(s: &str) -> Result<ExecutionType> {
        match s {
            "Automatic" => Ok(ExecutionType::Automatic),
            "Manual" => Ok(ExecutionType::Manual),
            _ => Err(AppError::Database(format!("Invalid execution type: {}", s))),
        }
    }

    fn execution_type_to_str(execution_type: &ExecutionType) -> &'static str {
        match execution_type {
            ExecutionType::Automatic => "Automatic",
            ExecutionType::Manual => "Manual",
        }
    }
}

#[async_trait]
impl RenewalHistoryRepository for SqliteRenewalHistoryRepository {
    async fn append(&self, entry: RenewalHistoryEntry) -> Result<RenewalHistoryEntry> {
        let errors_json =
            serde_json::to_string(&entry.errors).map_err(|e| AppError::Internal(e.to_string()))?;
        let details_json =
            serde_json::to_string(&entry.details).map_err(|e| AppError::Internal(e.to_string()))?;
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO renewal_history (
                id, gym_id, executed_at, execution_type, processed_memberships,
                successful_renewals, failed_renewals, price_updates,
                total_amount_cents, errors, details, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.gym_id.to_string())
        .bind(entry.executed_at.naive_utc())
        .bind(Self::execution_type_to_str(&entry.execution_type))
        .bind(entry.processed_memberships)
        .bind(entry.successful_renewals)
        .bind(entry.failed_renewals)
        .bind(entry.price_updates)
        .bind(entry.total_amount_cents)
        .bind(&errors_json)
        .bind(&details_json)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(entry)
    }

    async fn list_recent(&self, gym_id: Uuid, limit: i64) -> Result<Vec<RenewalHistoryEntry>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT id, gym_id, executed_at, execution_type, processed_memberships,
                   successful_renewals, failed_renewals, price_updates,
                   total_amount_cents, errors, details
            FROM renewal_history
            WHERE gym_id = ?
            ORDER BY executed_at DESC
            LIMIT ?
            "#,
        )
        .bind(gym_id.to_string())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_entry).collect()
    }
}
