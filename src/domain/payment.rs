use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One billing charge for one membership for one month. Amount is fixed at
/// creation; later price changes never rewrite existing ledger entries.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MonthlyPayment {
    pub id: Uuid,
    pub gym_id: Uuid,
    pub member_id: Uuid,
    pub membership_id: Uuid,
    pub activity_id: Option<Uuid>,
    pub amount_cents: i64,
    pub status: PaymentStatus,
    pub due_date: NaiveDate,
    /// "YYYY-MM" key of the month this charge covers; unique per membership.
    pub billing_period: String,
    pub auto_generated: bool,
    pub renewal_payment: bool,
    pub price_updated: bool,
    pub previous_price_cents: Option<i64>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `Overdue` is derived at read time, never written by the generation or
/// renewal passes: a pending charge past its due date is overdue.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::Type, PartialEq)]
#[sqlx(type_name = "TEXT")]
pub enum PaymentStatus {
    Pending,
    Overdue,
    Paid,
}

impl MonthlyPayment {
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == PaymentStatus::Pending && today > self.due_date
    }

    pub fn effective_status(&self, today: NaiveDate) -> PaymentStatus {
        if self.is_overdue(today) {
            PaymentStatus::Overdue
        } else {
            self.status.clone()
        }
    }
}
