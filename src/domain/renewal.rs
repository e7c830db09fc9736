use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A membership selected for renewal, carrying the member's name so failures
/// can be reported as "member — activity: error".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewalCandidate {
    pub member_name: String,
    pub membership: crate::domain::Membership,
}

/// Per-membership outcome of one renewal attempt. `renewed` is authoritative;
/// a false value with no error means the membership was skipped because a
/// concurrent run had already renewed it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewalDetail {
    pub member_id: Uuid,
    pub member_name: String,
    pub membership_id: Uuid,
    pub activity_id: Option<Uuid>,
    pub activity_name: String,
    pub renewed: bool,
    pub old_price_cents: i64,
    pub new_price_cents: i64,
    pub price_changed: bool,
    pub new_start_date: Option<NaiveDate>,
    pub new_end_date: Option<NaiveDate>,
    pub error: Option<String>,
}

/// Aggregate outcome of one batch run. `success` is true iff `errors` is
/// empty; a run with zero eligible memberships is a success with zero counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewalResult {
    pub success: bool,
    pub processed_memberships: i64,
    pub renewed_count: i64,
    pub total_amount_cents: i64,
    pub price_update_count: i64,
    pub errors: Vec<String>,
    pub details: Vec<RenewalDetail>,
}

impl RenewalResult {
    pub fn empty() -> Self {
        Self {
            success: true,
            processed_memberships: 0,
            renewed_count: 0,
            total_amount_cents: 0,
            price_update_count: 0,
            errors: Vec::new(),
            details: Vec::new(),
        }
    }

    pub fn batch_failure(error: String) -> Self {
        Self {
            success: false,
            errors: vec![error],
            ..Self::empty()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::Type, PartialEq)]
#[sqlx(type_name = "TEXT")]
pub enum ExecutionType {
    Automatic,
    Manual,
}

/// Append-only audit record of one renewal run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewalHistoryEntry {
    pub id: Uuid,
    pub gym_id: Uuid,
    pub executed_at: DateTime<Utc>,
    pub execution_type: ExecutionType,
    pub processed_memberships: i64,
    pub successful_renewals: i64,
    pub failed_renewals: i64,
    pub price_updates: i64,
    pub total_amount_cents: i64,
    pub errors: Vec<String>,
    pub details: Vec<RenewalDetail>,
}
