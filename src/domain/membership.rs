use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A member's permanent relationship to an activity. Never deleted; billing
/// eligibility is a function of `status` and `auto_renewal` only.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    pub id: Uuid,
    pub member_id: Uuid,
    /// Absent on some imported records; price resolution then falls back to
    /// the stored cost.
    pub activity_id: Option<Uuid>,
    pub activity_name: String,
    pub cost_cents: i64,
    pub status: MembershipStatus,
    pub auto_renewal: bool,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub max_attendances: i32,
    pub current_attendances: i32,
    pub renewed_automatically: bool,
    pub renewal_date: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::Type, PartialEq)]
#[sqlx(type_name = "TEXT")]
pub enum MembershipStatus {
    Active,
    Paused,
    Cancelled,
}

impl Membership {
    /// Due for auto-renewal: active, opted in, and expired as of `today`.
    /// Date-only comparison; a membership expiring later today is not touched.
    pub fn is_renewal_candidate(&self, today: NaiveDate) -> bool {
        self.status == MembershipStatus::Active && self.auto_renewal && self.end_date <= today
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMembershipRequest {
    pub member_id: Uuid,
    pub activity_id: Option<Uuid>,
    pub activity_name: String,
    pub cost_cents: i64,
    pub auto_renewal: bool,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub max_attendances: i32,
}

/// The membership-side writes of one renewal, applied together with the
/// ledger insert in a single transaction. `expected_version` makes the update
/// conditional: a concurrent renewal of the same membership bumps the version
/// and this write reports a conflict instead of extending the period twice.
#[derive(Debug, Clone)]
pub struct MembershipRenewal {
    pub member_id: Uuid,
    pub membership_id: Uuid,
    pub new_start: NaiveDate,
    pub new_end: NaiveDate,
    pub new_cost_cents: i64,
    pub renewal_date: DateTime<Utc>,
    pub expected_version: i64,
}
