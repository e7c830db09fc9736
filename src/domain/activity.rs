use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An activity offered by a gym (spinning, crossfit, ...). Pricing is spread
/// over three optional columns because historical imports filled different
/// ones; `current_price` checks them in priority order.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Activity {
    pub id: Uuid,
    pub gym_id: Uuid,
    pub name: String,
    pub price_cents: Option<i64>,
    pub cost_cents: Option<i64>,
    pub monthly_price_cents: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Activity {
    /// First positive price among the known price columns, if any.
    pub fn current_price(&self) -> Option<i64> {
        [self.price_cents, self.cost_cents, self.monthly_price_cents]
            .into_iter()
            .flatten()
            .find(|p| *p > 0)
    }
}

/// Fallback pricing source when the activity record itself carries no price.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MembershipPlan {
    pub id: Uuid,
    pub gym_id: Uuid,
    pub activity_id: Uuid,
    pub name: String,
    pub cost_cents: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateActivityRequest {
    pub gym_id: Uuid,
    pub name: String,
    pub price_cents: Option<i64>,
    pub cost_cents: Option<i64>,
    pub monthly_price_cents: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMembershipPlanRequest {
    pub gym_id: Uuid,
    pub activity_id: Uuid,
    pub name: String,
    pub cost_cents: i64,
}
