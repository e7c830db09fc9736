use std::sync::Arc;
use uuid::Uuid;

use crate::{error::Result, repository::ActivityRepository};

/// Resolves the price a membership should renew at. Pure read; a miss is not
/// an error, callers fall back to the membership's stored cost.
pub struct PricingService {
    activity_repo: Arc<dyn ActivityRepository>,
}

impl PricingService {
    pub fn new(activity_repo: Arc<dyn ActivityRepository>) -> Self {
        Self { activity_repo }
    }

    /// Current price for an activity: the activity record's own price columns
    /// in priority order, then the single active membership plan for the
    /// activity. `None` when the membership has no activity reference or no
    /// positive price exists anywhere.
    pub async fn resolve_current_price(
        &self,
        gym_id: Uuid,
        activity_id: Option<Uuid>,
    ) -> Result<Option<i64>> {
        let Some(activity_id) = activity_id else {
            return Ok(None);
        };

        if let Some(activity) = self.activity_repo.find_by_id(gym_id, activity_id).await? {
            if let Some(price) = activity.current_price() {
                return Ok(Some(price));
            }
        }

        let plan = self
            .activity_repo
            .active_plan_for_activity(gym_id, activity_id)
            .await?;

        Ok(plan.map(|p| p.cost_cents).filter(|c| *c > 0))
    }
}
