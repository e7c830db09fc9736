use std::sync::Arc;

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    domain::{MembershipStatus, MonthlyPayment, PaymentStatus},
    error::{AppError, Result},
    repository::{MemberRepository, MembershipRepository, PaymentRepository},
    service::billing,
};

/// Outcome of one monthly generation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub generated_count: i64,
    pub total_amount_cents: i64,
    pub skipped_existing: i64,
    pub errors: Vec<String>,
}

/// Creates the month's pending charges and answers ledger queries. The
/// renewal engine writes its own ledger entries; this pass covers ongoing
/// memberships and newly assigned ones under the 15th-of-month proration
/// rule.
pub struct PaymentService {
    member_repo: Arc<dyn MemberRepository>,
    membership_repo: Arc<dyn MembershipRepository>,
    payment_repo: Arc<dyn PaymentRepository>,
}

impl PaymentService {
    pub fn new(
        member_repo: Arc<dyn MemberRepository>,
        membership_repo: Arc<dyn MembershipRepository>,
        payment_repo: Arc<dyn PaymentRepository>,
    ) -> Self {
        Self {
            member_repo,
            membership_repo,
            payment_repo,
        }
    }

    /// One pass over the gym's active members. Memberships assigned in the
    /// current month bill per the proration cutoff (on or before the 15th:
    /// this month; after: next month); ongoing ones bill the 15th of the
    /// current month. A membership already billed for the target month is
    /// skipped, so the pass is safe to trigger on every admin login.
    pub async fn generate_monthly_payments(&self, gym_id: Uuid) -> Result<GenerationSummary> {
        let today = Utc::now().date_naive();
        let members = self.member_repo.list_active(gym_id).await?;

        let mut summary = GenerationSummary {
            generated_count: 0,
            total_amount_cents: 0,
            skipped_existing: 0,
            errors: Vec::new(),
        };

        for member in members {
            let memberships = self.membership_repo.list_for_member(member.id).await?;

            for membership in memberships {
                if membership.status != MembershipStatus::Active || !membership.auto_renewal {
                    continue;
                }

                let assigned_this_month = membership.start_date.year() == today.year()
                    && membership.start_date.month() == today.month();
                let due = if assigned_this_month {
                    billing::first_due_date(membership.start_date)
                } else {
                    billing::due_date_in_month(today)
                };
                let Some(due) = due else {
                    summary.errors.push(format!(
                        "{} - {}: cannot compute due date from {}",
                        member.full_name, membership.activity_name, membership.start_date
                    ));
                    continue;
                };

                let period = billing::billing_period(due);
                if self
                    .payment_repo
                    .exists_for_period(membership.id, &period)
                    .await?
                {
                    summary.skipped_existing += 1;
                    continue;
                }

                if membership.cost_cents <= 0 {
                    continue;
                }

                let payment = MonthlyPayment {
                    id: Uuid::new_v4(),
                    gym_id,
                    member_id: member.id,
                    membership_id: membership.id,
                    activity_id: membership.activity_id,
                    amount_cents: membership.cost_cents,
                    status: PaymentStatus::Pending,
                    due_date: due,
                    billing_period: period,
                    auto_generated: true,
                    renewal_payment: false,
                    price_updated: false,
                    previous_price_cents: None,
                    paid_at: None,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                };

                match self.payment_repo.create(payment).await {
                    Ok(created) => {
                        summary.generated_count += 1;
                        summary.total_amount_cents += created.amount_cents;
                    }
                    Err(e) => {
                        summary.errors.push(format!(
                            "{} - {}: {}",
                            member.full_name, membership.activity_name, e
                        ));
                    }
                }
            }
        }

        tracing::info!(
            "Generated {} monthly payments for gym {} ({} already billed)",
            summary.generated_count,
            gym_id,
            summary.skipped_existing
        );

        Ok(summary)
    }

    /// Pending charges past their due date as of today.
    pub async fn overdue_payments(&self, gym_id: Uuid) -> Result<Vec<MonthlyPayment>> {
        let today = Utc::now().date_naive();
        self.payment_repo.list_overdue(gym_id, today).await
    }

    pub async fn member_payments(&self, member_id: Uuid) -> Result<Vec<MonthlyPayment>> {
        self.payment_repo.list_for_member(member_id).await
    }

    /// Manual payment registration from the admin console.
    pub async fn register_payment(&self, gym_id: Uuid, payment_id: Uuid) -> Result<MonthlyPayment> {
        let payment = self
            .payment_repo
            .find_by_id(payment_id)
            .await?
            .filter(|p| p.gym_id == gym_id)
            .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;

        if payment.status == PaymentStatus::Paid {
            return Err(AppError::Conflict("Payment already registered".to_string()));
        }

        self.payment_repo.mark_paid(payment_id).await
    }
}
