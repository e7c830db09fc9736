use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    domain::{
        ExecutionType, Membership, MembershipRenewal, MembershipStatus, MonthlyPayment,
        PaymentStatus, RenewalCandidate, RenewalDetail, RenewalHistoryEntry, RenewalResult,
    },
    error::{AppError, Result},
    repository::{MemberRepository, MembershipRepository, RenewalHistoryRepository},
    service::{billing, PricingService},
};

/// Orchestrates membership auto-renewal: candidate selection, price
/// resolution, period computation, the atomic membership + ledger write, and
/// the history record. Runs synchronously when triggered; there is no
/// background scheduler.
pub struct RenewalService {
    member_repo: Arc<dyn MemberRepository>,
    membership_repo: Arc<dyn MembershipRepository>,
    history_repo: Arc<dyn RenewalHistoryRepository>,
    pricing: Arc<PricingService>,
    /// Pause between per-membership writes to spread the burst. Zero in tests.
    throttle: Duration,
}

impl RenewalService {
    pub fn new(
        member_repo: Arc<dyn MemberRepository>,
        membership_repo: Arc<dyn MembershipRepository>,
        history_repo: Arc<dyn RenewalHistoryRepository>,
        pricing: Arc<PricingService>,
        throttle: Duration,
    ) -> Self {
        Self {
            member_repo,
            membership_repo,
            history_repo,
            pricing,
            throttle,
        }
    }

    /// Active, auto-renewal memberships of active members whose period has
    /// ended as of today.
    pub async fn get_expired_auto_renewal_memberships(
        &self,
        gym_id: Uuid,
    ) -> Result<Vec<RenewalCandidate>> {
        let today = Utc::now().date_naive();
        self.membership_repo.expired_auto_renewals(gym_id, today).await
    }

    /// Read-only report of auto-renewal memberships expiring within
    /// `days_ahead` days, soonest first.
    pub async fn get_upcoming_auto_renewals(
        &self,
        gym_id: Uuid,
        days_ahead: i64,
    ) -> Result<Vec<RenewalCandidate>> {
        if days_ahead < 0 {
            return Err(AppError::BadRequest(
                "days_ahead cannot be negative".to_string(),
            ));
        }
        let today = Utc::now().date_naive();
        self.membership_repo
            .expiring_within(gym_id, today, days_ahead)
            .await
    }

    pub async fn get_renewal_history(
        &self,
        gym_id: Uuid,
        limit: i64,
    ) -> Result<Vec<RenewalHistoryEntry>> {
        self.history_repo.list_recent(gym_id, limit).await
    }

    /// The full batch. Per-membership failures are isolated: each lands in
    /// the error list and its detail record, and the batch carries on. Only a
    /// failure of the candidate query itself fails the whole run. Safe to
    /// re-run: renewed memberships have a future end date and drop out of
    /// candidate selection.
    pub async fn process_all_auto_renewals(&self, gym_id: Uuid) -> RenewalResult {
        let today = Utc::now().date_naive();

        let candidates = match self.membership_repo.expired_auto_renewals(gym_id, today).await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::error!("Renewal candidate query failed for gym {}: {}", gym_id, e);
                return RenewalResult::batch_failure(format!(
                    "Failed to load renewal candidates: {}",
                    e
                ));
            }
        };

        tracing::info!(
            "Processing {} auto-renewal candidates for gym {}",
            candidates.len(),
            gym_id
        );

        let mut details = Vec::with_capacity(candidates.len());
        for (i, candidate) in candidates.iter().enumerate() {
            if i > 0 && !self.throttle.is_zero() {
                tokio::time::sleep(self.throttle).await;
            }
            details.push(self.renew_candidate(gym_id, candidate, today).await);
        }

        let result = Self::aggregate(details);
        self.record_history(gym_id, &result, ExecutionType::Automatic)
            .await;
        result
    }

    /// Renews exactly one membership at the currently resolved price, for the
    /// manual "renew this one" admin action. A second invocation in the same
    /// billing month fails on the ledger's one-charge-per-month constraint
    /// and leaves the membership untouched.
    pub async fn renew_membership_with_updated_price(
        &self,
        gym_id: Uuid,
        member_id: Uuid,
        membership_id: Uuid,
    ) -> Result<RenewalDetail> {
        let today = Utc::now().date_naive();

        let member = self
            .member_repo
            .find_by_id(member_id)
            .await?
            .filter(|m| m.gym_id == gym_id)
            .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

        let membership = self
            .membership_repo
            .find_by_id(member_id, membership_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Membership not found".to_string()))?;

        if membership.status != MembershipStatus::Active {
            return Err(AppError::BadRequest(
                "Only active memberships can be renewed".to_string(),
            ));
        }

        let candidate = RenewalCandidate {
            member_name: member.full_name,
            membership,
        };

        let detail = self.renew_candidate(gym_id, &candidate, today).await;
        let result = Self::aggregate(vec![detail.clone()]);
        self.record_history(gym_id, &result, ExecutionType::Manual)
            .await;
        Ok(detail)
    }

    fn aggregate(details: Vec<RenewalDetail>) -> RenewalResult {
        let mut result = RenewalResult::empty();
        result.processed_memberships = details.len() as i64;

        for detail in &details {
            if detail.renewed {
                result.renewed_count += 1;
                result.total_amount_cents += detail.new_price_cents;
                if detail.price_changed {
                    result.price_update_count += 1;
                }
            } else if let Some(err) = &detail.error {
                result.errors.push(format!(
                    "{} - {}: {}",
                    detail.member_name, detail.activity_name, err
                ));
            }
        }

        result.success = result.errors.is_empty();
        result.details = details;
        result
    }

    async fn renew_candidate(
        &self,
        gym_id: Uuid,
        candidate: &RenewalCandidate,
        today: NaiveDate,
    ) -> RenewalDetail {
        let membership = &candidate.membership;
        let mut detail = RenewalDetail {
            member_id: membership.member_id,
            member_name: candidate.member_name.clone(),
            membership_id: membership.id,
            activity_id: membership.activity_id,
            activity_name: membership.activity_name.clone(),
            renewed: false,
            old_price_cents: membership.cost_cents,
            new_price_cents: membership.cost_cents,
            price_changed: false,
            new_start_date: None,
            new_end_date: None,
            error: None,
        };

        match self.try_renew(gym_id, candidate, today).await {
            Ok(Some(renewed)) => {
                detail.renewed = true;
                detail.new_price_cents = renewed.cost_cents;
                detail.price_changed = renewed.cost_cents != membership.cost_cents;
                detail.new_start_date = Some(renewed.start_date);
                detail.new_end_date = Some(renewed.end_date);
            }
            // A concurrent run renewed it first; skipped, not an error.
            Ok(None) => {
                tracing::info!(
                    "Membership {} already renewed by a concurrent run",
                    membership.id
                );
            }
            Err(e) => {
                tracing::warn!("Renewal failed for membership {}: {}", membership.id, e);
                detail.error = Some(e.to_string());
            }
        }

        detail
    }

    /// One renewal unit: resolve price, compute the new period, and apply the
    /// membership update and ledger insert in a single transaction. On a
    /// version conflict the candidate is refetched and retried once;
    /// `Ok(None)` means another session had already renewed it.
    async fn try_renew(
        &self,
        gym_id: Uuid,
        candidate: &RenewalCandidate,
        today: NaiveDate,
    ) -> Result<Option<Membership>> {
        let mut membership = candidate.membership.clone();

        for attempt in 0..2 {
            let resolved = self
                .pricing
                .resolve_current_price(gym_id, membership.activity_id)
                .await?;
            // Resolution miss is not an error: keep the last known cost. The
            // price never silently drops to zero or below.
            let new_price = resolved.filter(|p| *p > 0).unwrap_or(membership.cost_cents);
            let price_changed = new_price != membership.cost_cents;

            let new_start = today;
            let new_end = billing::add_calendar_month(new_start).ok_or_else(|| {
                AppError::Internal(format!("Cannot compute renewal period from {}", new_start))
            })?;

            let renewal = MembershipRenewal {
                member_id: membership.member_id,
                membership_id: membership.id,
                new_start,
                new_end,
                new_cost_cents: new_price,
                renewal_date: Utc::now(),
                expected_version: membership.version,
            };

            let payment = (new_price > 0).then(|| MonthlyPayment {
                id: Uuid::new_v4(),
                gym_id,
                member_id: membership.member_id,
                membership_id: membership.id,
                activity_id: membership.activity_id,
                amount_cents: new_price,
                status: PaymentStatus::Pending,
                due_date: new_start,
                billing_period: billing::billing_period(new_start),
                auto_generated: true,
                renewal_payment: true,
                price_updated: price_changed,
                previous_price_cents: price_changed.then_some(membership.cost_cents),
                paid_at: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            });

            match self
                .membership_repo
                .apply_renewal(&renewal, payment.as_ref())
                .await
            {
                Ok(renewed) => return Ok(Some(renewed)),
                Err(AppError::Conflict(_)) if attempt == 0 => {
                    let fresh = self
                        .membership_repo
                        .find_by_id(membership.member_id, membership.id)
                        .await?
                        .ok_or_else(|| {
                            AppError::NotFound("Membership disappeared during renewal".to_string())
                        })?;
                    if !fresh.is_renewal_candidate(today) {
                        return Ok(None);
                    }
                    membership = fresh;
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::Conflict(
            "Membership renewal conflicted repeatedly".to_string(),
        ))
    }

    /// History is best-effort telemetry; a write failure is logged and never
    /// alters the batch result.
    async fn record_history(
        &self,
        gym_id: Uuid,
        result: &RenewalResult,
        execution_type: ExecutionType,
    ) {
        let entry = RenewalHistoryEntry {
            id: Uuid::new_v4(),
            gym_id,
            executed_at: Utc::now(),
            execution_type,
            processed_memberships: result.processed_memberships,
            successful_renewals: result.renewed_count,
            failed_renewals: result.errors.len() as i64,
            price_updates: result.price_update_count,
            total_amount_cents: result.total_amount_cents,
            errors: result.errors.clone(),
            details: result.details.clone(),
        };

        if let Err(e) = self.history_repo.append(entry).await {
            tracing::error!("Failed to record renewal history for gym {}: {}", gym_id, e);
        }
    }
}
