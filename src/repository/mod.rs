use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::*;
use crate::error::Result;

pub mod member_repository;
pub mod activity_repository;
pub mod membership_repository;
pub mod payment_repository;
pub mod renewal_history_repository;

pub use member_repository::SqliteMemberRepository;
pub use activity_repository::SqliteActivityRepository;
pub use membership_repository::SqliteMembershipRepository;
pub use payment_repository::SqlitePaymentRepository;
pub use renewal_history_repository::SqliteRenewalHistoryRepository;

#[async_trait]
pub trait MemberRepository: Send + Sync {
    async fn create(&self, request: CreateMemberRequest) -> Result<Member>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Member>>;
    async fn list_active(&self, gym_id: Uuid) -> Result<Vec<Member>>;
    async fn update_status(&self, id: Uuid, status: MemberStatus) -> Result<Member>;
}

#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn create(&self, request: CreateActivityRequest) -> Result<Activity>;
    async fn find_by_id(&self, gym_id: Uuid, id: Uuid) -> Result<Option<Activity>>;
    async fn create_plan(&self, request: CreateMembershipPlanRequest) -> Result<MembershipPlan>;
    async fn active_plan_for_activity(
        &self,
        gym_id: Uuid,
        activity_id: Uuid,
    ) -> Result<Option<MembershipPlan>>;
}

#[async_trait]
pub trait MembershipRepository: Send + Sync {
    async fn create(&self, request: CreateMembershipRequest) -> Result<Membership>;
    async fn find_by_id(&self, member_id: Uuid, membership_id: Uuid)
        -> Result<Option<Membership>>;
    async fn list_for_member(&self, member_id: Uuid) -> Result<Vec<Membership>>;
    /// Active, auto-renewal memberships of active members whose end date is on
    /// or before `today`.
    async fn expired_auto_renewals(
        &self,
        gym_id: Uuid,
        today: NaiveDate,
    ) -> Result<Vec<RenewalCandidate>>;
    /// Active, auto-renewal memberships expiring within `days_ahead` days,
    /// ascending by end date. Read-only report; excludes already-expired ones.
    async fn expiring_within(
        &self,
        gym_id: Uuid,
        today: NaiveDate,
        days_ahead: i64,
    ) -> Result<Vec<RenewalCandidate>>;
    async fn update_status(
        &self,
        member_id: Uuid,
        membership_id: Uuid,
        status: MembershipStatus,
    ) -> Result<Membership>;
    async fn set_auto_renewal(
        &self,
        member_id: Uuid,
        membership_id: Uuid,
        auto_renewal: bool,
    ) -> Result<Membership>;
    /// Applies the membership update and the ledger insert in one transaction.
    /// Both land or neither does. Returns `AppError::Conflict` when the
    /// membership's version no longer matches `renewal.expected_version`.
    async fn apply_renewal(
        &self,
        renewal: &MembershipRenewal,
        payment: Option<&MonthlyPayment>,
    ) -> Result<Membership>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create(&self, payment: MonthlyPayment) -> Result<MonthlyPayment>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<MonthlyPayment>>;
    async fn list_for_member(&self, member_id: Uuid) -> Result<Vec<MonthlyPayment>>;
    async fn list_for_membership(&self, membership_id: Uuid) -> Result<Vec<MonthlyPayment>>;
    async fn exists_for_period(&self, membership_id: Uuid, billing_period: &str) -> Result<bool>;
    async fn list_overdue(&self, gym_id: Uuid, today: NaiveDate) -> Result<Vec<MonthlyPayment>>;
    async fn mark_paid(&self, id: Uuid) -> Result<MonthlyPayment>;
}

#[async_trait]
pub trait RenewalHistoryRepository: Send + Sync {
    async fn append(&self, entry: RenewalHistoryEntry) -> Result<RenewalHistoryEntry>;
    async fn list_recent(&self, gym_id: Uuid, limit: i64) -> Result<Vec<RenewalHistoryEntry>>;
}
