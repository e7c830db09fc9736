pub mod billing;
pub mod pricing_service;
pub mod renewal_service;
pub mod payment_service;

use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;

use crate::config::RenewalConfig;
use crate::repository::*;

pub use payment_service::{GenerationSummary, PaymentService};
pub use pricing_service::PricingService;
pub use renewal_service::RenewalService;

pub struct ServiceContext {
    pub member_repo: Arc<dyn MemberRepository>,
    pub activity_repo: Arc<dyn ActivityRepository>,
    pub membership_repo: Arc<dyn MembershipRepository>,
    pub payment_repo: Arc<dyn PaymentRepository>,
    pub history_repo: Arc<dyn RenewalHistoryRepository>,
    pub pricing_service: Arc<PricingService>,
    pub renewal_service: Arc<RenewalService>,
    pub payment_service: Arc<PaymentService>,
    pub db_pool: SqlitePool,
}

impl ServiceContext {
    pub fn new(db_pool: SqlitePool, renewal: RenewalConfig) -> Self {
        let member_repo: Arc<dyn MemberRepository> =
            Arc::new(SqliteMemberRepository::new(db_pool.clone()));
        let activity_repo: Arc<dyn ActivityRepository> =
            Arc::new(SqliteActivityRepository::new(db_pool.clone()));
        let membership_repo: Arc<dyn MembershipRepository> =
            Arc::new(SqliteMembershipRepository::new(db_pool.clone()));
        let payment_repo: Arc<dyn PaymentRepository> =
            Arc::new(SqlitePaymentRepository::new(db_pool.clone()));
        let history_repo: Arc<dyn RenewalHistoryRepository> =
            Arc::new(SqliteRenewalHistoryRepository::new(db_pool.clone()));

        let pricing_service = Arc::new(PricingService::new(activity_repo.clone()));
        let renewal_service = Arc::new(RenewalService::new(
            member_repo.clone(),
            membership_repo.clone(),
            history_repo.clone(),
            pricing_service.clone(),
            Duration::from_millis(renewal.throttle_ms),
        ));
        let payment_service = Arc::new(PaymentService::new(
            member_repo.clone(),
            membership_repo.clone(),
            payment_repo.clone(),
        ));

        Self {
            member_repo,
            activity_repo,
            membership_repo,
            payment_repo,
            history_repo,
            pricing_service,
            renewal_service,
            payment_service,
            db_pool,
        }
    }
}
