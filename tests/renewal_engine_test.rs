use chrono::{Duration, NaiveDate, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use gymledger::{
    config::RenewalConfig,
    domain::{
        CreateActivityRequest, CreateMemberRequest, CreateMembershipPlanRequest,
        CreateMembershipRequest, ExecutionType, Member, MemberStatus, Membership,
        MembershipStatus, MonthlyPayment, PaymentStatus,
    },
    repository::{ActivityRepository, MemberRepository, MembershipRepository, PaymentRepository},
    service::{billing, ServiceContext},
};

async fn setup() -> anyhow::Result<ServiceContext> {
    let pool = SqlitePool::connect(":memory:").await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(ServiceContext::new(
        pool,
        RenewalConfig {
            throttle_ms: 0,
            default_days_ahead: 7,
        },
    ))
}

async fn create_member(ctx: &ServiceContext, gym_id: Uuid, name: &str) -> anyhow::Result<Member> {
    let member = ctx
        .member_repo
        .create(CreateMemberRequest {
            gym_id,
            email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            full_name: name.to_string(),
        })
        .await?;
    Ok(member)
}

async fn create_membership(
    ctx: &ServiceContext,
    member_id: Uuid,
    activity_id: Option<Uuid>,
    activity_name: &str,
    cost_cents: i64,
    auto_renewal: bool,
    end_date: NaiveDate,
) -> anyhow::Result<Membership> {
    let membership = ctx
        .membership_repo
        .create(CreateMembershipRequest {
            member_id,
            activity_id,
            activity_name: activity_name.to_string(),
            cost_cents,
            auto_renewal,
            start_date: end_date - Duration::days(30),
            end_date,
            max_attendances: 12,
        })
        .await?;
    Ok(membership)
}

#[tokio::test]
async fn renews_expired_membership_exactly_once() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let gym_id = Uuid::new_v4();
    let today = Utc::now().date_naive();

    let activity = ctx
        .activity_repo
        .create(CreateActivityRequest {
            gym_id,
            name: "Spinning".to_string(),
            price_cents: Some(5000),
            cost_cents: None,
            monthly_price_cents: None,
        })
        .await?;

    let member = create_member(&ctx, gym_id, "Alice Johnson").await?;
    let membership = create_membership(
        &ctx,
        member.id,
        Some(activity.id),
        "Spinning",
        4000,
        true,
        today - Duration::days(1),
    )
    .await?;

    // Simulate attendance accrued during the expiring period.
    sqlx::query("UPDATE memberships SET current_attendances = 7 WHERE id = ?")
        .bind(membership.id.to_string())
        .execute(&ctx.db_pool)
        .await?;

    let result = ctx.renewal_service.process_all_auto_renewals(gym_id).await;

    assert!(result.success);
    assert_eq!(result.processed_memberships, 1);
    assert_eq!(result.renewed_count, 1);
    assert_eq!(result.total_amount_cents, 5000);
    assert_eq!(result.price_update_count, 1);
    assert!(result.errors.is_empty());

    let renewed = ctx
        .membership_repo
        .find_by_id(member.id, membership.id)
        .await?
        .expect("membership exists");
    assert_eq!(renewed.start_date, today);
    assert_eq!(renewed.end_date, billing::add_calendar_month(today).unwrap());
    assert_eq!(renewed.cost_cents, 5000);
    assert_eq!(renewed.current_attendances, 0);
    assert!(renewed.renewed_automatically);
    assert!(renewed.renewal_date.is_some());
    assert_eq!(renewed.version, membership.version + 1);

    let payments = ctx.payment_repo.list_for_membership(membership.id).await?;
    assert_eq!(payments.len(), 1);
    let payment = &payments[0];
    assert_eq!(payment.amount_cents, 5000);
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.due_date, today);
    assert!(payment.auto_generated);
    assert!(payment.renewal_payment);
    assert!(payment.price_updated);
    assert_eq!(payment.previous_price_cents, Some(4000));

    // A second run the same day finds nothing to renew.
    let second = ctx.renewal_service.process_all_auto_renewals(gym_id).await;
    assert!(second.success);
    assert_eq!(second.processed_memberships, 0);
    assert_eq!(second.renewed_count, 0);

    let payments = ctx.payment_repo.list_for_membership(membership.id).await?;
    assert_eq!(payments.len(), 1);

    Ok(())
}

#[tokio::test]
async fn ineligible_memberships_are_never_candidates() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let gym_id = Uuid::new_v4();
    let today = Utc::now().date_naive();
    let expired = today - Duration::days(3);

    // Paused membership, expired.
    let paused_owner = create_member(&ctx, gym_id, "Paula Pausing").await?;
    let paused =
        create_membership(&ctx, paused_owner.id, None, "Spinning", 4000, true, expired).await?;
    ctx.membership_repo
        .update_status(paused_owner.id, paused.id, MembershipStatus::Paused)
        .await?;

    // Auto-renewal off, expired.
    let optout_owner = create_member(&ctx, gym_id, "Oscar Optout").await?;
    create_membership(&ctx, optout_owner.id, None, "Crossfit", 6000, false, expired).await?;

    // End date in the future.
    let future_owner = create_member(&ctx, gym_id, "Frida Future").await?;
    create_membership(
        &ctx,
        future_owner.id,
        None,
        "Yoga",
        3800,
        true,
        today + Duration::days(10),
    )
    .await?;

    // Suspended member, membership itself eligible.
    let suspended_owner = create_member(&ctx, gym_id, "Sam Suspended").await?;
    create_membership(&ctx, suspended_owner.id, None, "Spinning", 4000, true, expired).await?;
    ctx.member_repo
        .update_status(suspended_owner.id, MemberStatus::Suspended)
        .await?;

    let candidates = ctx
        .renewal_service
        .get_expired_auto_renewal_memberships(gym_id)
        .await?;
    assert!(candidates.is_empty());

    let result = ctx.renewal_service.process_all_auto_renewals(gym_id).await;
    assert!(result.success);
    assert_eq!(result.processed_memberships, 0);
    assert_eq!(result.renewed_count, 0);

    Ok(())
}

#[tokio::test]
async fn price_resolution_miss_falls_back_to_stored_cost() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let gym_id = Uuid::new_v4();
    let today = Utc::now().date_naive();

    // Activity exists but carries no price anywhere.
    let unpriced = ctx
        .activity_repo
        .create(CreateActivityRequest {
            gym_id,
            name: "Pilates".to_string(),
            price_cents: None,
            cost_cents: None,
            monthly_price_cents: None,
        })
        .await?;

    let member = create_member(&ctx, gym_id, "Nora Noprice").await?;
    let membership = create_membership(
        &ctx,
        member.id,
        Some(unpriced.id),
        "Pilates",
        3000,
        true,
        today - Duration::days(2),
    )
    .await?;

    // Membership without any activity reference renews at stored cost too.
    let orphan_member = create_member(&ctx, gym_id, "Omar Orphan").await?;
    let orphan = create_membership(
        &ctx,
        orphan_member.id,
        None,
        "Boxing",
        2500,
        true,
        today - Duration::days(2),
    )
    .await?;

    let result = ctx.renewal_service.process_all_auto_renewals(gym_id).await;

    assert!(result.success);
    assert_eq!(result.renewed_count, 2);
    assert_eq!(result.price_update_count, 0);
    assert_eq!(result.total_amount_cents, 5500);

    for detail in &result.details {
        assert!(detail.renewed);
        assert!(!detail.price_changed);
    }

    let renewed = ctx
        .membership_repo
        .find_by_id(member.id, membership.id)
        .await?
        .expect("membership exists");
    assert_eq!(renewed.cost_cents, 3000);

    let payments = ctx.payment_repo.list_for_membership(orphan.id).await?;
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].amount_cents, 2500);
    assert!(!payments[0].price_updated);
    assert_eq!(payments[0].previous_price_cents, None);

    Ok(())
}

#[tokio::test]
async fn plan_price_is_used_when_activity_has_none() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let gym_id = Uuid::new_v4();
    let today = Utc::now().date_naive();

    let yoga = ctx
        .activity_repo
        .create(CreateActivityRequest {
            gym_id,
            name: "Yoga".to_string(),
            price_cents: None,
            cost_cents: None,
            monthly_price_cents: None,
        })
        .await?;
    ctx.activity_repo
        .create_plan(CreateMembershipPlanRequest {
            gym_id,
            activity_id: yoga.id,
            name: "Yoga monthly".to_string(),
            cost_cents: 3800,
        })
        .await?;

    let member = create_member(&ctx, gym_id, "Yara Yogi").await?;
    create_membership(
        &ctx,
        member.id,
        Some(yoga.id),
        "Yoga",
        3500,
        true,
        today - Duration::days(1),
    )
    .await?;

    let result = ctx.renewal_service.process_all_auto_renewals(gym_id).await;

    assert!(result.success);
    assert_eq!(result.renewed_count, 1);
    assert_eq!(result.price_update_count, 1);
    assert_eq!(result.total_amount_cents, 3800);

    Ok(())
}

#[tokio::test]
async fn failing_membership_does_not_abort_the_batch() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let gym_id = Uuid::new_v4();
    let today = Utc::now().date_naive();

    let mut memberships = Vec::new();
    for name in ["Ana First", "Ben Second", "Cleo Third"] {
        let member = create_member(&ctx, gym_id, name).await?;
        let membership = create_membership(
            &ctx,
            member.id,
            None,
            "Spinning",
            4000,
            true,
            today - Duration::days(1),
        )
        .await?;
        memberships.push((member, membership));
    }

    // Pre-existing charge for the second membership's renewal month forces
    // its ledger insert into the one-charge-per-month constraint.
    let (blocked_member, blocked) = &memberships[1];
    ctx.payment_repo
        .create(MonthlyPayment {
            id: Uuid::new_v4(),
            gym_id,
            member_id: blocked_member.id,
            membership_id: blocked.id,
            activity_id: None,
            amount_cents: 4000,
            status: PaymentStatus::Pending,
            due_date: today,
            billing_period: billing::billing_period(today),
            auto_generated: false,
            renewal_payment: false,
            price_updated: false,
            previous_price_cents: None,
            paid_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .await?;

    let result = ctx.renewal_service.process_all_auto_renewals(gym_id).await;

    assert!(!result.success);
    assert_eq!(result.processed_memberships, 3);
    assert_eq!(result.renewed_count, 2);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("Ben Second"));

    for (member, membership) in &memberships {
        let detail = result
            .details
            .iter()
            .find(|d| d.membership_id == membership.id)
            .expect("detail recorded");
        if membership.id == blocked.id {
            assert!(!detail.renewed);
            assert!(detail.error.is_some());

            // Atomicity: the rolled-back transaction left the membership
            // untouched.
            let stored = ctx
                .membership_repo
                .find_by_id(member.id, membership.id)
                .await?
                .expect("membership exists");
            assert_eq!(stored.end_date, membership.end_date);
            assert_eq!(stored.version, membership.version);
            assert!(!stored.renewed_automatically);
        } else {
            assert!(detail.renewed);
            assert!(detail.error.is_none());
        }
    }

    Ok(())
}

#[tokio::test]
async fn manual_renewal_works_and_cannot_double_bill_a_month() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let gym_id = Uuid::new_v4();
    let today = Utc::now().date_naive();

    let member = create_member(&ctx, gym_id, "Manu Manual").await?;
    let membership = create_membership(
        &ctx,
        member.id,
        None,
        "Crossfit",
        6000,
        true,
        today + Duration::days(3),
    )
    .await?;

    // Admin renews early, before expiry.
    let detail = ctx
        .renewal_service
        .renew_membership_with_updated_price(gym_id, member.id, membership.id)
        .await?;
    assert!(detail.renewed);
    assert_eq!(detail.new_end_date, billing::add_calendar_month(today));

    // A second renewal the same month trips the ledger constraint and rolls
    // back without touching the membership.
    let after_first = ctx
        .membership_repo
        .find_by_id(member.id, membership.id)
        .await?
        .expect("membership exists");
    let second = ctx
        .renewal_service
        .renew_membership_with_updated_price(gym_id, member.id, membership.id)
        .await?;
    assert!(!second.renewed);
    assert!(second.error.is_some());

    let after_second = ctx
        .membership_repo
        .find_by_id(member.id, membership.id)
        .await?
        .expect("membership exists");
    assert_eq!(after_second.end_date, after_first.end_date);
    assert_eq!(after_second.version, after_first.version);

    let payments = ctx.payment_repo.list_for_membership(membership.id).await?;
    assert_eq!(payments.len(), 1);

    Ok(())
}

#[tokio::test]
async fn upcoming_renewals_are_sorted_and_exclude_expired() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let gym_id = Uuid::new_v4();
    let today = Utc::now().date_naive();

    let member = create_member(&ctx, gym_id, "Uma Upcoming").await?;
    let soon =
        create_membership(&ctx, member.id, None, "Yoga", 3800, true, today + Duration::days(1))
            .await?;
    let later = create_membership(
        &ctx,
        member.id,
        None,
        "Spinning",
        4000,
        true,
        today + Duration::days(3),
    )
    .await?;
    // Outside the window.
    create_membership(
        &ctx,
        member.id,
        None,
        "Crossfit",
        6000,
        true,
        today + Duration::days(10),
    )
    .await?;
    // Already expired: the renewal batch's concern, not the report's.
    create_membership(&ctx, member.id, None, "Boxing", 2500, true, today - Duration::days(1))
        .await?;

    let upcoming = ctx
        .renewal_service
        .get_upcoming_auto_renewals(gym_id, 7)
        .await?;

    assert_eq!(upcoming.len(), 2);
    assert_eq!(upcoming[0].membership.id, soon.id);
    assert_eq!(upcoming[1].membership.id, later.id);

    Ok(())
}

#[tokio::test]
async fn history_records_each_run() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let gym_id = Uuid::new_v4();
    let today = Utc::now().date_naive();

    let member = create_member(&ctx, gym_id, "Hank History").await?;
    let membership = create_membership(
        &ctx,
        member.id,
        None,
        "Spinning",
        4000,
        true,
        today - Duration::days(1),
    )
    .await?;

    let result = ctx.renewal_service.process_all_auto_renewals(gym_id).await;
    assert!(result.success);

    let history = ctx.renewal_service.get_renewal_history(gym_id, 10).await?;
    assert_eq!(history.len(), 1);
    let entry = &history[0];
    assert_eq!(entry.execution_type, ExecutionType::Automatic);
    assert_eq!(entry.processed_memberships, 1);
    assert_eq!(entry.successful_renewals, 1);
    assert_eq!(entry.failed_renewals, 0);
    assert_eq!(entry.total_amount_cents, 4000);
    assert_eq!(entry.details.len(), 1);
    assert_eq!(entry.details[0].membership_id, membership.id);

    // An empty batch is still a recorded, successful run.
    let empty = ctx.renewal_service.process_all_auto_renewals(gym_id).await;
    assert!(empty.success);
    assert_eq!(empty.processed_memberships, 0);

    let history = ctx.renewal_service.get_renewal_history(gym_id, 10).await?;
    assert_eq!(history.len(), 2);

    Ok(())
}
