use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use gymledger::{
    domain::{
        CreateMemberRequest, CreateMembershipRequest, MembershipRenewal, MembershipStatus,
    },
    error::AppError,
    repository::{
        MemberRepository, MembershipRepository, SqliteMemberRepository,
        SqliteMembershipRepository,
    },
    service::billing,
};

async fn setup() -> anyhow::Result<SqlitePool> {
    let pool = SqlitePool::connect(":memory:").await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

#[tokio::test]
async fn membership_crud_and_toggles() -> anyhow::Result<()> {
    let pool = setup().await?;
    let member_repo = SqliteMemberRepository::new(pool.clone());
    let repo = SqliteMembershipRepository::new(pool.clone());

    let gym_id = Uuid::new_v4();
    let member = member_repo
        .create(CreateMemberRequest {
            gym_id,
            email: "test@example.com".to_string(),
            full_name: "Test Member".to_string(),
        })
        .await?;

    let today = Utc::now().date_naive();
    let membership = repo
        .create(CreateMembershipRequest {
            member_id: member.id,
            activity_id: None,
            activity_name: "Spinning".to_string(),
            cost_cents: 4000,
            auto_renewal: true,
            start_date: today,
            end_date: today + Duration::days(30),
            max_attendances: 12,
        })
        .await?;

    assert_eq!(membership.status, MembershipStatus::Active);
    assert_eq!(membership.current_attendances, 0);
    assert_eq!(membership.version, 0);
    assert!(!membership.renewed_automatically);

    let found = repo.find_by_id(member.id, membership.id).await?;
    assert!(found.is_some());

    let listed = repo.list_for_member(member.id).await?;
    assert_eq!(listed.len(), 1);

    // Manual admin toggles bump the version so in-flight renewals conflict.
    let paused = repo
        .update_status(member.id, membership.id, MembershipStatus::Paused)
        .await?;
    assert_eq!(paused.status, MembershipStatus::Paused);
    assert_eq!(paused.version, 1);

    let toggled = repo.set_auto_renewal(member.id, membership.id, false).await?;
    assert!(!toggled.auto_renewal);
    assert_eq!(toggled.version, 2);

    Ok(())
}

#[tokio::test]
async fn create_rejects_inverted_date_range() -> anyhow::Result<()> {
    let pool = setup().await?;
    let member_repo = SqliteMemberRepository::new(pool.clone());
    let repo = SqliteMembershipRepository::new(pool.clone());

    let member = member_repo
        .create(CreateMemberRequest {
            gym_id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            full_name: "Test Member".to_string(),
        })
        .await?;

    let today = Utc::now().date_naive();
    let result = repo
        .create(CreateMembershipRequest {
            member_id: member.id,
            activity_id: None,
            activity_name: "Spinning".to_string(),
            cost_cents: 4000,
            auto_renewal: true,
            start_date: today,
            end_date: today - Duration::days(1),
            max_attendances: 12,
        })
        .await;

    assert!(matches!(result, Err(AppError::BadRequest(_))));

    Ok(())
}

#[tokio::test]
async fn renewal_write_is_conditional_on_version() -> anyhow::Result<()> {
    let pool = setup().await?;
    let member_repo = SqliteMemberRepository::new(pool.clone());
    let repo = SqliteMembershipRepository::new(pool.clone());

    let member = member_repo
        .create(CreateMemberRequest {
            gym_id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            full_name: "Test Member".to_string(),
        })
        .await?;

    let today = Utc::now().date_naive();
    let membership = repo
        .create(CreateMembershipRequest {
            member_id: member.id,
            activity_id: None,
            activity_name: "Spinning".to_string(),
            cost_cents: 4000,
            auto_renewal: true,
            start_date: today - Duration::days(30),
            end_date: today - Duration::days(1),
            max_attendances: 12,
        })
        .await?;

    let renewal = MembershipRenewal {
        member_id: member.id,
        membership_id: membership.id,
        new_start: today,
        new_end: billing::add_calendar_month(today).unwrap(),
        new_cost_cents: 4000,
        renewal_date: Utc::now(),
        expected_version: membership.version,
    };

    let renewed = repo.apply_renewal(&renewal, None).await?;
    assert_eq!(renewed.version, membership.version + 1);
    assert_eq!(renewed.end_date, billing::add_calendar_month(today).unwrap());
    assert!(renewed.renewed_automatically);

    // Replaying the same renewal against the stale version is refused.
    let stale = repo.apply_renewal(&renewal, None).await;
    assert!(matches!(stale, Err(AppError::Conflict(_))));

    Ok(())
}
