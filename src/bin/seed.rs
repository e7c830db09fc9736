use chrono::{Duration, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use uuid::Uuid;

use gymledger::{
    domain::{
        CreateActivityRequest, CreateMemberRequest, CreateMembershipPlanRequest,
        CreateMembershipRequest, MemberStatus,
    },
    repository::{
        ActivityRepository, MemberRepository, MembershipRepository, SqliteActivityRepository,
        SqliteMemberRepository, SqliteMembershipRepository,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("Starting database seeding...");

    // Initialize database connection
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:gymledger.db".to_string());

    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    // Run migrations first
    println!("Running migrations...");
    sqlx::migrate!("./migrations").run(&db_pool).await?;

    let member_repo = SqliteMemberRepository::new(db_pool.clone());
    let activity_repo = SqliteActivityRepository::new(db_pool.clone());
    let membership_repo = SqliteMembershipRepository::new(db_pool.clone());

    let gym_id = Uuid::new_v4();
    println!("Seeding demo gym {}", gym_id);

    // Activities
    println!("Creating activities...");
    let spinning = activity_repo
        .create(CreateActivityRequest {
            gym_id,
            name: "Spinning".to_string(),
            price_cents: Some(4500),
            cost_cents: None,
            monthly_price_cents: None,
        })
        .await?;

    let crossfit = activity_repo
        .create(CreateActivityRequest {
            gym_id,
            name: "Crossfit".to_string(),
            price_cents: None,
            cost_cents: None,
            monthly_price_cents: Some(6000),
        })
        .await?;

    // Yoga carries no price on the activity record; pricing falls back to
    // its membership plan.
    let yoga = activity_repo
        .create(CreateActivityRequest {
            gym_id,
            name: "Yoga".to_string(),
            price_cents: None,
            cost_cents: None,
            monthly_price_cents: None,
        })
        .await?;

    activity_repo
        .create_plan(CreateMembershipPlanRequest {
            gym_id,
            activity_id: yoga.id,
            name: "Yoga monthly".to_string(),
            cost_cents: 3800,
        })
        .await?;

    // Members
    println!("Creating members...");
    let alice = member_repo
        .create(CreateMemberRequest {
            gym_id,
            email: "alice@example.com".to_string(),
            full_name: "Alice Johnson".to_string(),
        })
        .await?;

    let bob = member_repo
        .create(CreateMemberRequest {
            gym_id,
            email: "bob@example.com".to_string(),
            full_name: "Bob Martinez".to_string(),
        })
        .await?;

    let carol = member_repo
        .create(CreateMemberRequest {
            gym_id,
            email: "carol@example.com".to_string(),
            full_name: "Carol Osei".to_string(),
        })
        .await?;
    member_repo
        .update_status(carol.id, MemberStatus::Suspended)
        .await?;

    let today = Utc::now().date_naive();

    // Memberships: one expired (picked up by the next renewal run), one
    // expiring soon, one on a suspended member that renewal must skip.
    println!("Creating memberships...");
    membership_repo
        .create(CreateMembershipRequest {
            member_id: alice.id,
            activity_id: Some(spinning.id),
            activity_name: spinning.name.clone(),
            cost_cents: 4000,
            auto_renewal: true,
            start_date: today - Duration::days(40),
            end_date: today - Duration::days(10),
            max_attendances: 12,
        })
        .await?;

    membership_repo
        .create(CreateMembershipRequest {
            member_id: alice.id,
            activity_id: Some(yoga.id),
            activity_name: yoga.name.clone(),
            cost_cents: 3800,
            auto_renewal: true,
            start_date: today - Duration::days(25),
            end_date: today + Duration::days(5),
            max_attendances: 8,
        })
        .await?;

    membership_repo
        .create(CreateMembershipRequest {
            member_id: bob.id,
            activity_id: Some(crossfit.id),
            activity_name: crossfit.name.clone(),
            cost_cents: 6000,
            auto_renewal: false,
            start_date: today - Duration::days(20),
            end_date: today + Duration::days(10),
            max_attendances: 16,
        })
        .await?;

    membership_repo
        .create(CreateMembershipRequest {
            member_id: carol.id,
            activity_id: Some(spinning.id),
            activity_name: spinning.name.clone(),
            cost_cents: 4500,
            auto_renewal: true,
            start_date: today - Duration::days(60),
            end_date: today - Duration::days(30),
            max_attendances: 12,
        })
        .await?;

    println!("Seeding complete.");
    println!("  gym id: {}", gym_id);
    println!("  run the renewal batch: POST /api/gyms/{}/renewals/run", gym_id);

    Ok(())
}
