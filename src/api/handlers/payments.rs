use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    api::state::AppState,
    domain::{MonthlyPayment, PaymentStatus},
    error::Result,
    service::GenerationSummary,
};

#[derive(Debug, Serialize)]
pub struct PaymentDto {
    id: Uuid,
    member_id: Uuid,
    membership_id: Uuid,
    amount_cents: i64,
    /// Effective status: pending charges past their due date show as overdue.
    status: PaymentStatus,
    due_date: NaiveDate,
    billing_period: String,
    auto_generated: bool,
    renewal_payment: bool,
    price_updated: bool,
    previous_price_cents: Option<i64>,
    paid_at: Option<DateTime<Utc>>,
}

impl PaymentDto {
    fn from_payment(payment: MonthlyPayment, today: NaiveDate) -> Self {
        Self {
            id: payment.id,
            member_id: payment.member_id,
            membership_id: payment.membership_id,
            amount_cents: payment.amount_cents,
            status: payment.effective_status(today),
            due_date: payment.due_date,
            billing_period: payment.billing_period,
            auto_generated: payment.auto_generated,
            renewal_payment: payment.renewal_payment,
            price_updated: payment.price_updated,
            previous_price_cents: payment.previous_price_cents,
            paid_at: payment.paid_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentListResponse {
    payments: Vec<PaymentDto>,
    total: usize,
}

fn to_list_response(payments: Vec<MonthlyPayment>) -> PaymentListResponse {
    let today = Utc::now().date_naive();
    let payments: Vec<PaymentDto> = payments
        .into_iter()
        .map(|p| PaymentDto::from_payment(p, today))
        .collect();
    let total = payments.len();

    PaymentListResponse { payments, total }
}

pub async fn generate(
    State(state): State<AppState>,
    Path(gym_id): Path<Uuid>,
) -> Result<Json<GenerationSummary>> {
    let summary = state
        .service_context
        .payment_service
        .generate_monthly_payments(gym_id)
        .await?;

    Ok(Json(summary))
}

pub async fn overdue(
    State(state): State<AppState>,
    Path(gym_id): Path<Uuid>,
) -> Result<Json<PaymentListResponse>> {
    let payments = state
        .service_context
        .payment_service
        .overdue_payments(gym_id)
        .await?;

    Ok(Json(to_list_response(payments)))
}

pub async fn list_by_member(
    State(state): State<AppState>,
    Path((_gym_id, member_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<PaymentListResponse>> {
    let payments = state
        .service_context
        .payment_service
        .member_payments(member_id)
        .await?;

    Ok(Json(to_list_response(payments)))
}

pub async fn register(
    State(state): State<AppState>,
    Path((gym_id, payment_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<PaymentDto>> {
    let payment = state
        .service_context
        .payment_service
        .register_payment(gym_id, payment_id)
        .await?;

    Ok(Json(PaymentDto::from_payment(
        payment,
        Utc::now().date_naive(),
    )))
}
