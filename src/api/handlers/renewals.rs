use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::state::AppState,
    domain::{RenewalCandidate, RenewalDetail, RenewalHistoryEntry, RenewalResult},
    error::Result,
};

#[derive(Debug, Serialize)]
pub struct CandidateDto {
    member_id: Uuid,
    member_name: String,
    membership_id: Uuid,
    activity_name: String,
    cost_cents: i64,
    end_date: NaiveDate,
}

impl From<RenewalCandidate> for CandidateDto {
    fn from(candidate: RenewalCandidate) -> Self {
        Self {
            member_id: candidate.membership.member_id,
            member_name: candidate.member_name,
            membership_id: candidate.membership.id,
            activity_name: candidate.membership.activity_name,
            cost_cents: candidate.membership.cost_cents,
            end_date: candidate.membership.end_date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CandidateListResponse {
    memberships: Vec<CandidateDto>,
    total: usize,
}

/// Runs the full auto-renewal batch for a gym. Partial failures are reported
/// inside the result, not as an HTTP error.
pub async fn run_batch(
    State(state): State<AppState>,
    Path(gym_id): Path<Uuid>,
) -> Json<RenewalResult> {
    let result = state
        .service_context
        .renewal_service
        .process_all_auto_renewals(gym_id)
        .await;

    Json(result)
}

pub async fn renew_one(
    State(state): State<AppState>,
    Path((gym_id, member_id, membership_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<Json<RenewalDetail>> {
    let detail = state
        .service_context
        .renewal_service
        .renew_membership_with_updated_price(gym_id, member_id, membership_id)
        .await?;

    Ok(Json(detail))
}

pub async fn expired(
    State(state): State<AppState>,
    Path(gym_id): Path<Uuid>,
) -> Result<Json<CandidateListResponse>> {
    let candidates = state
        .service_context
        .renewal_service
        .get_expired_auto_renewal_memberships(gym_id)
        .await?;

    let total = candidates.len();
    let memberships: Vec<CandidateDto> = candidates.into_iter().map(Into::into).collect();

    Ok(Json(CandidateListResponse { memberships, total }))
}

#[derive(Debug, Deserialize)]
pub struct UpcomingParams {
    days_ahead: Option<i64>,
}

pub async fn upcoming(
    State(state): State<AppState>,
    Path(gym_id): Path<Uuid>,
    Query(params): Query<UpcomingParams>,
) -> Result<Json<CandidateListResponse>> {
    let days_ahead = params
        .days_ahead
        .unwrap_or(state.settings.renewal.default_days_ahead);

    let candidates = state
        .service_context
        .renewal_service
        .get_upcoming_auto_renewals(gym_id, days_ahead)
        .await?;

    let total = candidates.len();
    let memberships: Vec<CandidateDto> = candidates.into_iter().map(Into::into).collect();

    Ok(Json(CandidateListResponse { memberships, total }))
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    #[serde(default = "default_history_limit")]
    limit: i64,
}

fn default_history_limit() -> i64 {
    20
}

pub async fn history(
    State(state): State<AppState>,
    Path(gym_id): Path<Uuid>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<RenewalHistoryEntry>>> {
    let entries = state
        .service_context
        .renewal_service
        .get_renewal_history(gym_id, params.limit)
        .await?;

    Ok(Json(entries))
}
