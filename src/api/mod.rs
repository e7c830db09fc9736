pub mod handlers;
pub mod state;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::{config::Settings, service::ServiceContext};
use state::AppState;

pub fn create_app(service_context: Arc<ServiceContext>, settings: Arc<Settings>) -> Router {
    let app_state = AppState::new(service_context, settings);

    Router::new()
        // Root and health endpoints
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health_check))
        // API routes
        .nest("/api", api_routes())
        // Add state to the router
        .with_state(app_state)
        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive()) // Configure properly for production
        .layer(TraceLayer::new_for_http())
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/gyms/:gym_id/renewals/run",
            post(handlers::renewals::run_batch),
        )
        .route(
            "/gyms/:gym_id/renewals/expired",
            get(handlers::renewals::expired),
        )
        .route(
            "/gyms/:gym_id/renewals/upcoming",
            get(handlers::renewals::upcoming),
        )
        .route(
            "/gyms/:gym_id/renewals/history",
            get(handlers::renewals::history),
        )
        .route(
            "/gyms/:gym_id/members/:member_id/memberships/:membership_id/renew",
            post(handlers::renewals::renew_one),
        )
        .route(
            "/gyms/:gym_id/payments/generate",
            post(handlers::payments::generate),
        )
        .route(
            "/gyms/:gym_id/payments/overdue",
            get(handlers::payments::overdue),
        )
        .route(
            "/gyms/:gym_id/members/:member_id/payments",
            get(handlers::payments::list_by_member),
        )
        .route(
            "/gyms/:gym_id/payments/:payment_id/pay",
            post(handlers::payments::register),
        )
}
