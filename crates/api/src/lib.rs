//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes for the credit ledger
//! - Service-token authentication middleware
//! - Outcome-to-JSON response mapping

pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use kredo_db::repositories::{
    GrantRepository, LedgerRepository, RedemptionRepository, TenantRepository, TopupRepository,
};
use kredo_shared::config::LedgerConfig;
use kredo_shared::jwt::JwtService;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
///
/// Repositories are built once and cloned into handlers, so the cost cache
/// inside the ledger repository is shared across requests.
#[derive(Clone)]
pub struct AppState {
    /// JWT service for validating caller tokens.
    pub jwt_service: Arc<JwtService>,
    /// Tenant records.
    pub tenants: TenantRepository,
    /// The credit ledger.
    pub ledger: LedgerRepository,
    /// Free-grant cycle.
    pub grants: GrantRepository,
    /// Auto-top-up state.
    pub topups: TopupRepository,
    /// Promo and referral redemption.
    pub redemptions: RedemptionRepository,
}

impl AppState {
    /// Builds the application state from a connection and configuration.
    #[must_use]
    pub fn new(db: DatabaseConnection, jwt_service: JwtService, ledger: &LedgerConfig) -> Self {
        Self {
            jwt_service: Arc::new(jwt_service),
            tenants: TenantRepository::new(db.clone()),
            ledger: LedgerRepository::new(db.clone(), ledger),
            grants: GrantRepository::new(db.clone(), ledger.free_grant_amount),
            topups: TopupRepository::new(db.clone()),
            redemptions: RedemptionRepository::new(db),
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
