//! Free-grant routes, called by the scheduler.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::post,
};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::routes::{internal_error, ledger_error_response};
use crate::{AppState, middleware::AuthCaller};
use kredo_db::repositories::GrantResult;

/// Creates the grants router (auth middleware applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tenants/{tenant_id}/credits/grant", post(grant_one))
        .route("/credits/grants/sweep", post(sweep))
}

/// POST /tenants/{tenant_id}/credits/grant - Grant one tenant's cycle.
async fn grant_one(
    State(state): State<AppState>,
    auth: AuthCaller,
    Path(tenant_id): Path<Uuid>,
) -> impl IntoResponse {
    if let Err(forbidden) = auth.authorize_service() {
        return forbidden;
    }

    match state.grants.grant_free_credits(tenant_id).await {
        Ok(GrantResult::Granted {
            expired,
            granted,
            new_balance,
            next_grant_at,
        }) => Json(json!({
            "success": true,
            "granted": granted,
            "expired": expired,
            "new_balance": new_balance,
            "next_grant_at": next_grant_at,
        }))
        .into_response(),
        Ok(GrantResult::NotDue { next_grant_at }) => Json(json!({
            "success": false,
            "error": "not_due",
            "next_grant_at": next_grant_at,
        }))
        .into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// POST /credits/grants/sweep - Grant every due free-tier tenant.
async fn sweep(State(state): State<AppState>, auth: AuthCaller) -> impl IntoResponse {
    if let Err(forbidden) = auth.authorize_service() {
        return forbidden;
    }

    match state.grants.sweep_due_grants().await {
        Ok(summary) => Json(json!({
            "granted": summary.granted,
            "skipped": summary.skipped,
        }))
        .into_response(),
        Err(e) => {
            error!(error = %e, "grant sweep failed");
            internal_error()
        }
    }
}
