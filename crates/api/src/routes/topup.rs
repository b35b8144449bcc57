//! Auto-top-up routes: configuration, the trigger decision, the payment
//! webhook, and the monthly counter reset.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::routes::{internal_error, ledger_error_response};
use crate::{AppState, middleware::AuthCaller};
use kredo_core::BalanceUpdateOutcome;
use kredo_core::topup::TopupDecision;
use kredo_db::entities::auto_topup_configs;

/// Creates the top-up router (auth middleware applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/tenants/{tenant_id}/topup/config",
            get(get_config).put(put_config),
        )
        .route("/tenants/{tenant_id}/topup/check", get(check))
        .route("/tenants/{tenant_id}/topup/record", post(record))
        .route("/credits/topups/reset", post(reset_counters))
}

fn config_json(config: &auto_topup_configs::Model) -> serde_json::Value {
    json!({
        "tenant_id": config.tenant_id,
        "enabled": config.enabled,
        "trigger_threshold": config.trigger_threshold,
        "topup_amount": config.topup_amount,
        "max_per_month": config.max_per_month,
        "topups_this_month": config.topups_this_month,
        "has_payment_method": config.payment_method_id.is_some(),
        "counters_reset_at": config.counters_reset_at,
    })
}

/// GET /tenants/{tenant_id}/topup/config - Fetch the configuration.
async fn get_config(
    State(state): State<AppState>,
    auth: AuthCaller,
    Path(tenant_id): Path<Uuid>,
) -> impl IntoResponse {
    if let Err(forbidden) = auth.authorize_tenant(tenant_id) {
        return forbidden;
    }

    match state.topups.get_config(tenant_id).await {
        Ok(Some(config)) => Json(config_json(&config)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "not_configured",
                "message": "Auto-top-up is not configured for this tenant"
            })),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "failed to fetch top-up config");
            internal_error()
        }
    }
}

/// Request body for configuring auto-top-up.
#[derive(Debug, Deserialize)]
struct ConfigRequest {
    enabled: bool,
    trigger_threshold: i64,
    topup_amount: i64,
    max_per_month: i32,
    payment_method_id: Option<String>,
}

/// PUT /tenants/{tenant_id}/topup/config - Create or replace the
/// configuration.
async fn put_config(
    State(state): State<AppState>,
    auth: AuthCaller,
    Path(tenant_id): Path<Uuid>,
    Json(payload): Json<ConfigRequest>,
) -> impl IntoResponse {
    if let Err(forbidden) = auth.authorize_tenant(tenant_id) {
        return forbidden;
    }
    if payload.topup_amount <= 0 || payload.max_per_month < 0 || payload.trigger_threshold < 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_config",
                "message": "topup_amount must be positive; thresholds must be non-negative"
            })),
        )
            .into_response();
    }

    match state
        .topups
        .upsert_config(
            tenant_id,
            kredo_db::repositories::TopupConfigInput {
                enabled: payload.enabled,
                trigger_threshold: payload.trigger_threshold,
                topup_amount: payload.topup_amount,
                max_per_month: payload.max_per_month,
                payment_method_id: payload.payment_method_id,
            },
        )
        .await
    {
        Ok(config) => Json(config_json(&config)).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// GET /tenants/{tenant_id}/topup/check - Should a top-up be triggered?
async fn check(
    State(state): State<AppState>,
    auth: AuthCaller,
    Path(tenant_id): Path<Uuid>,
) -> impl IntoResponse {
    if let Err(forbidden) = auth.authorize_tenant(tenant_id) {
        return forbidden;
    }

    match state.topups.check_auto_topup(tenant_id).await {
        Ok(TopupDecision::Trigger { topup_amount }) => Json(json!({
            "trigger": true,
            "topup_amount": topup_amount,
        }))
        .into_response(),
        Ok(TopupDecision::Skip(reason)) => Json(json!({
            "trigger": false,
            "reason": reason.as_str(),
        }))
        .into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// Request body for recording a completed top-up payment.
#[derive(Debug, Deserialize)]
struct RecordRequest {
    external_payment_id: String,
    amount: i64,
}

/// POST /tenants/{tenant_id}/topup/record - Payment webhook callback.
async fn record(
    State(state): State<AppState>,
    auth: AuthCaller,
    Path(tenant_id): Path<Uuid>,
    Json(payload): Json<RecordRequest>,
) -> impl IntoResponse {
    if let Err(forbidden) = auth.authorize_service() {
        return forbidden;
    }
    if payload.external_payment_id.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_payment_id",
                "message": "external_payment_id is required"
            })),
        )
            .into_response();
    }

    match state
        .topups
        .record_auto_topup(tenant_id, &payload.external_payment_id, payload.amount)
        .await
    {
        Ok(BalanceUpdateOutcome::Applied(applied)) => Json(json!({
            "success": true,
            "new_balance": applied.new_balance,
            "transaction_id": applied.transaction_id,
            "duplicate": false,
        }))
        .into_response(),
        Ok(BalanceUpdateOutcome::Duplicate {
            transaction_id,
            new_balance,
        }) => Json(json!({
            "success": true,
            "new_balance": new_balance,
            "transaction_id": transaction_id,
            "duplicate": true,
        }))
        .into_response(),
        Ok(BalanceUpdateOutcome::InvalidAmount { amount }) => Json(json!({
            "success": false,
            "error": "invalid_amount",
            "amount": amount,
        }))
        .into_response(),
        // Purchases never report insufficient credits
        Ok(BalanceUpdateOutcome::InsufficientCredits { .. }) => internal_error(),
        Err(e) => ledger_error_response(&e),
    }
}

/// POST /credits/topups/reset - Scheduler hook for the monthly counters.
async fn reset_counters(State(state): State<AppState>, auth: AuthCaller) -> impl IntoResponse {
    if let Err(forbidden) = auth.authorize_service() {
        return forbidden;
    }

    match state.topups.reset_monthly_counters().await {
        Ok(reset) => Json(json!({ "reset": reset })).into_response(),
        Err(e) => {
            error!(error = %e, "counter reset failed");
            internal_error()
        }
    }
}
