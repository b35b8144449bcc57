//! Promo and referral redemption routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::routes::ledger_error_response;
use crate::{AppState, middleware::AuthCaller};
use kredo_core::RedemptionOutcome;

/// Creates the redemptions router (auth middleware applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tenants/{tenant_id}/redemptions/promo", post(redeem_promo))
        .route(
            "/tenants/{tenant_id}/redemptions/referral",
            post(redeem_referral),
        )
}

/// Request body for redeeming a code.
#[derive(Debug, Deserialize)]
struct RedeemRequest {
    code: String,
}

fn outcome_json(outcome: RedemptionOutcome) -> Json<serde_json::Value> {
    match outcome {
        RedemptionOutcome::Applied {
            credits_granted,
            referrer_credits,
            new_balance,
        } => Json(json!({
            "success": true,
            "credits_granted": credits_granted,
            "referrer_credits": referrer_credits,
            "new_balance": new_balance,
        })),
        RedemptionOutcome::AlreadyRedeemed => Json(json!({
            "success": false,
            "error": "already_redeemed",
        })),
        RedemptionOutcome::Rejected(rejection) => Json(json!({
            "success": false,
            "error": rejection.as_str(),
        })),
    }
}

/// POST /tenants/{tenant_id}/redemptions/promo - Redeem a promo code.
async fn redeem_promo(
    State(state): State<AppState>,
    auth: AuthCaller,
    Path(tenant_id): Path<Uuid>,
    Json(payload): Json<RedeemRequest>,
) -> impl IntoResponse {
    if let Err(forbidden) = auth.authorize_tenant(tenant_id) {
        return forbidden;
    }
    if payload.code.trim().is_empty() {
        return empty_code_response();
    }

    match state.redemptions.redeem_promo(tenant_id, &payload.code).await {
        Ok(outcome) => outcome_json(outcome).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// POST /tenants/{tenant_id}/redemptions/referral - Redeem a referral code.
async fn redeem_referral(
    State(state): State<AppState>,
    auth: AuthCaller,
    Path(tenant_id): Path<Uuid>,
    Json(payload): Json<RedeemRequest>,
) -> impl IntoResponse {
    if let Err(forbidden) = auth.authorize_tenant(tenant_id) {
        return forbidden;
    }
    if payload.code.trim().is_empty() {
        return empty_code_response();
    }

    match state
        .redemptions
        .redeem_referral(tenant_id, &payload.code)
        .await
    {
        Ok(outcome) => outcome_json(outcome).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

fn empty_code_response() -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": "invalid_code",
            "message": "code is required"
        })),
    )
        .into_response()
}
