//! Credit balance, consumption, mutation, transfer, and history routes.
//!
//! Ledger outcomes are business results, not transport failures: every
//! outcome maps to HTTP 200 with a `success` flag, and only bad requests,
//! missing tenants, and faults use error status codes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::routes::{internal_error, ledger_error_response};
use crate::{AppState, middleware::AuthCaller};
use kredo_core::{BalanceUpdateOutcome, ConsumeOutcome, TransactionType, TransferOutcome};
use kredo_db::entities::credit_transactions;
use kredo_db::repositories::{BalanceUpdateInput, ConsumeInput, TransactionFilter};
use kredo_shared::types::pagination::{PageRequest, PageResponse};

/// Creates the credits router (auth middleware applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tenants/{tenant_id}/credits", get(get_balance))
        .route("/tenants/{tenant_id}/credits/consume", post(consume))
        .route(
            "/tenants/{tenant_id}/credits/transactions",
            post(update_balance).get(list_transactions),
        )
        .route("/tenants/{tenant_id}/credits/transfer", post(transfer))
}

/// GET /tenants/{tenant_id}/credits - Balance snapshot.
///
/// A tenant that exists but has never transacted reads as all zeroes.
async fn get_balance(
    State(state): State<AppState>,
    auth: AuthCaller,
    Path(tenant_id): Path<Uuid>,
) -> impl IntoResponse {
    if let Err(forbidden) = auth.authorize_tenant(tenant_id) {
        return forbidden;
    }

    let tenant = match state.tenants.get(tenant_id).await {
        Ok(Some(tenant)) => tenant,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "error": "tenant_not_found",
                    "message": format!("Tenant {tenant_id} does not exist")
                })),
            )
                .into_response();
        }
        Err(e) => {
            error!(error = %e, "failed to fetch tenant");
            return internal_error();
        }
    };

    match state.tenants.get_account(tenant_id).await {
        Ok(Some(account)) => Json(json!({
            "tenant_id": tenant.id,
            "balance": account.balance,
            "free_credits_balance": account.free_credits_balance,
            "purchased_credits_balance": account.purchased_credits_balance,
            "lifetime_earned": account.lifetime_earned,
            "lifetime_spent": account.lifetime_spent,
            "credits_used_today": account.credits_used_today,
            "next_free_grant_at": account.next_free_grant_at,
            "last_free_grant_at": account.last_free_grant_at,
        }))
        .into_response(),
        Ok(None) => Json(json!({
            "tenant_id": tenant.id,
            "balance": 0,
            "free_credits_balance": 0,
            "purchased_credits_balance": 0,
            "lifetime_earned": 0,
            "lifetime_spent": 0,
            "credits_used_today": 0,
            "next_free_grant_at": null,
            "last_free_grant_at": null,
        }))
        .into_response(),
        Err(e) => {
            error!(error = %e, "failed to fetch account");
            internal_error()
        }
    }
}

/// Request body for consuming credits.
#[derive(Debug, Deserialize)]
struct ConsumeRequest {
    action_key: String,
    reference_id: Option<String>,
    reference_type: Option<String>,
    description: Option<String>,
}

/// POST /tenants/{tenant_id}/credits/consume - Bill one action.
async fn consume(
    State(state): State<AppState>,
    auth: AuthCaller,
    Path(tenant_id): Path<Uuid>,
    Json(payload): Json<ConsumeRequest>,
) -> impl IntoResponse {
    if let Err(forbidden) = auth.authorize_tenant(tenant_id) {
        return forbidden;
    }
    if payload.action_key.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_action_key",
                "message": "action_key is required"
            })),
        )
            .into_response();
    }

    let outcome = state
        .ledger
        .consume_credits(
            tenant_id,
            ConsumeInput {
                action_key: payload.action_key,
                reference_id: payload.reference_id,
                reference_type: payload.reference_type,
                description: payload.description,
            },
        )
        .await;

    match outcome {
        Ok(ConsumeOutcome::FreeAction { action_key }) => Json(json!({
            "success": true,
            "free_action": true,
            "action_key": action_key,
            "credits_consumed": 0,
        }))
        .into_response(),
        Ok(ConsumeOutcome::Consumed { cost, applied }) => Json(json!({
            "success": true,
            "credits_consumed": cost,
            "balance_before": applied.balance_before,
            "new_balance": applied.new_balance,
            "transaction_id": applied.transaction_id,
            "duplicate": false,
        }))
        .into_response(),
        Ok(ConsumeOutcome::Duplicate {
            transaction_id,
            new_balance,
            cost,
        }) => Json(json!({
            "success": true,
            "credits_consumed": cost,
            "new_balance": new_balance,
            "transaction_id": transaction_id,
            "duplicate": true,
        }))
        .into_response(),
        Ok(ConsumeOutcome::InsufficientCredits {
            required,
            available,
        }) => Json(json!({
            "success": false,
            "error": "insufficient_credits",
            "required": required,
            "available": available,
            "shortfall": required - available,
        }))
        .into_response(),
        Ok(ConsumeOutcome::RateLimited { retry_after_secs }) => Json(json!({
            "success": false,
            "error": "rate_limited",
            "retry_after_secs": retry_after_secs,
        }))
        .into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// Request body for a typed balance mutation.
#[derive(Debug, Deserialize)]
struct UpdateBalanceRequest {
    transaction_type: String,
    amount: i64,
    reference_id: Option<String>,
    reference_type: Option<String>,
    description: Option<String>,
    metadata: Option<serde_json::Value>,
}

/// POST /tenants/{tenant_id}/credits/transactions - Apply a typed mutation.
async fn update_balance(
    State(state): State<AppState>,
    auth: AuthCaller,
    Path(tenant_id): Path<Uuid>,
    Json(payload): Json<UpdateBalanceRequest>,
) -> impl IntoResponse {
    if let Err(forbidden) = auth.authorize_tenant(tenant_id) {
        return forbidden;
    }
    let Some(transaction_type) = TransactionType::parse(&payload.transaction_type) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_transaction_type",
                "message": format!("Unknown transaction type '{}'", payload.transaction_type)
            })),
        )
            .into_response();
    };

    let outcome = state
        .ledger
        .update_credit_balance(
            tenant_id,
            BalanceUpdateInput {
                transaction_type,
                amount: payload.amount,
                reference_id: payload.reference_id,
                reference_type: payload.reference_type,
                description: payload.description,
                metadata: payload.metadata,
            },
        )
        .await;

    match outcome {
        Ok(BalanceUpdateOutcome::Applied(applied)) => Json(json!({
            "success": true,
            "balance_before": applied.balance_before,
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
        Ok(BalanceUpdateOutcome::InsufficientCredits {
            current_balance,
            required,
        }) => Json(json!({
            "success": false,
            "error": "insufficient_credits",
            "current_balance": current_balance,
            "required": required,
            "shortfall": required - current_balance,
        }))
        .into_response(),
        Ok(BalanceUpdateOutcome::InvalidAmount { amount }) => Json(json!({
            "success": false,
            "error": "invalid_amount",
            "amount": amount,
        }))
        .into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// Request body for a transfer.
#[derive(Debug, Deserialize)]
struct TransferRequest {
    to_tenant_id: Uuid,
    amount: i64,
    reference_id: Option<String>,
    description: Option<String>,
}

/// POST /tenants/{tenant_id}/credits/transfer - Move credits to another
/// tenant.
async fn transfer(
    State(state): State<AppState>,
    auth: AuthCaller,
    Path(tenant_id): Path<Uuid>,
    Json(payload): Json<TransferRequest>,
) -> impl IntoResponse {
    if let Err(forbidden) = auth.authorize_tenant(tenant_id) {
        return forbidden;
    }

    let outcome = state
        .ledger
        .transfer_credits(
            tenant_id,
            payload.to_tenant_id,
            payload.amount,
            payload.reference_id,
            payload.description,
        )
        .await;

    match outcome {
        Ok(TransferOutcome::Applied { debit, credit }) => Json(json!({
            "success": true,
            "from_balance": debit.new_balance,
            "to_balance": credit.new_balance,
            "debit_transaction_id": debit.transaction_id,
            "credit_transaction_id": credit.transaction_id,
            "duplicate": false,
        }))
        .into_response(),
        Ok(TransferOutcome::Duplicate { transaction_id }) => Json(json!({
            "success": true,
            "transaction_id": transaction_id,
            "duplicate": true,
        }))
        .into_response(),
        Ok(TransferOutcome::InsufficientCredits {
            current_balance,
            required,
        }) => Json(json!({
            "success": false,
            "error": "insufficient_credits",
            "current_balance": current_balance,
            "required": required,
            "shortfall": required - current_balance,
        }))
        .into_response(),
        Ok(TransferOutcome::Invalid { reason }) => Json(json!({
            "success": false,
            "error": reason,
        }))
        .into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// Query parameters for listing transactions.
#[derive(Debug, Deserialize)]
struct ListQuery {
    page: Option<u32>,
    per_page: Option<u32>,
    transaction_type: Option<String>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

/// GET /tenants/{tenant_id}/credits/transactions - Ledger history, newest
/// first.
async fn list_transactions(
    State(state): State<AppState>,
    auth: AuthCaller,
    Path(tenant_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    if let Err(forbidden) = auth.authorize_tenant(tenant_id) {
        return forbidden;
    }

    let transaction_type = match query.transaction_type.as_deref() {
        None => None,
        Some(raw) => match TransactionType::parse(raw) {
            Some(t) => Some(t),
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "error": "invalid_transaction_type",
                        "message": format!("Unknown transaction type '{raw}'")
                    })),
                )
                    .into_response();
            }
        },
    };

    let default_page = PageRequest::default();
    let page = PageRequest {
        page: query.page.unwrap_or(default_page.page),
        per_page: query.per_page.unwrap_or(default_page.per_page).min(500),
    };
    let filter = TransactionFilter {
        transaction_type,
        from: query.from,
        to: query.to,
    };

    match state.ledger.list_transactions(tenant_id, &filter, &page).await {
        Ok((rows, total)) => {
            let data: Vec<serde_json::Value> = rows.iter().map(transaction_json).collect();
            Json(PageResponse::new(data, page.page, page.per_page, total)).into_response()
        }
        Err(e) => {
            error!(error = %e, "failed to list transactions");
            internal_error()
        }
    }
}

fn transaction_json(row: &credit_transactions::Model) -> serde_json::Value {
    json!({
        "id": row.id,
        "amount": row.amount,
        "balance_after": row.balance_after,
        "transaction_type": TransactionType::from(row.transaction_type.clone()).as_str(),
        "reference_id": row.reference_id,
        "reference_type": row.reference_type,
        "description": row.description,
        "metadata": row.metadata,
        "created_at": row.created_at,
    })
}
