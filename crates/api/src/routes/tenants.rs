//! Tenant management routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::routes::internal_error;
use crate::{AppState, middleware::AuthCaller};
use kredo_db::repositories::{CreateTenantInput, TenantError};

/// Creates the tenants router (auth middleware applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tenants", post(create_tenant))
        .route("/tenants/{tenant_id}", get(get_tenant))
}

/// Request body for creating a tenant.
#[derive(Debug, Deserialize)]
struct CreateTenantRequest {
    name: String,
    slug: String,
    #[serde(default = "default_free_tier")]
    is_free_tier: bool,
}

fn default_free_tier() -> bool {
    true
}

/// POST /tenants - Register a tenant with a zero-balance credit account.
async fn create_tenant(
    State(state): State<AppState>,
    auth: AuthCaller,
    Json(payload): Json<CreateTenantRequest>,
) -> impl IntoResponse {
    if let Err(forbidden) = auth.authorize_service() {
        return forbidden;
    }
    if payload.name.trim().is_empty() || payload.slug.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_tenant",
                "message": "Both name and slug are required"
            })),
        )
            .into_response();
    }

    match state
        .tenants
        .create(CreateTenantInput {
            name: payload.name,
            slug: payload.slug,
            is_free_tier: payload.is_free_tier,
        })
        .await
    {
        Ok(tenant) => {
            info!(tenant_id = %tenant.id, slug = %tenant.slug, "tenant created");
            (
                StatusCode::CREATED,
                Json(json!({
                    "id": tenant.id,
                    "name": tenant.name,
                    "slug": tenant.slug,
                    "is_free_tier": tenant.is_free_tier,
                    "created_at": tenant.created_at,
                })),
            )
                .into_response()
        }
        Err(TenantError::SlugTaken(slug)) => (
            StatusCode::CONFLICT,
            Json(json!({
                "error": "slug_taken",
                "message": format!("A tenant with slug '{slug}' already exists")
            })),
        )
            .into_response(),
        Err(TenantError::Database(e)) => {
            error!(error = %e, "failed to create tenant");
            internal_error()
        }
    }
}

/// GET /tenants/{tenant_id} - Fetch a tenant record.
async fn get_tenant(
    State(state): State<AppState>,
    auth: AuthCaller,
    Path(tenant_id): Path<Uuid>,
) -> impl IntoResponse {
    if let Err(forbidden) = auth.authorize_service() {
        return forbidden;
    }

    match state.tenants.get(tenant_id).await {
        Ok(Some(tenant)) => Json(json!({
            "id": tenant.id,
            "name": tenant.name,
            "slug": tenant.slug,
            "is_free_tier": tenant.is_free_tier,
            "created_at": tenant.created_at,
        }))
        .into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "tenant_not_found",
                "message": format!("Tenant {tenant_id} does not exist")
            })),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "failed to fetch tenant");
            internal_error()
        }
    }
}
