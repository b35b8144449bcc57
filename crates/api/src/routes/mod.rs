//! API route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::auth::auth_middleware};

pub mod credits;
pub mod grants;
pub mod health;
pub mod redemptions;
pub mod tenants;
pub mod topup;

/// Creates the API router: public health plus authenticated ledger routes.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .merge(tenants::routes())
        .merge(credits::routes())
        .merge(grants::routes())
        .merge(topup::routes())
        .merge(redemptions::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new().merge(health::routes()).merge(protected_routes)
}

/// Maps an application error to an HTTP response with its code and message.
pub(crate) fn app_error_response(err: &kredo_shared::AppError) -> axum::response::Response {
    use axum::Json;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use serde_json::json;

    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(json!({
            "error": err.error_code(),
            "message": err.to_string()
        })),
    )
        .into_response()
}

/// Opaque 500 response for unexpected faults.
pub(crate) fn internal_error() -> axum::response::Response {
    app_error_response(&kredo_shared::AppError::Internal(
        "An error occurred".to_string(),
    ))
}

/// Maps a ledger repository error to an HTTP response.
pub(crate) fn ledger_error_response(e: &kredo_db::repositories::LedgerError) -> axum::response::Response {
    use axum::Json;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use kredo_db::repositories::LedgerError;
    use serde_json::json;

    match e {
        LedgerError::TenantNotFound(tenant_id) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "tenant_not_found",
                "message": format!("Tenant {tenant_id} does not exist")
            })),
        )
            .into_response(),
        LedgerError::Database(db_err) => {
            tracing::error!(error = %db_err, "database error");
            internal_error()
        }
    }
}
