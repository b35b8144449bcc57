//! Authentication middleware for protected routes.
//!
//! Callers are other backend services holding a JWT. A token may be scoped
//! to one tenant; scoped tokens can only act on that tenant's routes.
//! Service-wide tokens (no tenant scope) may call any route, including the
//! scheduler and payment-webhook endpoints.

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use uuid::Uuid;

use crate::AppState;
use kredo_shared::auth::Claims;
use kredo_shared::jwt::JwtError;

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
}

/// Authentication middleware that validates service JWTs.
///
/// Stores the validated claims in request extensions for handlers to
/// authorize against.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(token) = auth_header.and_then(extract_bearer_token) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "missing_token",
                "message": "Authorization header with Bearer token is required"
            })),
        )
            .into_response();
    };

    match state.jwt_service.validate_token(token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => {
            let (error, message) = match e {
                JwtError::Expired => ("token_expired", "Token has expired"),
                _ => ("invalid_token", "Invalid or malformed token"),
            };
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": error, "message": message })),
            )
                .into_response()
        }
    }
}

/// Extractor for the authenticated service caller.
#[derive(Debug, Clone)]
pub struct AuthCaller(pub Claims);

impl AuthCaller {
    /// The calling service's name.
    #[must_use]
    pub fn caller(&self) -> &str {
        self.0.caller()
    }

    /// Rejects with 403 unless the token may act on `tenant_id`.
    ///
    /// # Errors
    ///
    /// Returns a ready-made forbidden response on scope mismatch.
    pub fn authorize_tenant(&self, tenant_id: Uuid) -> Result<(), Response> {
        if self.0.permits_tenant(tenant_id) {
            Ok(())
        } else {
            tracing::warn!(
                caller = self.caller(),
                %tenant_id,
                "tenant scope mismatch"
            );
            Err((
                StatusCode::FORBIDDEN,
                Json(json!({
                    "error": "tenant_scope_mismatch",
                    "message": "Token is not scoped to this tenant"
                })),
            )
                .into_response())
        }
    }

    /// Rejects with 403 unless the token is service-wide.
    ///
    /// # Errors
    ///
    /// Returns a ready-made forbidden response for tenant-scoped tokens.
    pub fn authorize_service(&self) -> Result<(), Response> {
        if self.0.is_service_wide() {
            Ok(())
        } else {
            Err((
                StatusCode::FORBIDDEN,
                Json(json!({
                    "error": "service_token_required",
                    "message": "This route requires a service-wide token"
                })),
            )
                .into_response())
        }
    }
}

impl<S> FromRequestParts<S> for AuthCaller
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthCaller)
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({
                        "error": "unauthorized",
                        "message": "Authentication required"
                    })),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer_token("bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer_token("Basic abc123"), None);
        assert_eq!(extract_bearer_token(""), None);
    }
}
