//! Router-level tests for authentication and scope enforcement.
//!
//! These exercise the middleware and routing without a database: every
//! request here is rejected before any repository call.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use kredo_api::{AppState, create_router};
use kredo_shared::config::LedgerConfig;
use kredo_shared::jwt::{JwtConfig, JwtService};
use sea_orm::DatabaseConnection;
use tower::ServiceExt;
use uuid::Uuid;

fn jwt_service() -> JwtService {
    JwtService::new(JwtConfig {
        secret: "router-test-secret".to_string(),
        token_expires_secs: 3600,
    })
}

fn test_router() -> axum::Router {
    let state = AppState::new(
        DatabaseConnection::Disconnected,
        jwt_service(),
        &LedgerConfig::default(),
    );
    create_router(state)
}

#[tokio::test]
async fn health_is_public() {
    let response = test_router()
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let tenant = Uuid::new_v4();
    let response = test_router()
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/tenants/{tenant}/credits"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn garbage_token_is_unauthorized() {
    let tenant = Uuid::new_v4();
    let response = test_router()
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/tenants/{tenant}/credits"))
                .header(header::AUTHORIZATION, "Bearer not.a.token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn scoped_token_cannot_cross_tenants() {
    let own_tenant = Uuid::new_v4();
    let other_tenant = Uuid::new_v4();
    let token = jwt_service()
        .generate_token("storefront-api", Some(own_tenant))
        .unwrap();

    let response = test_router()
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/tenants/{other_tenant}/credits"))
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "tenant_scope_mismatch");
}

#[tokio::test]
async fn scheduler_routes_require_a_service_token() {
    let tenant = Uuid::new_v4();
    let token = jwt_service()
        .generate_token("storefront-api", Some(tenant))
        .unwrap();

    let response = test_router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/credits/grants/sweep")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "service_token_required");
}
