//! Shared setup for database integration tests.
//!
//! Tests run against a real Postgres instance named by `TEST_DATABASE_URL`
//! and are skipped when it is not set. Each test takes the global lock and
//! recreates the schema, so tests within one binary never interleave.

#![allow(dead_code)]

use std::sync::LazyLock;

use kredo_db::migration::{Migrator, MigratorTrait};
use kredo_db::repositories::{CreateTenantInput, TenantRepository};
use sea_orm::DatabaseConnection;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

static DB_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub struct TestDb {
    pub db: DatabaseConnection,
    _guard: MutexGuard<'static, ()>,
}

/// Connects and recreates the schema, or `None` when no test database is
/// configured.
pub async fn setup() -> Option<TestDb> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set; skipping database test");
        return None;
    };

    let guard = DB_LOCK.lock().await;
    let db = kredo_db::connect(&url).await.expect("connect test database");
    Migrator::fresh(&db).await.expect("run migrations");
    Some(TestDb { db, _guard: guard })
}

/// Creates a tenant and returns its id.
pub async fn create_tenant(db: &DatabaseConnection, slug: &str, is_free_tier: bool) -> Uuid {
    TenantRepository::new(db.clone())
        .create(CreateTenantInput {
            name: slug.to_string(),
            slug: slug.to_string(),
            is_free_tier,
        })
        .await
        .expect("create tenant")
        .id
}
