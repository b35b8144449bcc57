//! Tenant management.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use thiserror::Error;
use uuid::Uuid;

use crate::entities::{tenant_credit_accounts, tenants};

/// Errors from tenant operations.
#[derive(Debug, Error)]
pub enum TenantError {
    /// A tenant with the same slug already exists.
    #[error("Tenant slug already taken: {0}")]
    SlugTaken(String),
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating a tenant.
#[derive(Debug, Clone)]
pub struct CreateTenantInput {
    /// Display name.
    pub name: String,
    /// URL-safe unique identifier.
    pub slug: String,
    /// Whether the tenant starts on the free tier.
    pub is_free_tier: bool,
}

/// Repository for tenant records.
#[derive(Clone)]
pub struct TenantRepository {
    db: DatabaseConnection,
}

impl TenantRepository {
    /// Creates a new tenant repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a tenant together with its zero-balance credit account.
    ///
    /// # Errors
    ///
    /// Returns `TenantError::SlugTaken` if the slug is in use.
    pub async fn create(&self, input: CreateTenantInput) -> Result<tenants::Model, TenantError> {
        let txn = self.db.begin().await?;

        let existing = tenants::Entity::find()
            .filter(tenants::Column::Slug.eq(input.slug.as_str()))
            .one(&txn)
            .await?;
        if existing.is_some() {
            txn.rollback().await?;
            return Err(TenantError::SlugTaken(input.slug));
        }

        let now = Utc::now().into();
        let tenant = tenants::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            slug: Set(input.slug),
            is_free_tier: Set(input.is_free_tier),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        tenant_credit_accounts::ActiveModel {
            tenant_id: Set(tenant.id),
            balance: Set(0),
            free_credits_balance: Set(0),
            purchased_credits_balance: Set(0),
            lifetime_earned: Set(0),
            lifetime_spent: Set(0),
            credits_used_today: Set(0),
            warning_100_sent: Set(false),
            warning_50_sent: Set(false),
            warning_20_sent: Set(false),
            warning_0_sent: Set(false),
            // Free-tier tenants are immediately due for their first grant.
            next_free_grant_at: Set(tenant.is_free_tier.then_some(now)),
            last_free_grant_at: Set(None),
            actions_this_minute: Set(0),
            last_action_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(tenant)
    }

    /// Fetches a tenant by id.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub async fn get(&self, tenant_id: Uuid) -> Result<Option<tenants::Model>, DbErr> {
        tenants::Entity::find_by_id(tenant_id).one(&self.db).await
    }

    /// Fetches a tenant by slug.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<tenants::Model>, DbErr> {
        tenants::Entity::find()
            .filter(tenants::Column::Slug.eq(slug))
            .one(&self.db)
            .await
    }

    /// Fetches a tenant's credit account without locking it. Reads may be
    /// stale by design; mutating paths re-read under lock.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub async fn get_account(
        &self,
        tenant_id: Uuid,
    ) -> Result<Option<tenant_credit_accounts::Model>, DbErr> {
        tenant_credit_accounts::Entity::find_by_id(tenant_id)
            .one(&self.db)
            .await
    }
}
