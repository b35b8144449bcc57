//! Cached credit cost lookups.
//!
//! Action pricing changes rarely and is read on every billable action, so
//! lookups go through a short-TTL in-process cache. A stale entry only
//! delays a price change by the TTL; it never affects consistency because
//! the cost is resolved before the account lock is taken.

use std::time::Duration;

use moka::future::Cache;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};

use crate::entities::credit_costs;

/// Resolves the credit cost of an action key.
#[derive(Clone)]
pub struct CostResolver {
    db: DatabaseConnection,
    cache: Cache<String, Option<i64>>,
    default_cost: i64,
}

impl CostResolver {
    /// Creates a resolver with the given default cost and cache TTL.
    #[must_use]
    pub fn new(db: DatabaseConnection, default_cost: i64, cache_ttl_secs: u64) -> Self {
        Self {
            db,
            cache: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(Duration::from_secs(cache_ttl_secs))
                .build(),
            default_cost,
        }
    }

    /// Resolves the cost of `action_key`.
    ///
    /// An action with no active pricing row costs `default_cost`; unknown
    /// actions are billable by default so a missing row fails closed.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub async fn resolve(&self, action_key: &str) -> Result<i64, DbErr> {
        if let Some(cached) = self.cache.get(action_key).await {
            return Ok(cached.unwrap_or(self.default_cost));
        }

        let cost = credit_costs::Entity::find_by_id(action_key.to_string())
            .filter(credit_costs::Column::IsActive.eq(true))
            .one(&self.db)
            .await?
            .map(|row| row.credit_cost);

        self.cache.insert(action_key.to_string(), cost).await;
        Ok(cost.unwrap_or(self.default_cost))
    }

    /// Drops a cached entry, forcing the next lookup to hit the database.
    pub async fn invalidate(&self, action_key: &str) {
        self.cache.invalidate(action_key).await;
    }
}
