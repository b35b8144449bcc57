//! Auto-top-up configuration and recording.
//!
//! The ledger never charges a card. `check_auto_topup` is a read-only
//! decision the payment worker acts on; the worker reports a successful
//! charge back through `record_auto_topup`, keyed by the processor's
//! payment id so retried webhooks replay instead of double-crediting.

use chrono::{Months, Utc};
use kredo_core::topup::{self, TopupConfig, TopupDecision};
use kredo_core::{BalanceUpdateOutcome, TransactionType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QuerySelect, Set, TransactionTrait,
};
use serde_json::json;
use uuid::Uuid;

use crate::entities::auto_topup_configs;
use crate::repositories::ledger::{ApplyOutcome, LedgerError, Mutation, apply, find_existing};
use crate::repositories::{account, events};

/// Input for creating or updating a tenant's auto-top-up configuration.
#[derive(Debug, Clone)]
pub struct TopupConfigInput {
    /// Whether the feature is enabled.
    pub enabled: bool,
    /// Trigger when the balance is at or below this.
    pub trigger_threshold: i64,
    /// Credits to buy per top-up.
    pub topup_amount: i64,
    /// Monthly cap on automatic top-ups.
    pub max_per_month: i32,
    /// Payment method token at the processor, if on file.
    pub payment_method_id: Option<String>,
}

/// Repository for auto-top-up state.
#[derive(Clone)]
pub struct TopupRepository {
    db: DatabaseConnection,
}

impl TopupRepository {
    /// Creates a top-up repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Fetches a tenant's auto-top-up configuration.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub async fn get_config(
        &self,
        tenant_id: Uuid,
    ) -> Result<Option<auto_topup_configs::Model>, DbErr> {
        auto_topup_configs::Entity::find_by_id(tenant_id)
            .one(&self.db)
            .await
    }

    /// Creates or replaces a tenant's auto-top-up configuration.
    ///
    /// The monthly counter and its reset time are preserved on update so a
    /// config change cannot reset the cap mid-month.
    ///
    /// # Errors
    ///
    /// Returns `TenantNotFound` for unknown tenants or a database error.
    pub async fn upsert_config(
        &self,
        tenant_id: Uuid,
        input: TopupConfigInput,
    ) -> Result<auto_topup_configs::Model, LedgerError> {
        let txn = self.db.begin().await?;

        if !account::tenant_exists(&txn, tenant_id).await? {
            txn.rollback().await?;
            return Err(LedgerError::TenantNotFound(tenant_id));
        }

        let now = Utc::now();
        let existing = auto_topup_configs::Entity::find_by_id(tenant_id)
            .lock_exclusive()
            .one(&txn)
            .await?;

        let saved = if let Some(existing) = existing {
            let mut active: auto_topup_configs::ActiveModel = existing.into();
            active.enabled = Set(input.enabled);
            active.trigger_threshold = Set(input.trigger_threshold);
            active.topup_amount = Set(input.topup_amount);
            active.max_per_month = Set(input.max_per_month);
            active.payment_method_id = Set(input.payment_method_id);
            active.updated_at = Set(now.into());
            active.update(&txn).await?
        } else {
            auto_topup_configs::ActiveModel {
                tenant_id: Set(tenant_id),
                enabled: Set(input.enabled),
                trigger_threshold: Set(input.trigger_threshold),
                topup_amount: Set(input.topup_amount),
                max_per_month: Set(input.max_per_month),
                topups_this_month: Set(0),
                payment_method_id: Set(input.payment_method_id),
                counters_reset_at: Set(next_month(now)),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
            }
            .insert(&txn)
            .await?
        };

        txn.commit().await?;
        Ok(saved)
    }

    /// Decides whether an auto-top-up should be triggered for a tenant.
    ///
    /// Read-only: the decision is computed from the current config and
    /// balance without locks. The worker that acts on `Trigger` records the
    /// result through `record_auto_topup`, which is the idempotent step.
    ///
    /// # Errors
    ///
    /// Returns `TenantNotFound` for unknown tenants or a database error.
    pub async fn check_auto_topup(&self, tenant_id: Uuid) -> Result<TopupDecision, LedgerError> {
        if !account::tenant_exists(&self.db, tenant_id).await? {
            return Err(LedgerError::TenantNotFound(tenant_id));
        }

        let config = self.get_config(tenant_id).await?.map(snapshot);
        let balance = crate::entities::tenant_credit_accounts::Entity::find_by_id(tenant_id)
            .one(&self.db)
            .await?
            .map_or(0, |account| account.balance);

        Ok(topup::check(config.as_ref(), balance))
    }

    /// Records a completed auto-top-up purchase.
    ///
    /// `external_payment_id` is the idempotency key: a replayed webhook for
    /// the same payment returns `Duplicate` and credits nothing.
    ///
    /// # Errors
    ///
    /// Returns `TenantNotFound` for unknown tenants or a database error.
    pub async fn record_auto_topup(
        &self,
        tenant_id: Uuid,
        external_payment_id: &str,
        amount: i64,
    ) -> Result<BalanceUpdateOutcome, LedgerError> {
        if amount <= 0 {
            return Ok(BalanceUpdateOutcome::InvalidAmount { amount });
        }

        let txn = self.db.begin().await?;

        if !account::tenant_exists(&txn, tenant_id).await? {
            txn.rollback().await?;
            return Err(LedgerError::TenantNotFound(tenant_id));
        }

        let account = account::lock_or_create(&txn, tenant_id).await?;

        if let Some(existing) = find_existing(
            &txn,
            tenant_id,
            external_payment_id,
            TransactionType::Purchase,
        )
        .await?
        {
            txn.commit().await?;
            return Ok(BalanceUpdateOutcome::Duplicate {
                transaction_id: existing.id,
                new_balance: existing.balance_after,
            });
        }

        let ApplyOutcome::Applied { applied, .. } = apply(
            &txn,
            account,
            Mutation {
                reference_id: Some(external_payment_id.to_string()),
                reference_type: Some("auto_topup".to_string()),
                description: Some("Automatic credit top-up".to_string()),
                metadata: Some(json!({ "external_payment_id": external_payment_id })),
                ..Mutation::new(TransactionType::Purchase, amount)
            },
        )
        .await?
        else {
            // Purchases are credits and never reject.
            txn.rollback().await?;
            return Err(LedgerError::Database(DbErr::Custom(
                "auto-top-up purchase rejected".to_string(),
            )));
        };

        // Count the top-up against the monthly cap.
        if let Some(config) = auto_topup_configs::Entity::find_by_id(tenant_id)
            .lock_exclusive()
            .one(&txn)
            .await?
        {
            let topups = config.topups_this_month;
            let mut active: auto_topup_configs::ActiveModel = config.into();
            active.topups_this_month = Set(topups + 1);
            active.updated_at = Set(Utc::now().into());
            active.update(&txn).await?;
        }

        events::record(
            &txn,
            tenant_id,
            "auto_topup_recorded",
            json!({
                "external_payment_id": external_payment_id,
                "amount": amount,
                "new_balance": applied.new_balance,
            }),
        )
        .await?;

        txn.commit().await?;
        tracing::info!(%tenant_id, amount, "auto top-up recorded");
        Ok(BalanceUpdateOutcome::Applied(applied))
    }

    /// Resets monthly top-up counters whose reset time has passed.
    ///
    /// Driven entirely by the stored `counters_reset_at`, so running the
    /// scheduler twice in a row is a no-op the second time.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub async fn reset_monthly_counters(&self) -> Result<u64, DbErr> {
        let now = Utc::now();
        let due = auto_topup_configs::Entity::find()
            .filter(auto_topup_configs::Column::CountersResetAt.lte(now))
            .all(&self.db)
            .await?;

        let mut reset = 0u64;
        for config in due {
            let mut active: auto_topup_configs::ActiveModel = config.into();
            active.topups_this_month = Set(0);
            active.counters_reset_at = Set(next_month(now));
            active.updated_at = Set(now.into());
            active.update(&self.db).await?;
            reset += 1;
        }

        if reset > 0 {
            tracing::info!(reset, "monthly top-up counters reset");
        }
        Ok(reset)
    }
}

/// Maps a stored config row to the pure decision snapshot.
fn snapshot(model: auto_topup_configs::Model) -> TopupConfig {
    TopupConfig {
        enabled: model.enabled,
        trigger_threshold: model.trigger_threshold,
        topup_amount: model.topup_amount,
        max_per_month: model.max_per_month,
        topups_this_month: model.topups_this_month,
        has_payment_method: model.payment_method_id.is_some(),
    }
}

fn next_month(now: chrono::DateTime<Utc>) -> sea_orm::prelude::DateTimeWithTimeZone {
    now.checked_add_months(Months::new(1)).unwrap_or(now).into()
}
