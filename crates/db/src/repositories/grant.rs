//! Recurring free-credit grants.
//!
//! Free-tier tenants receive a monthly grant of expiring credits. The due
//! check is re-run under the account lock, so the sweep can run on several
//! schedulers at once without double-granting.

use chrono::{DateTime, Utc};
use kredo_core::TransactionType;
use kredo_core::grant::{is_grant_due, next_grant_at};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QuerySelect, Set, TransactionTrait,
};
use serde_json::json;
use uuid::Uuid;

use crate::entities::{tenant_credit_accounts, tenants};
use crate::repositories::ledger::{ApplyOutcome, LedgerError, Mutation, apply};
use crate::repositories::{account, events};

/// Result of a free-grant attempt for one tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantResult {
    /// The grant was applied.
    Granted {
        /// Leftover free credits expired before the grant.
        expired: i64,
        /// Credits granted.
        granted: i64,
        /// Balance after expiration and grant.
        new_balance: i64,
        /// When the next grant becomes due.
        next_grant_at: DateTime<Utc>,
    },
    /// The tenant's next grant is still in the future; nothing changed.
    NotDue {
        /// The scheduled time, if any.
        next_grant_at: Option<DateTime<Utc>>,
    },
}

/// Summary of one sweep run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Tenants granted in this run.
    pub granted: u64,
    /// Candidates that turned out not to be due under the lock.
    pub skipped: u64,
}

/// Repository for the free-grant cycle.
#[derive(Clone)]
pub struct GrantRepository {
    db: DatabaseConnection,
    free_grant_amount: i64,
}

impl GrantRepository {
    /// Creates a grant repository granting `free_grant_amount` per cycle.
    #[must_use]
    pub const fn new(db: DatabaseConnection, free_grant_amount: i64) -> Self {
        Self {
            db,
            free_grant_amount,
        }
    }

    /// Grants free credits to one tenant if its grant is due.
    ///
    /// Remaining free credits from the previous cycle are expired first
    /// with their own ledger row, then the new grant is applied, the
    /// warning flags are cleared, and the next due time is scheduled one
    /// month out.
    ///
    /// # Errors
    ///
    /// Returns `TenantNotFound` for unknown tenants or a database error.
    pub async fn grant_free_credits(&self, tenant_id: Uuid) -> Result<GrantResult, LedgerError> {
        let txn = self.db.begin().await?;

        if !account::tenant_exists(&txn, tenant_id).await? {
            txn.rollback().await?;
            return Err(LedgerError::TenantNotFound(tenant_id));
        }

        let account = account::lock_or_create(&txn, tenant_id).await?;
        let result = grant_locked(&txn, account, self.free_grant_amount, Utc::now()).await?;
        txn.commit().await?;
        Ok(result)
    }

    /// Grants free credits to every free-tier tenant whose grant is due.
    ///
    /// Candidates are selected without locks, then each grant re-checks the
    /// due time under its own lock and transaction, so a crashed sweep
    /// leaves prior grants committed and re-running is safe.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub async fn sweep_due_grants(&self) -> Result<SweepSummary, DbErr> {
        let now = Utc::now();
        let candidates: Vec<Uuid> = tenant_credit_accounts::Entity::find()
            .select_only()
            .column(tenant_credit_accounts::Column::TenantId)
            .inner_join(tenants::Entity)
            .filter(tenants::Column::IsFreeTier.eq(true))
            .filter(
                Condition::any()
                    .add(tenant_credit_accounts::Column::NextFreeGrantAt.is_null())
                    .add(tenant_credit_accounts::Column::NextFreeGrantAt.lte(now)),
            )
            .into_tuple()
            .all(&self.db)
            .await?;

        let mut summary = SweepSummary::default();
        for tenant_id in candidates {
            let txn = self.db.begin().await?;
            let account = account::lock_or_create(&txn, tenant_id).await?;
            match grant_locked(&txn, account, self.free_grant_amount, Utc::now()).await? {
                GrantResult::Granted { .. } => summary.granted += 1,
                GrantResult::NotDue { .. } => summary.skipped += 1,
            }
            txn.commit().await?;
        }

        tracing::info!(
            granted = summary.granted,
            skipped = summary.skipped,
            "free-grant sweep complete"
        );
        Ok(summary)
    }
}

/// Expires leftover free credits and applies the grant to a locked account.
async fn grant_locked(
    txn: &DatabaseTransaction,
    account: tenant_credit_accounts::Model,
    amount: i64,
    now: DateTime<Utc>,
) -> Result<GrantResult, DbErr> {
    if !is_grant_due(account.next_free_grant_at.map(|t| t.to_utc()), now) {
        return Ok(GrantResult::NotDue {
            next_grant_at: account.next_free_grant_at.map(|t| t.to_utc()),
        });
    }

    let tenant_id = account.tenant_id;

    // Expire what is left of the previous grant so the replayed ledger
    // matches the stored balance exactly.
    let expired = account.free_credits_balance;
    let account = if expired > 0 {
        let ApplyOutcome::Applied { account, .. } = apply(
            txn,
            account,
            Mutation {
                description: Some("Free credits expired at grant cycle".to_string()),
                ..Mutation::new(TransactionType::Expiration, expired)
            },
        )
        .await?
        else {
            // Free balance never exceeds total balance.
            return Err(DbErr::Custom("expiration leg rejected".to_string()));
        };
        account
    } else {
        account
    };

    let ApplyOutcome::Applied {
        account, applied, ..
    } = apply(
        txn,
        account,
        Mutation {
            description: Some("Monthly free credit grant".to_string()),
            ..Mutation::new(TransactionType::FreeGrant, amount)
        },
    )
    .await?
    else {
        return Err(DbErr::Custom("grant leg rejected".to_string()));
    };

    let next_due = next_grant_at(now);

    // A fresh cycle re-arms the one-shot low-balance warnings and restarts
    // the daily usage counter.
    let mut active: tenant_credit_accounts::ActiveModel = account.into();
    active.credits_used_today = Set(0);
    active.warning_100_sent = Set(false);
    active.warning_50_sent = Set(false);
    active.warning_20_sent = Set(false);
    active.warning_0_sent = Set(false);
    active.next_free_grant_at = Set(Some(next_due.into()));
    active.last_free_grant_at = Set(Some(now.into()));
    account::save_account(txn, active).await?;

    events::record(
        txn,
        tenant_id,
        "free_credits_granted",
        json!({
            "expired": expired,
            "granted": amount,
            "new_balance": applied.new_balance,
        }),
    )
    .await?;

    Ok(GrantResult::Granted {
        expired,
        granted: amount,
        new_balance: applied.new_balance,
        next_grant_at: next_due,
    })
}
