//! The credit ledger: consumption, balance updates, and transfers.
//!
//! Every mutating operation follows the same shape: open a transaction,
//! verify the tenant, lock the account row, replay-check the idempotency
//! key, apply the canonical balance mutation, commit. The append-only
//! transaction log and the balance row are written in the same database
//! transaction, so `sum(amounts) == balance` holds at every commit point.

use chrono::Utc;
use kredo_core::ledger::policy::{self, WarningFlags, split_debit};
use kredo_core::ratelimit::{MinuteWindow, RateDecision};
use kredo_core::{
    AppliedMutation, BalanceUpdateOutcome, ConsumeOutcome, Direction, TransactionType,
    TransferOutcome,
};
use kredo_shared::config::LedgerConfig;
use kredo_shared::types::pagination::PageRequest;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::entities::{credit_transactions, tenant_credit_accounts};
use crate::repositories::{account, cost::CostResolver, events};

/// Errors from ledger operations.
///
/// Expected business outcomes (insufficient balance, duplicates, rate
/// limits) are not errors; they are variants of the outcome enums.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The tenant does not exist.
    #[error("Tenant not found: {0}")]
    TenantNotFound(Uuid),
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for `consume_credits`.
#[derive(Debug, Clone)]
pub struct ConsumeInput {
    /// The billable action key, e.g. `order.create`.
    pub action_key: String,
    /// Optional idempotency key (e.g. the order id).
    pub reference_id: Option<String>,
    /// What kind of object the reference points at.
    pub reference_type: Option<String>,
    /// Human-readable description for the ledger row.
    pub description: Option<String>,
}

/// Input for `update_credit_balance`.
#[derive(Debug, Clone)]
pub struct BalanceUpdateInput {
    /// Transaction type; determines the direction of the change.
    pub transaction_type: TransactionType,
    /// Strictly positive amount.
    pub amount: i64,
    /// Optional idempotency key.
    pub reference_id: Option<String>,
    /// What kind of object the reference points at.
    pub reference_type: Option<String>,
    /// Human-readable description for the ledger row.
    pub description: Option<String>,
    /// Free-form metadata stored on the ledger row.
    pub metadata: Option<serde_json::Value>,
}

/// Filters for listing ledger rows.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Only rows of this type.
    pub transaction_type: Option<TransactionType>,
    /// Only rows created at or after this time.
    pub from: Option<chrono::DateTime<Utc>>,
    /// Only rows created before this time.
    pub to: Option<chrono::DateTime<Utc>>,
}

/// The canonical balance mutation applied by every write path.
pub(crate) struct Mutation {
    pub(crate) transaction_type: TransactionType,
    pub(crate) amount: i64,
    pub(crate) reference_id: Option<String>,
    pub(crate) reference_type: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) metadata: Option<serde_json::Value>,
    /// Rate-limit window to persist alongside the mutation (consume path).
    pub(crate) window: Option<MinuteWindow>,
    /// Whether to update low-balance warning flags (consume path).
    pub(crate) track_warnings: bool,
}

impl Mutation {
    pub(crate) fn new(transaction_type: TransactionType, amount: i64) -> Self {
        Self {
            transaction_type,
            amount,
            reference_id: None,
            reference_type: None,
            description: None,
            metadata: None,
            window: None,
            track_warnings: false,
        }
    }
}

/// Result of applying a mutation to a locked account.
pub(crate) enum ApplyOutcome {
    /// The mutation was written.
    Applied {
        /// The account row after the mutation.
        account: tenant_credit_accounts::Model,
        /// Ledger row details.
        applied: AppliedMutation,
        /// Warning thresholds newly crossed.
        crossed: Vec<i64>,
    },
    /// Debit rejected for insufficient balance. Nothing was written.
    Insufficient {
        /// The balance at rejection time.
        current_balance: i64,
    },
}

/// Applies one balance mutation to an already-locked account row: writes
/// the ledger row and updates the balance, sub-balances, lifetime counters,
/// and (for consumption) the warning flags and rate-limit window.
///
/// `mutation.amount` must be strictly positive; callers validate first.
pub(crate) async fn apply<C: ConnectionTrait>(
    conn: &C,
    account: tenant_credit_accounts::Model,
    mutation: Mutation,
) -> Result<ApplyOutcome, DbErr> {
    let balance_before = account.balance;

    if matches!(mutation.transaction_type.direction(), Direction::Debit)
        && balance_before < mutation.amount
    {
        return Ok(ApplyOutcome::Insufficient {
            current_balance: balance_before,
        });
    }

    let signed = mutation.transaction_type.signed_amount(mutation.amount);
    let new_balance = balance_before + signed;

    // Sub-balances: free credits are spent first on any debit, grants land
    // on the free side, every other credit lands on the purchased side.
    let mut free = account.free_credits_balance;
    let mut purchased = account.purchased_credits_balance;
    match mutation.transaction_type.direction() {
        Direction::Debit => {
            let (from_free, from_purchased) = split_debit(free, mutation.amount);
            free -= from_free;
            purchased -= from_purchased;
        }
        Direction::Credit => {
            if mutation.transaction_type == TransactionType::FreeGrant {
                free += mutation.amount;
            } else {
                purchased += mutation.amount;
            }
        }
    }

    let mut lifetime_earned = account.lifetime_earned;
    let mut lifetime_spent = account.lifetime_spent;
    match mutation.transaction_type.direction() {
        Direction::Credit => lifetime_earned += mutation.amount,
        Direction::Debit => lifetime_spent += mutation.amount,
    }

    let flags = WarningFlags {
        warning_100_sent: account.warning_100_sent,
        warning_50_sent: account.warning_50_sent,
        warning_20_sent: account.warning_20_sent,
        warning_0_sent: account.warning_0_sent,
    };
    let (flags, crossed) = if mutation.track_warnings {
        flags.observe(new_balance)
    } else {
        (flags, Vec::new())
    };

    let transaction_id = Uuid::new_v4();
    credit_transactions::ActiveModel {
        id: Set(transaction_id),
        tenant_id: Set(account.tenant_id),
        amount: Set(signed),
        balance_after: Set(new_balance),
        transaction_type: Set(mutation.transaction_type.into()),
        reference_id: Set(mutation.reference_id),
        reference_type: Set(mutation.reference_type),
        description: Set(mutation.description),
        metadata: Set(mutation.metadata),
        created_at: Set(Utc::now().into()),
    }
    .insert(conn)
    .await?;

    let is_usage = mutation.transaction_type == TransactionType::Usage;
    let credits_used_today = if is_usage {
        account.credits_used_today + mutation.amount
    } else {
        account.credits_used_today
    };

    let mut active: tenant_credit_accounts::ActiveModel = account.into();
    active.balance = Set(new_balance);
    active.free_credits_balance = Set(free);
    active.purchased_credits_balance = Set(purchased);
    active.lifetime_earned = Set(lifetime_earned);
    active.lifetime_spent = Set(lifetime_spent);
    active.credits_used_today = Set(credits_used_today);
    active.warning_100_sent = Set(flags.warning_100_sent);
    active.warning_50_sent = Set(flags.warning_50_sent);
    active.warning_20_sent = Set(flags.warning_20_sent);
    active.warning_0_sent = Set(flags.warning_0_sent);
    if let Some(window) = mutation.window {
        active.actions_this_minute = Set(window.actions_this_minute);
        active.last_action_at = Set(window.last_action_at.map(Into::into));
    }
    let account = account::save_account(conn, active).await?;

    Ok(ApplyOutcome::Applied {
        account,
        applied: AppliedMutation {
            balance_before,
            new_balance,
            transaction_id,
        },
        crossed,
    })
}

/// Finds a prior ledger row with the same (tenant, reference, type), the
/// replay target for idempotent retries.
pub(crate) async fn find_existing<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    reference_id: &str,
    transaction_type: TransactionType,
) -> Result<Option<credit_transactions::Model>, DbErr> {
    credit_transactions::Entity::find()
        .filter(credit_transactions::Column::TenantId.eq(tenant_id))
        .filter(credit_transactions::Column::ReferenceId.eq(reference_id))
        .filter(
            credit_transactions::Column::TransactionType
                .eq(crate::entities::sea_orm_active_enums::CreditTransactionType::from(
                    transaction_type,
                )),
        )
        .one(conn)
        .await
}

/// Repository for credit ledger operations.
#[derive(Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
    costs: CostResolver,
    rate_limit_per_minute: i32,
}

impl LedgerRepository {
    /// Creates a ledger repository from the application ledger config.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: &LedgerConfig) -> Self {
        let costs = CostResolver::new(
            db.clone(),
            config.default_action_cost,
            config.cost_cache_ttl_secs,
        );
        Self {
            db,
            costs,
            rate_limit_per_minute: config.rate_limit_per_minute,
        }
    }

    /// The cost resolver, shared with API handlers that need price lookups.
    #[must_use]
    pub const fn costs(&self) -> &CostResolver {
        &self.costs
    }

    /// Consumes credits for a billable action.
    ///
    /// Allowlisted and zero-cost actions return `FreeAction` without
    /// touching the database. Otherwise the tenant's account is locked,
    /// the rate limit and idempotency key are checked, and a `usage`
    /// transaction is applied.
    ///
    /// # Errors
    ///
    /// Returns `TenantNotFound` for unknown tenants or a database error.
    pub async fn consume_credits(
        &self,
        tenant_id: Uuid,
        input: ConsumeInput,
    ) -> Result<ConsumeOutcome, LedgerError> {
        if policy::is_free_action(&input.action_key) {
            return Ok(ConsumeOutcome::FreeAction {
                action_key: input.action_key,
            });
        }

        // Resolved before the lock; a zero-priced action never writes.
        let cost = self.costs.resolve(&input.action_key).await?;
        if cost == 0 {
            return Ok(ConsumeOutcome::FreeAction {
                action_key: input.action_key,
            });
        }

        let txn = self.db.begin().await?;

        if !account::tenant_exists(&txn, tenant_id).await? {
            txn.rollback().await?;
            return Err(LedgerError::TenantNotFound(tenant_id));
        }

        let account = account::lock_or_create(&txn, tenant_id).await?;

        let window = MinuteWindow {
            actions_this_minute: account.actions_this_minute,
            last_action_at: account.last_action_at.map(|t| t.to_utc()),
        };
        let window = match window.observe(Utc::now(), self.rate_limit_per_minute) {
            RateDecision::Allowed(window) => window,
            RateDecision::Limited { retry_after_secs } => {
                tracing::warn!(%tenant_id, action = %input.action_key, "rate limited");
                events::record(
                    &txn,
                    tenant_id,
                    "rate_limited",
                    json!({
                        "action": input.action_key,
                        "retry_after_secs": retry_after_secs,
                    }),
                )
                .await?;
                txn.commit().await?;
                return Ok(ConsumeOutcome::RateLimited { retry_after_secs });
            }
        };

        if let Some(ref reference_id) = input.reference_id {
            if let Some(existing) =
                find_existing(&txn, tenant_id, reference_id, TransactionType::Usage).await?
            {
                txn.commit().await?;
                return Ok(ConsumeOutcome::Duplicate {
                    transaction_id: existing.id,
                    new_balance: existing.balance_after,
                    cost: existing.amount.abs(),
                });
            }
        }

        let description = input
            .description
            .unwrap_or_else(|| format!("Action: {}", input.action_key));

        let outcome = apply(
            &txn,
            account.clone(),
            Mutation {
                reference_id: input.reference_id,
                reference_type: input.reference_type,
                description: Some(description),
                metadata: Some(json!({ "action": input.action_key })),
                window: Some(window),
                track_warnings: true,
                ..Mutation::new(TransactionType::Usage, cost)
            },
        )
        .await?;

        match outcome {
            ApplyOutcome::Applied {
                applied, crossed, ..
            } => {
                events::record(
                    &txn,
                    tenant_id,
                    "credits_consumed",
                    json!({
                        "action": input.action_key,
                        "cost": cost,
                        "new_balance": applied.new_balance,
                    }),
                )
                .await?;
                for threshold in &crossed {
                    events::record(
                        &txn,
                        tenant_id,
                        "low_balance_warning",
                        json!({ "threshold": threshold, "balance": applied.new_balance }),
                    )
                    .await?;
                }
                txn.commit().await?;
                tracing::debug!(
                    %tenant_id,
                    action = %input.action_key,
                    cost,
                    new_balance = applied.new_balance,
                    "credits consumed"
                );
                Ok(ConsumeOutcome::Consumed { cost, applied })
            }
            ApplyOutcome::Insufficient { current_balance } => {
                // A rejected attempt still counts against the rate limit, and
                // the rejection itself is recorded for analytics.
                events::record(
                    &txn,
                    tenant_id,
                    "insufficient_credits",
                    json!({
                        "action": input.action_key,
                        "required": cost,
                        "available": current_balance,
                        "shortfall": cost - current_balance,
                    }),
                )
                .await?;
                let mut active: tenant_credit_accounts::ActiveModel = account.into();
                active.actions_this_minute = Set(window.actions_this_minute);
                active.last_action_at = Set(window.last_action_at.map(Into::into));
                account::save_account(&txn, active).await?;
                txn.commit().await?;
                Ok(ConsumeOutcome::InsufficientCredits {
                    required: cost,
                    available: current_balance,
                })
            }
        }
    }

    /// Applies a typed balance mutation (purchase, refund, bonus, ...).
    ///
    /// The direction comes from the transaction type; `amount` must be
    /// strictly positive or the call returns `InvalidAmount`.
    ///
    /// # Errors
    ///
    /// Returns `TenantNotFound` for unknown tenants or a database error.
    pub async fn update_credit_balance(
        &self,
        tenant_id: Uuid,
        input: BalanceUpdateInput,
    ) -> Result<BalanceUpdateOutcome, LedgerError> {
        if input.amount <= 0 {
            return Ok(BalanceUpdateOutcome::InvalidAmount {
                amount: input.amount,
            });
        }

        let txn = self.db.begin().await?;

        if !account::tenant_exists(&txn, tenant_id).await? {
            txn.rollback().await?;
            return Err(LedgerError::TenantNotFound(tenant_id));
        }

        let account = account::lock_or_create(&txn, tenant_id).await?;

        if let Some(ref reference_id) = input.reference_id {
            if let Some(existing) =
                find_existing(&txn, tenant_id, reference_id, input.transaction_type).await?
            {
                txn.commit().await?;
                return Ok(BalanceUpdateOutcome::Duplicate {
                    transaction_id: existing.id,
                    new_balance: existing.balance_after,
                });
            }
        }

        let outcome = apply(
            &txn,
            account,
            Mutation {
                reference_id: input.reference_id,
                reference_type: input.reference_type,
                description: input.description,
                metadata: input.metadata,
                ..Mutation::new(input.transaction_type, input.amount)
            },
        )
        .await?;

        match outcome {
            ApplyOutcome::Applied { applied, .. } => {
                txn.commit().await?;
                tracing::debug!(
                    %tenant_id,
                    transaction_type = input.transaction_type.as_str(),
                    amount = input.amount,
                    new_balance = applied.new_balance,
                    "balance updated"
                );
                Ok(BalanceUpdateOutcome::Applied(applied))
            }
            ApplyOutcome::Insufficient { current_balance } => {
                txn.rollback().await?;
                Ok(BalanceUpdateOutcome::InsufficientCredits {
                    current_balance,
                    required: input.amount,
                })
            }
        }
    }

    /// Transfers credits between two tenants atomically.
    ///
    /// Account rows are locked in ascending tenant-id order so two opposing
    /// transfers can never deadlock.
    ///
    /// # Errors
    ///
    /// Returns `TenantNotFound` if either tenant is unknown, or a database
    /// error.
    pub async fn transfer_credits(
        &self,
        from_tenant_id: Uuid,
        to_tenant_id: Uuid,
        amount: i64,
        reference_id: Option<String>,
        description: Option<String>,
    ) -> Result<TransferOutcome, LedgerError> {
        if amount <= 0 {
            return Ok(TransferOutcome::Invalid {
                reason: "invalid_amount",
            });
        }
        if from_tenant_id == to_tenant_id {
            return Ok(TransferOutcome::Invalid {
                reason: "same_tenant",
            });
        }

        let txn = self.db.begin().await?;

        for tenant_id in [from_tenant_id, to_tenant_id] {
            if !account::tenant_exists(&txn, tenant_id).await? {
                txn.rollback().await?;
                return Err(LedgerError::TenantNotFound(tenant_id));
            }
        }

        let (first, second) = if from_tenant_id < to_tenant_id {
            (from_tenant_id, to_tenant_id)
        } else {
            (to_tenant_id, from_tenant_id)
        };
        let first_account = account::lock_or_create(&txn, first).await?;
        let second_account = account::lock_or_create(&txn, second).await?;
        let (sender, recipient) = if from_tenant_id < to_tenant_id {
            (first_account, second_account)
        } else {
            (second_account, first_account)
        };

        if let Some(ref reference) = reference_id {
            if let Some(existing) =
                find_existing(&txn, from_tenant_id, reference, TransactionType::TransferOut)
                    .await?
            {
                txn.commit().await?;
                return Ok(TransferOutcome::Duplicate {
                    transaction_id: existing.id,
                });
            }
        }

        let debit_outcome = apply(
            &txn,
            sender,
            Mutation {
                reference_id: reference_id.clone(),
                description: description.clone(),
                metadata: Some(json!({ "counterparty": to_tenant_id })),
                ..Mutation::new(TransactionType::TransferOut, amount)
            },
        )
        .await?;

        let debit = match debit_outcome {
            ApplyOutcome::Applied { applied, .. } => applied,
            ApplyOutcome::Insufficient { current_balance } => {
                txn.rollback().await?;
                return Ok(TransferOutcome::InsufficientCredits {
                    current_balance,
                    required: amount,
                });
            }
        };

        let ApplyOutcome::Applied {
            applied: credit, ..
        } = apply(
            &txn,
            recipient,
            Mutation {
                reference_id,
                description,
                metadata: Some(json!({ "counterparty": from_tenant_id })),
                ..Mutation::new(TransactionType::TransferIn, amount)
            },
        )
        .await?
        else {
            // Credits never reject; reaching this means a direction bug.
            txn.rollback().await?;
            return Err(LedgerError::Database(DbErr::Custom(
                "transfer credit leg rejected".to_string(),
            )));
        };

        txn.commit().await?;
        tracing::info!(%from_tenant_id, %to_tenant_id, amount, "credits transferred");
        Ok(TransferOutcome::Applied { debit, credit })
    }

    /// Lists a tenant's ledger rows, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub async fn list_transactions(
        &self,
        tenant_id: Uuid,
        filter: &TransactionFilter,
        page: &PageRequest,
    ) -> Result<(Vec<credit_transactions::Model>, u64), DbErr> {
        let mut query = credit_transactions::Entity::find()
            .filter(credit_transactions::Column::TenantId.eq(tenant_id));

        if let Some(transaction_type) = filter.transaction_type {
            query = query.filter(credit_transactions::Column::TransactionType.eq(
                crate::entities::sea_orm_active_enums::CreditTransactionType::from(
                    transaction_type,
                ),
            ));
        }
        if let Some(from) = filter.from {
            query = query.filter(credit_transactions::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(credit_transactions::Column::CreatedAt.lt(to));
        }

        let total = query.clone().count(&self.db).await?;
        let rows = query
            .order_by_desc(credit_transactions::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok((rows, total))
    }

    /// Recomputes a tenant's balance from the ledger from zero.
    ///
    /// Used by reconciliation checks; must always equal the stored balance.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub async fn replay_balance(&self, tenant_id: Uuid) -> Result<i64, DbErr> {
        let rows = credit_transactions::Entity::find()
            .filter(credit_transactions::Column::TenantId.eq(tenant_id))
            .all(&self.db)
            .await?;
        Ok(kredo_core::ledger::types::replay_balance(
            rows.into_iter().map(|row| row.amount),
        ))
    }
}
