//! Promo and referral code redemption.
//!
//! The code row is locked before validation so concurrent redemptions of
//! the same code serialize and the usage cap cannot be oversubscribed. The
//! unique (code, tenant) constraint on the redemption tables remains the
//! final backstop against double redemption.

use chrono::Utc;
use kredo_core::redemption::{CodeRejection, CodeSnapshot, validate_code, validate_referral};
use kredo_core::{RedemptionOutcome, TransactionType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QuerySelect, Set, TransactionTrait,
};
use serde_json::json;
use uuid::Uuid;

use crate::entities::{promo_codes, promo_redemptions, referral_codes, referral_redemptions};
use crate::repositories::ledger::{ApplyOutcome, LedgerError, Mutation, apply};
use crate::repositories::{account, events};

/// Repository for promo and referral redemptions.
#[derive(Clone)]
pub struct RedemptionRepository {
    db: DatabaseConnection,
}

impl RedemptionRepository {
    /// Creates a redemption repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Redeems a promo code for a tenant.
    ///
    /// # Errors
    ///
    /// Returns `TenantNotFound` for unknown tenants or a database error.
    pub async fn redeem_promo(
        &self,
        tenant_id: Uuid,
        code: &str,
    ) -> Result<RedemptionOutcome, LedgerError> {
        let txn = self.db.begin().await?;

        if !account::tenant_exists(&txn, tenant_id).await? {
            txn.rollback().await?;
            return Err(LedgerError::TenantNotFound(tenant_id));
        }

        let Some(promo) = promo_codes::Entity::find()
            .filter(promo_codes::Column::Code.eq(code))
            .lock_exclusive()
            .one(&txn)
            .await?
        else {
            txn.rollback().await?;
            return Ok(RedemptionOutcome::Rejected(CodeRejection::NotFound));
        };

        let already = promo_redemptions::Entity::find()
            .filter(promo_redemptions::Column::PromoCodeId.eq(promo.id))
            .filter(promo_redemptions::Column::TenantId.eq(tenant_id))
            .one(&txn)
            .await?;
        if already.is_some() {
            txn.rollback().await?;
            return Ok(RedemptionOutcome::AlreadyRedeemed);
        }

        if let Err(rejection) = validate_code(&snapshot_promo(&promo), Utc::now()) {
            txn.rollback().await?;
            return Ok(RedemptionOutcome::Rejected(rejection));
        }

        let account = account::lock_or_create(&txn, tenant_id).await?;

        promo_redemptions::ActiveModel {
            id: Set(Uuid::new_v4()),
            promo_code_id: Set(promo.id),
            tenant_id: Set(tenant_id),
            created_at: Set(Utc::now().into()),
        }
        .insert(&txn)
        .await?;

        let uses = promo.uses_count;
        let credits = promo.credits;
        let promo_id = promo.id;
        let mut active: promo_codes::ActiveModel = promo.into();
        active.uses_count = Set(uses + 1);
        active.update(&txn).await?;

        let new_balance = credit_tenant(
            &txn,
            account,
            TransactionType::Promo,
            credits,
            format!("promo:{promo_id}"),
            "promo_code",
            format!("Promo code redeemed: {code}"),
        )
        .await?;

        events::record(
            &txn,
            tenant_id,
            "promo_redeemed",
            json!({ "code": code, "credits": credits, "new_balance": new_balance }),
        )
        .await?;

        txn.commit().await?;
        tracing::info!(%tenant_id, code, credits, "promo code redeemed");
        Ok(RedemptionOutcome::Applied {
            credits_granted: credits,
            referrer_credits: 0,
            new_balance,
        })
    }

    /// Redeems a referral code: the redeeming tenant receives the referee
    /// bonus and the code owner receives the referrer bonus, atomically.
    ///
    /// # Errors
    ///
    /// Returns `TenantNotFound` for unknown tenants or a database error.
    pub async fn redeem_referral(
        &self,
        tenant_id: Uuid,
        code: &str,
    ) -> Result<RedemptionOutcome, LedgerError> {
        let txn = self.db.begin().await?;

        if !account::tenant_exists(&txn, tenant_id).await? {
            txn.rollback().await?;
            return Err(LedgerError::TenantNotFound(tenant_id));
        }

        let Some(referral) = referral_codes::Entity::find()
            .filter(referral_codes::Column::Code.eq(code))
            .lock_exclusive()
            .one(&txn)
            .await?
        else {
            txn.rollback().await?;
            return Ok(RedemptionOutcome::Rejected(CodeRejection::NotFound));
        };

        let already = referral_redemptions::Entity::find()
            .filter(referral_redemptions::Column::ReferralCodeId.eq(referral.id))
            .filter(referral_redemptions::Column::RefereeTenantId.eq(tenant_id))
            .one(&txn)
            .await?;
        if already.is_some() {
            txn.rollback().await?;
            return Ok(RedemptionOutcome::AlreadyRedeemed);
        }

        if let Err(rejection) = validate_referral(
            &snapshot_referral(&referral),
            referral.tenant_id,
            tenant_id,
            Utc::now(),
        ) {
            txn.rollback().await?;
            return Ok(RedemptionOutcome::Rejected(rejection));
        }

        let referrer_id = referral.tenant_id;

        // Both accounts change; lock in ascending id order like transfers.
        let (first, second) = if tenant_id < referrer_id {
            (tenant_id, referrer_id)
        } else {
            (referrer_id, tenant_id)
        };
        let first_account = account::lock_or_create(&txn, first).await?;
        let second_account = account::lock_or_create(&txn, second).await?;
        let (referee_account, referrer_account) = if tenant_id < referrer_id {
            (first_account, second_account)
        } else {
            (second_account, first_account)
        };

        referral_redemptions::ActiveModel {
            id: Set(Uuid::new_v4()),
            referral_code_id: Set(referral.id),
            referee_tenant_id: Set(tenant_id),
            created_at: Set(Utc::now().into()),
        }
        .insert(&txn)
        .await?;

        let uses = referral.uses_count;
        let referee_bonus = referral.referee_bonus;
        let referrer_bonus = referral.referrer_bonus;
        let referral_id = referral.id;
        let mut active: referral_codes::ActiveModel = referral.into();
        active.uses_count = Set(uses + 1);
        active.update(&txn).await?;

        let new_balance = if referee_bonus > 0 {
            credit_tenant(
                &txn,
                referee_account,
                TransactionType::Bonus,
                referee_bonus,
                format!("referral:{referral_id}"),
                "referral_code",
                format!("Referral bonus for joining via: {code}"),
            )
            .await?
        } else {
            referee_account.balance
        };

        if referrer_bonus > 0 {
            credit_tenant(
                &txn,
                referrer_account,
                TransactionType::Bonus,
                referrer_bonus,
                format!("referral:{referral_id}:{tenant_id}"),
                "referral_code",
                format!("Referral bonus for referring tenant {tenant_id}"),
            )
            .await?;
        }

        events::record(
            &txn,
            tenant_id,
            "referral_redeemed",
            json!({
                "code": code,
                "referee_bonus": referee_bonus,
                "referrer_bonus": referrer_bonus,
                "referrer_tenant_id": referrer_id,
            }),
        )
        .await?;

        txn.commit().await?;
        tracing::info!(%tenant_id, %referrer_id, code, "referral code redeemed");
        Ok(RedemptionOutcome::Applied {
            credits_granted: referee_bonus,
            referrer_credits: referrer_bonus,
            new_balance,
        })
    }
}

/// Applies one credit-direction mutation and returns the new balance.
async fn credit_tenant(
    txn: &DatabaseTransaction,
    account: crate::entities::tenant_credit_accounts::Model,
    transaction_type: TransactionType,
    amount: i64,
    reference_id: String,
    reference_type: &str,
    description: String,
) -> Result<i64, DbErr> {
    let ApplyOutcome::Applied { applied, .. } = apply(
        txn,
        account,
        Mutation {
            reference_id: Some(reference_id),
            reference_type: Some(reference_type.to_string()),
            description: Some(description),
            ..Mutation::new(transaction_type, amount)
        },
    )
    .await?
    else {
        // Credits never reject.
        return Err(DbErr::Custom("redemption credit rejected".to_string()));
    };
    Ok(applied.new_balance)
}

fn snapshot_promo(promo: &promo_codes::Model) -> CodeSnapshot {
    CodeSnapshot {
        is_active: promo.is_active,
        expires_at: promo.expires_at.map(|t| t.to_utc()),
        max_uses: promo.max_uses,
        uses_count: promo.uses_count,
    }
}

fn snapshot_referral(referral: &referral_codes::Model) -> CodeSnapshot {
    CodeSnapshot {
        is_active: referral.is_active,
        expires_at: referral.expires_at.map(|t| t.to_utc()),
        max_uses: referral.max_uses,
        uses_count: referral.uses_count,
    }
}
