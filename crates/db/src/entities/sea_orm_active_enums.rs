//! Database enum definitions.

use kredo_core::TransactionType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ledger transaction types as stored in Postgres.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(
    rs_type = "String",
    db_type = "Enum",
    enum_name = "credit_transaction_type"
)]
pub enum CreditTransactionType {
    /// Credits bought through the payment processor.
    #[sea_orm(string_value = "purchase")]
    Purchase,
    /// Credits consumed by a billable action.
    #[sea_orm(string_value = "usage")]
    Usage,
    /// Credits returned after a reversed charge.
    #[sea_orm(string_value = "refund")]
    Refund,
    /// Free credits removed at the end of a grant cycle.
    #[sea_orm(string_value = "expiration")]
    Expiration,
    /// Goodwill or campaign credits.
    #[sea_orm(string_value = "bonus")]
    Bonus,
    /// Manual correction by an operator.
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
    /// Credits received from another tenant.
    #[sea_orm(string_value = "transfer_in")]
    TransferIn,
    /// Credits sent to another tenant.
    #[sea_orm(string_value = "transfer_out")]
    TransferOut,
    /// Recurring free-tier grant.
    #[sea_orm(string_value = "free_grant")]
    FreeGrant,
    /// Credits granted by redeeming a promo code.
    #[sea_orm(string_value = "promo")]
    Promo,
}

impl From<TransactionType> for CreditTransactionType {
    fn from(t: TransactionType) -> Self {
        match t {
            TransactionType::Purchase => Self::Purchase,
            TransactionType::Usage => Self::Usage,
            TransactionType::Refund => Self::Refund,
            TransactionType::Expiration => Self::Expiration,
            TransactionType::Bonus => Self::Bonus,
            TransactionType::Adjustment => Self::Adjustment,
            TransactionType::TransferIn => Self::TransferIn,
            TransactionType::TransferOut => Self::TransferOut,
            TransactionType::FreeGrant => Self::FreeGrant,
            TransactionType::Promo => Self::Promo,
        }
    }
}

impl From<CreditTransactionType> for TransactionType {
    fn from(t: CreditTransactionType) -> Self {
        match t {
            CreditTransactionType::Purchase => Self::Purchase,
            CreditTransactionType::Usage => Self::Usage,
            CreditTransactionType::Refund => Self::Refund,
            CreditTransactionType::Expiration => Self::Expiration,
            CreditTransactionType::Bonus => Self::Bonus,
            CreditTransactionType::Adjustment => Self::Adjustment,
            CreditTransactionType::TransferIn => Self::TransferIn,
            CreditTransactionType::TransferOut => Self::TransferOut,
            CreditTransactionType::FreeGrant => Self::FreeGrant,
            CreditTransactionType::Promo => Self::Promo,
        }
    }
}
