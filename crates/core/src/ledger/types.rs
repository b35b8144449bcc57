//! Transaction taxonomy and direction rules.

use serde::{Deserialize, Serialize};

/// Kinds of credit transactions recorded in the ledger.
///
/// The direction of a balance change is encoded by the type, never by the
/// sign of the requested amount: callers always pass strictly positive
/// amounts and the ledger stores the signed amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Credits bought through the payment processor (includes auto top-ups).
    Purchase,
    /// Credits consumed by a billable action.
    Usage,
    /// Credits returned after a reversed charge.
    Refund,
    /// Free credits removed at the end of a grant cycle.
    Expiration,
    /// Goodwill or campaign credits.
    Bonus,
    /// Manual correction by an operator.
    Adjustment,
    /// Credits received from another tenant.
    TransferIn,
    /// Credits sent to another tenant.
    TransferOut,
    /// Recurring free-tier grant.
    FreeGrant,
    /// Credits granted by redeeming a promo code.
    Promo,
}

/// Direction of a balance change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Balance increases.
    Credit,
    /// Balance decreases; requires sufficient funds.
    Debit,
}

impl TransactionType {
    /// Returns the balance direction for this transaction type.
    ///
    /// `Adjustment` is credit-direction by definition; downward corrections
    /// are recorded as `Expiration` or `Usage` so every type has exactly one
    /// direction.
    #[must_use]
    pub const fn direction(self) -> Direction {
        match self {
            Self::Usage | Self::Expiration | Self::TransferOut => Direction::Debit,
            Self::Purchase
            | Self::Refund
            | Self::Bonus
            | Self::Adjustment
            | Self::TransferIn
            | Self::FreeGrant
            | Self::Promo => Direction::Credit,
        }
    }

    /// Converts a strictly positive requested amount into the signed amount
    /// stored in the ledger (negative for debits).
    #[must_use]
    pub const fn signed_amount(self, amount: i64) -> i64 {
        match self.direction() {
            Direction::Credit => amount,
            Direction::Debit => -amount,
        }
    }

    /// The snake_case wire name of this type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Usage => "usage",
            Self::Refund => "refund",
            Self::Expiration => "expiration",
            Self::Bonus => "bonus",
            Self::Adjustment => "adjustment",
            Self::TransferIn => "transfer_in",
            Self::TransferOut => "transfer_out",
            Self::FreeGrant => "free_grant",
            Self::Promo => "promo",
        }
    }

    /// Parses a wire name into a transaction type.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "purchase" => Some(Self::Purchase),
            "usage" => Some(Self::Usage),
            "refund" => Some(Self::Refund),
            "expiration" => Some(Self::Expiration),
            "bonus" => Some(Self::Bonus),
            "adjustment" => Some(Self::Adjustment),
            "transfer_in" => Some(Self::TransferIn),
            "transfer_out" => Some(Self::TransferOut),
            "free_grant" => Some(Self::FreeGrant),
            "promo" => Some(Self::Promo),
            _ => None,
        }
    }

    /// All transaction types, for iteration in tests and seeds.
    pub const ALL: [Self; 10] = [
        Self::Purchase,
        Self::Usage,
        Self::Refund,
        Self::Expiration,
        Self::Bonus,
        Self::Adjustment,
        Self::TransferIn,
        Self::TransferOut,
        Self::FreeGrant,
        Self::Promo,
    ];
}

/// Reconstructs a balance by replaying signed ledger amounts from zero.
///
/// Ledger consistency invariant: for any tenant this must equal the stored
/// balance after any sequence of operations.
#[must_use]
pub fn replay_balance<I: IntoIterator<Item = i64>>(amounts: I) -> i64 {
    amounts.into_iter().sum()
}
