//! Structured operation outcomes.
//!
//! Insufficient balance, rate limiting, and duplicate replays are expected,
//! frequent results - they are data, not errors. Callers branch on the
//! variant; only database faults and bad caller identity surface as `Err`.

use uuid::Uuid;

/// Result of a balance mutation that was actually applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedMutation {
    /// Balance before the mutation.
    pub balance_before: i64,
    /// Balance after the mutation.
    pub new_balance: i64,
    /// The ledger row recording the mutation.
    pub transaction_id: Uuid,
}

/// Outcome of `consume_credits`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// The action is on the free allowlist; nothing was locked or written.
    FreeAction {
        /// The allowlisted action key.
        action_key: String,
    },
    /// Credits were deducted.
    Consumed {
        /// Credits charged for the action.
        cost: i64,
        /// Applied mutation details.
        applied: AppliedMutation,
    },
    /// A prior call with the same reference already consumed; nothing changed.
    Duplicate {
        /// The original ledger row.
        transaction_id: Uuid,
        /// Balance recorded after the original call.
        new_balance: i64,
        /// Credits charged by the original call.
        cost: i64,
    },
    /// Balance is below the action cost; nothing changed.
    InsufficientCredits {
        /// Credits the action requires.
        required: i64,
        /// Credits currently available.
        available: i64,
    },
    /// The tenant exceeded the per-minute action cap; nothing changed.
    RateLimited {
        /// Seconds until the window resets.
        retry_after_secs: i64,
    },
}

impl ConsumeOutcome {
    /// Shortfall for an insufficient-credits outcome, zero otherwise.
    #[must_use]
    pub const fn shortfall(&self) -> i64 {
        match self {
            Self::InsufficientCredits {
                required,
                available,
            } => *required - *available,
            _ => 0,
        }
    }
}

/// Outcome of `update_credit_balance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceUpdateOutcome {
    /// The mutation was applied.
    Applied(AppliedMutation),
    /// A prior call with the same (tenant, reference, type) already applied.
    Duplicate {
        /// The original ledger row.
        transaction_id: Uuid,
        /// Balance recorded after the original call.
        new_balance: i64,
    },
    /// Debit rejected: balance below the requested amount; nothing changed.
    InsufficientCredits {
        /// Current balance.
        current_balance: i64,
        /// Requested debit amount.
        required: i64,
    },
    /// The requested amount was not strictly positive; nothing changed.
    InvalidAmount {
        /// The rejected amount.
        amount: i64,
    },
}

impl BalanceUpdateOutcome {
    /// Shortfall for an insufficient-credits outcome, zero otherwise.
    #[must_use]
    pub const fn shortfall(&self) -> i64 {
        match self {
            Self::InsufficientCredits {
                current_balance,
                required,
            } => *required - *current_balance,
            _ => 0,
        }
    }
}

/// Outcome of a two-party transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Both legs applied atomically.
    Applied {
        /// Debit leg on the sender.
        debit: AppliedMutation,
        /// Credit leg on the recipient.
        credit: AppliedMutation,
    },
    /// A prior transfer with the same reference already applied.
    Duplicate {
        /// The original debit-leg ledger row.
        transaction_id: Uuid,
    },
    /// Sender balance below the transfer amount; nothing changed.
    InsufficientCredits {
        /// Sender's current balance.
        current_balance: i64,
        /// Requested transfer amount.
        required: i64,
    },
    /// The requested amount was not strictly positive, or sender == recipient.
    Invalid {
        /// Reason code (`invalid_amount` or `same_tenant`).
        reason: &'static str,
    },
}

/// Outcome of a promo or referral redemption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedemptionOutcome {
    /// The code was redeemed and credits granted.
    Applied {
        /// Credits granted to the redeeming tenant.
        credits_granted: i64,
        /// Credits granted to the referrer (referral codes only).
        referrer_credits: i64,
        /// New balance of the redeeming tenant.
        new_balance: i64,
    },
    /// This tenant already redeemed this code.
    AlreadyRedeemed,
    /// The code was rejected.
    Rejected(crate::redemption::CodeRejection),
}
