//! Auto-top-up decision logic.
//!
//! The ledger never initiates a charge. `check` is a pure decision over a
//! config snapshot; the caller passes the result to the payment processor
//! and reports back through `record_auto_topup` only after the charge
//! succeeded.

/// Snapshot of a tenant's auto-top-up configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopupConfig {
    /// Whether the feature is enabled for this tenant.
    pub enabled: bool,
    /// Trigger when the balance is at or below this.
    pub trigger_threshold: i64,
    /// Credits to buy per top-up.
    pub topup_amount: i64,
    /// Monthly cap on automatic top-ups.
    pub max_per_month: i32,
    /// Top-ups already recorded this month.
    pub topups_this_month: i32,
    /// Whether a payment method is on file.
    pub has_payment_method: bool,
}

/// Why a top-up was not triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No configuration row exists for the tenant.
    NotConfigured,
    /// The feature is disabled.
    NotEnabled,
    /// Balance is above the trigger threshold.
    AboveThreshold,
    /// The monthly cap has been reached.
    MaxReached,
    /// No payment method is on file.
    NoPaymentMethod,
}

impl SkipReason {
    /// Wire code for API responses.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotConfigured => "not_configured",
            Self::NotEnabled => "not_enabled",
            Self::AboveThreshold => "above_threshold",
            Self::MaxReached => "max_reached",
            Self::NoPaymentMethod => "no_payment_method",
        }
    }
}

/// Decision returned by `check`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopupDecision {
    /// The caller should charge the tenant for `topup_amount` credits.
    Trigger {
        /// Credits to purchase.
        topup_amount: i64,
    },
    /// No top-up; the reason code is returned to the caller.
    Skip(SkipReason),
}

/// Decides whether an auto-top-up should be triggered. Pure; no mutation.
#[must_use]
pub fn check(config: Option<&TopupConfig>, current_balance: i64) -> TopupDecision {
    let Some(config) = config else {
        return TopupDecision::Skip(SkipReason::NotConfigured);
    };

    if !config.enabled {
        return TopupDecision::Skip(SkipReason::NotEnabled);
    }
    if current_balance > config.trigger_threshold {
        return TopupDecision::Skip(SkipReason::AboveThreshold);
    }
    if config.topups_this_month >= config.max_per_month {
        return TopupDecision::Skip(SkipReason::MaxReached);
    }
    if !config.has_payment_method {
        return TopupDecision::Skip(SkipReason::NoPaymentMethod);
    }

    TopupDecision::Trigger {
        topup_amount: config.topup_amount,
    }
}
