//! Consumption policy: free actions, default pricing, warning thresholds.

/// Actions that never cost credits and never touch the ledger.
pub const FREE_ACTIONS: [&str; 4] = ["login", "logout", "view", "profile.update"];

/// Cost applied when an action key has no active pricing row.
pub const DEFAULT_ACTION_COST: i64 = 1;

/// Low-balance thresholds, highest first. The zero threshold fires on
/// exact depletion only.
pub const WARNING_THRESHOLDS: [i64; 4] = [100, 50, 20, 0];

/// Returns whether the action key is on the free allowlist.
#[must_use]
pub fn is_free_action(action_key: &str) -> bool {
    FREE_ACTIONS.contains(&action_key)
}

/// One-shot low-balance warning flags stored on the account row.
///
/// Each flag is set at most once as the balance crosses its threshold and is
/// only cleared by the next free-grant cycle, so a tenant gets one
/// notification per threshold per cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarningFlags {
    /// Balance reached 100 or below.
    pub warning_100_sent: bool,
    /// Balance reached 50 or below.
    pub warning_50_sent: bool,
    /// Balance reached 20 or below.
    pub warning_20_sent: bool,
    /// Balance reached exactly zero.
    pub warning_0_sent: bool,
}

impl WarningFlags {
    /// Computes the flag state after the balance drops to `balance_after`,
    /// returning the new flags and the thresholds newly crossed (for
    /// notification events).
    #[must_use]
    pub fn observe(self, balance_after: i64) -> (Self, Vec<i64>) {
        let mut next = self;
        let mut crossed = Vec::new();

        if balance_after <= 100 && !next.warning_100_sent {
            next.warning_100_sent = true;
            crossed.push(100);
        }
        if balance_after <= 50 && !next.warning_50_sent {
            next.warning_50_sent = true;
            crossed.push(50);
        }
        if balance_after <= 20 && !next.warning_20_sent {
            next.warning_20_sent = true;
            crossed.push(20);
        }
        if balance_after == 0 && !next.warning_0_sent {
            next.warning_0_sent = true;
            crossed.push(0);
        }

        (next, crossed)
    }

    /// Whether any flag is set.
    #[must_use]
    pub const fn any(self) -> bool {
        self.warning_100_sent || self.warning_50_sent || self.warning_20_sent || self.warning_0_sent
    }
}

/// Splits a debit across the free and purchased sub-balances.
///
/// Free credits are spent first; they expire at the next grant cycle while
/// purchased credits never do, so spending free first maximizes what the
/// tenant keeps.
#[must_use]
pub const fn split_debit(free_balance: i64, cost: i64) -> (i64, i64) {
    let from_free = if cost <= free_balance {
        cost
    } else {
        free_balance
    };
    (from_free, cost - from_free)
}
