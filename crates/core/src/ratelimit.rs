//! Per-tenant per-minute action rate limiting.
//!
//! A coarse abuse guard layered on top of the row lock: the counter lives on
//! the account row and resets lazily on the first action after the window
//! expires. It is defense-in-depth, not the consistency mechanism.

use chrono::{DateTime, Duration, Utc};

/// Window length for the action counter.
pub const WINDOW_SECS: i64 = 60;

/// Snapshot of the rate-limit counter on an account row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MinuteWindow {
    /// Actions observed in the current window.
    pub actions_this_minute: i32,
    /// Start of the current window (time of the first action in it).
    pub last_action_at: Option<DateTime<Utc>>,
}

/// Result of observing one action against the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// The action is within the cap; persist the updated window.
    Allowed(MinuteWindow),
    /// The cap is hit; retry after the window resets.
    Limited {
        /// Seconds until the window expires.
        retry_after_secs: i64,
    },
}

impl MinuteWindow {
    /// Observes one action at `now` against a cap of `limit` per minute.
    #[must_use]
    pub fn observe(self, now: DateTime<Utc>, limit: i32) -> RateDecision {
        let window_expired = match self.last_action_at {
            None => true,
            Some(start) => now - start >= Duration::seconds(WINDOW_SECS),
        };

        if window_expired {
            return RateDecision::Allowed(Self {
                actions_this_minute: 1,
                last_action_at: Some(now),
            });
        }

        if self.actions_this_minute < limit {
            return RateDecision::Allowed(Self {
                actions_this_minute: self.actions_this_minute + 1,
                last_action_at: self.last_action_at,
            });
        }

        let elapsed = self
            .last_action_at
            .map_or(0, |start| (now - start).num_seconds());
        RateDecision::Limited {
            retry_after_secs: (WINDOW_SECS - elapsed).max(1),
        }
    }
}
