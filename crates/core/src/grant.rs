//! Free-grant cycle scheduling.
//!
//! Free-tier tenants receive a recurring grant of expiring credits. The
//! sweep is idempotent per tenant: a grant is due only when the stored
//! `next_free_grant_at` is null or in the past, so re-running the sweep
//! never double-grants.

use chrono::{DateTime, Months, Utc};

/// Computes the next grant timestamp, one calendar month after `now`.
#[must_use]
pub fn next_grant_at(now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_add_months(Months::new(1)).unwrap_or(now)
}

/// Whether a grant is due for a tenant with the given schedule state.
#[must_use]
pub fn is_grant_due(next_free_grant_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match next_free_grant_at {
        None => true,
        Some(due) => due <= now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_next_grant_is_one_month_ahead() {
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();
        let next = next_grant_at(now);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 2, 15, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_month_end_clamps() {
        let now = Utc.with_ymd_and_hms(2026, 1, 31, 0, 0, 0).unwrap();
        let next = next_grant_at(now);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 2, 28, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_grant_due_rules() {
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap();

        // Never granted
        assert!(is_grant_due(None, now));
        // Due in the past
        assert!(is_grant_due(
            Some(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()),
            now
        ));
        // Due exactly now
        assert!(is_grant_due(Some(now), now));
        // Due in the future: must not double-grant
        assert!(!is_grant_due(
            Some(Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap()),
            now
        ));
    }
}
