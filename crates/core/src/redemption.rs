//! Promo and referral code validation.
//!
//! Pure checks over a code snapshot. The database unique constraint on
//! (code, tenant) is the source of truth for "already redeemed"; these
//! checks run first inside the same transaction to produce friendly reason
//! codes before the constraint would trip.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Snapshot of a redeemable code's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeSnapshot {
    /// Whether the code is active.
    pub is_active: bool,
    /// Optional expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Optional usage cap.
    pub max_uses: Option<i32>,
    /// Redemptions so far.
    pub uses_count: i32,
}

/// Why a code was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeRejection {
    /// No such code.
    NotFound,
    /// The code has been deactivated.
    Inactive,
    /// The code has expired.
    Expired,
    /// The usage cap has been reached.
    UsageCapReached,
    /// A referrer cannot redeem their own referral code.
    SelfReferral,
}

impl CodeRejection {
    /// Wire code for API responses.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "code_not_found",
            Self::Inactive => "code_inactive",
            Self::Expired => "code_expired",
            Self::UsageCapReached => "usage_cap_reached",
            Self::SelfReferral => "self_referral",
        }
    }
}

/// Validates a code snapshot at `now`.
///
/// # Errors
///
/// Returns the first applicable `CodeRejection`.
pub fn validate_code(code: &CodeSnapshot, now: DateTime<Utc>) -> Result<(), CodeRejection> {
    if !code.is_active {
        return Err(CodeRejection::Inactive);
    }
    if let Some(expires_at) = code.expires_at {
        if expires_at <= now {
            return Err(CodeRejection::Expired);
        }
    }
    if let Some(max_uses) = code.max_uses {
        if code.uses_count >= max_uses {
            return Err(CodeRejection::UsageCapReached);
        }
    }
    Ok(())
}

/// Validates a referral redemption: the general code checks plus the
/// self-referral rule.
///
/// # Errors
///
/// Returns the first applicable `CodeRejection`.
pub fn validate_referral(
    code: &CodeSnapshot,
    referrer_tenant_id: Uuid,
    redeeming_tenant_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), CodeRejection> {
    validate_code(code, now)?;
    if referrer_tenant_id == redeeming_tenant_id {
        return Err(CodeRejection::SelfReferral);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn valid_code() -> CodeSnapshot {
        CodeSnapshot {
            is_active: true,
            expires_at: Some(Utc::now() + Duration::days(30)),
            max_uses: Some(100),
            uses_count: 0,
        }
    }

    #[test]
    fn test_valid_code_passes() {
        assert!(validate_code(&valid_code(), Utc::now()).is_ok());
    }

    #[test]
    fn test_inactive_rejected() {
        let code = CodeSnapshot {
            is_active: false,
            ..valid_code()
        };
        assert_eq!(
            validate_code(&code, Utc::now()),
            Err(CodeRejection::Inactive)
        );
    }

    #[test]
    fn test_expired_rejected() {
        let code = CodeSnapshot {
            expires_at: Some(Utc::now() - Duration::hours(1)),
            ..valid_code()
        };
        assert_eq!(
            validate_code(&code, Utc::now()),
            Err(CodeRejection::Expired)
        );
    }

    #[test]
    fn test_no_expiry_never_expires() {
        let code = CodeSnapshot {
            expires_at: None,
            ..valid_code()
        };
        assert!(validate_code(&code, Utc::now()).is_ok());
    }

    #[test]
    fn test_usage_cap() {
        let code = CodeSnapshot {
            max_uses: Some(5),
            uses_count: 5,
            ..valid_code()
        };
        assert_eq!(
            validate_code(&code, Utc::now()),
            Err(CodeRejection::UsageCapReached)
        );
    }

    #[test]
    fn test_unlimited_uses() {
        let code = CodeSnapshot {
            max_uses: None,
            uses_count: 1_000_000,
            ..valid_code()
        };
        assert!(validate_code(&code, Utc::now()).is_ok());
    }

    #[test]
    fn test_self_referral_rejected() {
        let tenant = Uuid::new_v4();
        assert_eq!(
            validate_referral(&valid_code(), tenant, tenant, Utc::now()),
            Err(CodeRejection::SelfReferral)
        );
        assert!(validate_referral(&valid_code(), tenant, Uuid::new_v4(), Utc::now()).is_ok());
    }

    #[test]
    fn test_rejection_codes() {
        assert_eq!(CodeRejection::NotFound.as_str(), "code_not_found");
        assert_eq!(CodeRejection::SelfReferral.as_str(), "self_referral");
    }
}
