//! Authentication types for service tokens.
//!
//! The ledger is called by other backend services (application API, edge
//! functions, payment webhooks, the cron scheduler). Callers authenticate
//! with a JWT; a token may optionally be scoped to a single tenant, in which
//! case it can only operate on that tenant's balance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims for service tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (caller service name, e.g. "storefront-api").
    pub sub: String,
    /// Optional tenant scope. `None` means a service-wide token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<Uuid>,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for a caller.
    #[must_use]
    pub fn new(caller: &str, tenant: Option<Uuid>, expires_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            sub: caller.to_string(),
            tenant,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the caller service name.
    #[must_use]
    pub fn caller(&self) -> &str {
        &self.sub
    }

    /// Returns the tenant scope, if any.
    #[must_use]
    pub const fn tenant_scope(&self) -> Option<Uuid> {
        self.tenant
    }

    /// Whether this token is service-wide (no tenant scope).
    #[must_use]
    pub const fn is_service_wide(&self) -> bool {
        self.tenant.is_none()
    }

    /// Whether this token may act on behalf of the given tenant.
    #[must_use]
    pub fn permits_tenant(&self, tenant_id: Uuid) -> bool {
        match self.tenant {
            None => true,
            Some(scope) => scope == tenant_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_service_wide_permits_any_tenant() {
        let claims = Claims::new("scheduler", None, Utc::now() + Duration::hours(1));
        assert!(claims.is_service_wide());
        assert!(claims.permits_tenant(Uuid::new_v4()));
    }

    #[test]
    fn test_scoped_token_permits_only_own_tenant() {
        let tenant = Uuid::new_v4();
        let claims = Claims::new("storefront-api", Some(tenant), Utc::now() + Duration::hours(1));
        assert!(!claims.is_service_wide());
        assert!(claims.permits_tenant(tenant));
        assert!(!claims.permits_tenant(Uuid::new_v4()));
    }
}
