//! Initial database migration.
//!
//! Creates the ledger schema: tenants, balance accounts, the append-only
//! transaction log, pricing, auto-top-up configuration, referral and promo
//! codes, analytics events, and seed pricing data.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: TENANTS & BALANCE ACCOUNTS
        // ============================================================
        db.execute_unprepared(TENANTS_SQL).await?;
        db.execute_unprepared(TENANT_CREDIT_ACCOUNTS_SQL).await?;

        // ============================================================
        // PART 3: TRANSACTION LOG
        // ============================================================
        db.execute_unprepared(CREDIT_TRANSACTIONS_SQL).await?;

        // ============================================================
        // PART 4: PRICING
        // ============================================================
        db.execute_unprepared(CREDIT_COSTS_SQL).await?;

        // ============================================================
        // PART 5: AUTO TOP-UP
        // ============================================================
        db.execute_unprepared(AUTO_TOPUP_CONFIGS_SQL).await?;

        // ============================================================
        // PART 6: REFERRAL & PROMO CODES
        // ============================================================
        db.execute_unprepared(REFERRAL_CODES_SQL).await?;
        db.execute_unprepared(REFERRAL_REDEMPTIONS_SQL).await?;
        db.execute_unprepared(PROMO_CODES_SQL).await?;
        db.execute_unprepared(PROMO_REDEMPTIONS_SQL).await?;

        // ============================================================
        // PART 7: ANALYTICS EVENTS
        // ============================================================
        db.execute_unprepared(USAGE_EVENTS_SQL).await?;

        // ============================================================
        // PART 8: SEED DATA
        // ============================================================
        db.execute_unprepared(SEED_CREDIT_COSTS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
CREATE TYPE credit_transaction_type AS ENUM (
    'purchase',
    'usage',
    'refund',
    'expiration',
    'bonus',
    'adjustment',
    'transfer_in',
    'transfer_out',
    'free_grant',
    'promo'
);
";

const TENANTS_SQL: &str = r"
CREATE TABLE tenants (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name TEXT NOT NULL,
    slug TEXT NOT NULL UNIQUE,
    is_free_tier BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const TENANT_CREDIT_ACCOUNTS_SQL: &str = r"
CREATE TABLE tenant_credit_accounts (
    tenant_id UUID PRIMARY KEY REFERENCES tenants(id) ON DELETE CASCADE,
    balance BIGINT NOT NULL DEFAULT 0 CHECK (balance >= 0),
    free_credits_balance BIGINT NOT NULL DEFAULT 0 CHECK (free_credits_balance >= 0),
    purchased_credits_balance BIGINT NOT NULL DEFAULT 0 CHECK (purchased_credits_balance >= 0),
    lifetime_earned BIGINT NOT NULL DEFAULT 0,
    lifetime_spent BIGINT NOT NULL DEFAULT 0,
    credits_used_today BIGINT NOT NULL DEFAULT 0,
    warning_100_sent BOOLEAN NOT NULL DEFAULT FALSE,
    warning_50_sent BOOLEAN NOT NULL DEFAULT FALSE,
    warning_20_sent BOOLEAN NOT NULL DEFAULT FALSE,
    warning_0_sent BOOLEAN NOT NULL DEFAULT FALSE,
    next_free_grant_at TIMESTAMPTZ,
    last_free_grant_at TIMESTAMPTZ,
    actions_this_minute INTEGER NOT NULL DEFAULT 0,
    last_action_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_accounts_free_tier_due
    ON tenant_credit_accounts (next_free_grant_at)
    WHERE next_free_grant_at IS NOT NULL;
";

const CREDIT_TRANSACTIONS_SQL: &str = r"
CREATE TABLE credit_transactions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
    amount BIGINT NOT NULL,
    balance_after BIGINT NOT NULL,
    transaction_type credit_transaction_type NOT NULL,
    reference_id TEXT,
    reference_type TEXT,
    description TEXT,
    metadata JSONB,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

-- Idempotency: one transaction per (tenant, reference, type).
CREATE UNIQUE INDEX idx_credit_transactions_idempotency
    ON credit_transactions (tenant_id, reference_id, transaction_type)
    WHERE reference_id IS NOT NULL;

CREATE INDEX idx_credit_transactions_tenant_created
    ON credit_transactions (tenant_id, created_at DESC);
";

const CREDIT_COSTS_SQL: &str = r"
CREATE TABLE credit_costs (
    action_key TEXT PRIMARY KEY,
    credit_cost BIGINT NOT NULL CHECK (credit_cost >= 0),
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    description TEXT,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const AUTO_TOPUP_CONFIGS_SQL: &str = r"
CREATE TABLE auto_topup_configs (
    tenant_id UUID PRIMARY KEY REFERENCES tenants(id) ON DELETE CASCADE,
    enabled BOOLEAN NOT NULL DEFAULT FALSE,
    trigger_threshold BIGINT NOT NULL DEFAULT 50,
    topup_amount BIGINT NOT NULL DEFAULT 1000 CHECK (topup_amount > 0),
    max_per_month INTEGER NOT NULL DEFAULT 3 CHECK (max_per_month >= 0),
    topups_this_month INTEGER NOT NULL DEFAULT 0,
    payment_method_id TEXT,
    counters_reset_at TIMESTAMPTZ NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_auto_topup_reset_due ON auto_topup_configs (counters_reset_at);
";

const REFERRAL_CODES_SQL: &str = r"
CREATE TABLE referral_codes (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    code TEXT NOT NULL UNIQUE,
    tenant_id UUID NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
    referrer_bonus BIGINT NOT NULL CHECK (referrer_bonus >= 0),
    referee_bonus BIGINT NOT NULL CHECK (referee_bonus >= 0),
    max_uses INTEGER,
    uses_count INTEGER NOT NULL DEFAULT 0,
    expires_at TIMESTAMPTZ,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const REFERRAL_REDEMPTIONS_SQL: &str = r"
CREATE TABLE referral_redemptions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    referral_code_id UUID NOT NULL REFERENCES referral_codes(id) ON DELETE CASCADE,
    referee_tenant_id UUID NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    -- One redemption per (code, referee); the source of truth.
    UNIQUE (referral_code_id, referee_tenant_id)
);
";

const PROMO_CODES_SQL: &str = r"
CREATE TABLE promo_codes (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    code TEXT NOT NULL UNIQUE,
    credits BIGINT NOT NULL CHECK (credits > 0),
    max_uses INTEGER,
    uses_count INTEGER NOT NULL DEFAULT 0,
    expires_at TIMESTAMPTZ,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const PROMO_REDEMPTIONS_SQL: &str = r"
CREATE TABLE promo_redemptions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    promo_code_id UUID NOT NULL REFERENCES promo_codes(id) ON DELETE CASCADE,
    tenant_id UUID NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (promo_code_id, tenant_id)
);
";

const USAGE_EVENTS_SQL: &str = r"
CREATE TABLE usage_events (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
    event_type TEXT NOT NULL,
    payload JSONB NOT NULL DEFAULT '{}',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_usage_events_tenant_created
    ON usage_events (tenant_id, created_at DESC);
CREATE INDEX idx_usage_events_type ON usage_events (event_type);
";

const SEED_CREDIT_COSTS_SQL: &str = r"
INSERT INTO credit_costs (action_key, credit_cost, description) VALUES
    ('order.create',     5,  'Create a retail or wholesale order'),
    ('order.fulfill',    2,  'Mark an order fulfilled'),
    ('product.publish',  2,  'Publish a product to the storefront'),
    ('listing.sync',     3,  'Sync a listing to the marketplace'),
    ('report.export',    10, 'Export an analytics report'),
    ('customer.import',  1,  'Import a customer record'),
    ('delivery.dispatch', 4, 'Dispatch a delivery run')
ON CONFLICT (action_key) DO NOTHING;
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS usage_events;
DROP TABLE IF EXISTS promo_redemptions;
DROP TABLE IF EXISTS promo_codes;
DROP TABLE IF EXISTS referral_redemptions;
DROP TABLE IF EXISTS referral_codes;
DROP TABLE IF EXISTS auto_topup_configs;
DROP TABLE IF EXISTS credit_costs;
DROP TABLE IF EXISTS credit_transactions;
DROP TABLE IF EXISTS tenant_credit_accounts;
DROP TABLE IF EXISTS tenants;
DROP TYPE IF EXISTS credit_transaction_type;
";
