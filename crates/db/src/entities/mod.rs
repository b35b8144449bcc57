//! `SeaORM` entity definitions.

pub mod auto_topup_configs;
pub mod credit_costs;
pub mod credit_transactions;
pub mod promo_codes;
pub mod promo_redemptions;
pub mod referral_codes;
pub mod referral_redemptions;
pub mod sea_orm_active_enums;
pub mod tenant_credit_accounts;
pub mod tenants;
pub mod usage_events;
