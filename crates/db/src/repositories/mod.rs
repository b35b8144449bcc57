//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for the ledger operations, hiding
//! the `SeaORM` implementation details from the rest of the application.
//! Every mutating operation runs inside a single database transaction and
//! takes a `FOR UPDATE` lock on the tenant's account row before reading the
//! balance.

pub mod account;
pub mod cost;
pub mod events;
pub mod grant;
pub mod ledger;
pub mod redemption;
pub mod tenant;
pub mod topup;

pub use cost::CostResolver;
pub use grant::{GrantRepository, GrantResult, SweepSummary};
pub use ledger::{
    BalanceUpdateInput, ConsumeInput, LedgerError, LedgerRepository, TransactionFilter,
};
pub use redemption::RedemptionRepository;
pub use tenant::{CreateTenantInput, TenantError, TenantRepository};
pub use topup::{TopupConfigInput, TopupRepository};
