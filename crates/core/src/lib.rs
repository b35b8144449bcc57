//! Core business logic for Kredo.
//!
//! This crate contains the pure decision logic of the credit ledger:
//! transaction taxonomy and direction rules, consumption policy, warning
//! thresholds, rate limiting, auto-top-up decisions, free-grant scheduling,
//! and promo/referral code validation. It has no web or database
//! dependencies; the `kredo-db` repositories drive these functions inside
//! database transactions.

pub mod grant;
pub mod ledger;
pub mod ratelimit;
pub mod redemption;
pub mod topup;

pub use ledger::outcome::{
    AppliedMutation, BalanceUpdateOutcome, ConsumeOutcome, RedemptionOutcome, TransferOutcome,
};
pub use ledger::types::{Direction, TransactionType};
