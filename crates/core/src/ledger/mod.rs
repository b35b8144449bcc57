//! Credit ledger domain logic.
//!
//! The ledger is an append-only log of signed credit movements plus a
//! mutable per-tenant balance. Everything in this module is pure: the
//! repositories in `kredo-db` apply these rules under a row-level lock.

pub mod outcome;
pub mod policy;
pub mod types;
