//! #  Ledger Store contracts
//!
//! This module defines the interface contracts that a database *backend* has to satisfy in order to hold the
//! marketplace's orders and wallet ledger.
//!
//! * [`MarketplaceDatabase`] covers every state change. Multi-record changes (checkout, settlement, cancellation,
//!   withdrawal payouts) are atomic.
//! * [`AccountManagement`] covers the read-only queries for users, stores, orders, and wallet history.
mod account_management;
mod marketplace_database;

mod data_objects;

pub use account_management::AccountManagement;
pub use data_objects::{
    Cancellation,
    OrderQueryFilter,
    RatingSubject,
    RiderPayout,
    Settlement,
    TopUpResult,
    WithdrawalFilter,
};
pub use marketplace_database::{LedgerError, MarketplaceDatabase};
