//! Boiboi Marketplace Engine
//!
//! The engine holds the core logic of the Boiboi food-delivery marketplace: checkout, the order life cycle, settlement
//! of completed orders between the store, the rider and the platform, cancellations, wallet top-ups, withdrawals and
//! ratings. It is provider-agnostic: the payment gateway and push provider are reached through the traits in
//! [`mod@traits`].
//!
//! The library is divided into two main sections:
//! 1. The Ledger Store ([`mod@db`]). SQLite is the supported backend. You should never need to access the database
//!    directly. Instead, use the public API provided by the engine. The exception is the data types used in the
//!    database. These are defined in the `db_types` module and are public.
//! 2. The engine public API ([`mod@bb_api`]). This provides the public-facing functionality of the marketplace.
//!
//! The engine also emits events when something happens, e.g. an `OrderPlacedEvent` when checkout succeeds. The
//! [`notifications`] module hooks into these to tell customers, riders and merchants.
mod db;

pub mod bb_api;
pub mod db_types;
pub mod events;
pub mod fees;
pub mod notifications;
pub mod traits;

pub use bb_api::{
    cancellation_api::CancellationApi,
    checkout_api::CheckoutApi,
    errors::MarketplaceError,
    order_flow_api::{OrderFlowApi, ProgressMode},
    order_objects,
    rating_api::{RatingApi, RatingSummary},
    settlement_api::SettlementApi,
    wallet_api::{ChargeNotification, NewBankAccount, WalletApi},
    withdrawal_api::{RetryPolicy, WithdrawalApi, WithdrawalRunSummary},
};
#[cfg(feature = "sqlite")]
pub use db::sqlite::db::SqliteDatabase;
pub use db::traits::{
    AccountManagement,
    Cancellation,
    LedgerError,
    MarketplaceDatabase,
    OrderQueryFilter,
    RatingSubject,
    RiderPayout,
    Settlement,
    TopUpResult,
    WithdrawalFilter,
};
