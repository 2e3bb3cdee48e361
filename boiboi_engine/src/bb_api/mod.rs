//! # Boiboi engine public API
//!
//! The `bb_api` module exposes the programmatic API of the marketplace engine. The API is modular, so that clients
//! can pick the parts they need.
//!
//! * [`checkout_api`] turns a paid cart into an order, paying from the customer's wallet or a saved card.
//! * [`order_flow_api`] moves orders through the delivery sequence and answers order queries.
//! * [`settlement_api`] completes orders and splits the payment between the store, the rider and the platform.
//! * [`cancellation_api`] cancels orders that have not been picked up and refunds the customer.
//! * [`wallet_api`] handles wallet top-ups, saved cards, withdrawal banks and device registration.
//! * [`withdrawal_api`] queues withdrawal requests and pays them out, retrying failed payouts with backoff.
//! * [`rating_api`] records customer ratings and rolls them up into rider and store ratings.
//!
//! # API usage
//!
//! Every API is created by supplying a database backend that implements [`crate::MarketplaceDatabase`], plus the
//! payment gateway where money leaves or enters the platform and the event producers for the hooks it fires.
//!
//! ```rust,ignore
//! use boiboi_engine::{events::EventProducers, SettlementApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/boiboi.db", 5).await?;
//! let api = SettlementApi::new(db, EventProducers::default());
//! let settlement = api.complete_order(&order_id, "4821").await?;
//! ```

pub mod cancellation_api;
pub mod checkout_api;
pub mod errors;
pub mod order_flow_api;
pub mod order_objects;
pub mod rating_api;
pub mod settlement_api;
pub mod wallet_api;
pub mod withdrawal_api;
