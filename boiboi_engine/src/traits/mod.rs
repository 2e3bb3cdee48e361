//! Contracts for the external services the engine depends on.
//!
//! * [`PaymentGateway`] charges saved cards, verifies card-tokenisation transactions and pays out to bank accounts.
//! * [`PushSender`] delivers push notifications to a single device.
//!
//! The engine never talks to these services directly. The server supplies adapters for the concrete providers, and
//! the tests supply mocks.
mod payment_gateway;
mod push_sender;

pub use payment_gateway::{
    CardCharge,
    ChargeStatus,
    GatewayError,
    PaymentGateway,
    TransferDetails,
    TransferReceipt,
    VerifiedCard,
};
pub use push_sender::{Notification, PushError, PushSender};
