//! A thin client for the parts of the Paystack REST API the marketplace uses, and the payloads of the webhook events
//! Paystack sends back.
//!
//! All amounts are in kobo, which is what Paystack expects on the wire.
mod api;
mod config;
mod error;

mod data_objects;
mod webhook;

pub use api::PaystackApi;
pub use config::PaystackConfig;
pub use data_objects::{
    Authorization,
    ChargeAuthorizationRequest,
    ChargeData,
    Customer,
    Recipient,
    TransactionData,
    TransferData,
    TransferDetailsData,
    TransferRecipientData,
    TransferRecipientRequest,
    TransferRequest,
};
pub use error::PaystackApiError;
pub use webhook::{ChargeEvent, PaystackEvent, TransferEvent, WebhookPayload};
