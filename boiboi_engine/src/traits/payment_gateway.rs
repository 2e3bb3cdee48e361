use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::db_types::{Kobo, NewCard};

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The gateway answered, but refused the request. The payload is the gateway's own response.
    #[error("The payment gateway rejected the request: {0}")]
    Rejected(Value),
    #[error("Could not reach the payment gateway: {0}")]
    Transport(String),
    #[error("Could not understand the payment gateway's response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargeStatus {
    Success,
    Failed,
    Abandoned,
    Pending,
    Reversed,
    #[serde(other)]
    Unknown,
}

/// The outcome of charging a saved card. A declined charge is not an error: check `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardCharge {
    pub status: ChargeStatus,
    pub gateway_response: String,
    pub reference: String,
}

impl CardCharge {
    pub fn is_success(&self) -> bool {
        self.status == ChargeStatus::Success
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceipt {
    pub status: String,
    pub transfer_id: i64,
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferDetails {
    pub recipient_code: String,
    pub reference: String,
    pub amount: Kobo,
    pub status: String,
}

/// A card that was tokenised by a successful verification transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedCard {
    pub email: String,
    pub authorization_code: String,
    pub bank: String,
    pub card_type: String,
    pub reusable: bool,
}

impl From<VerifiedCard> for NewCard {
    fn from(card: VerifiedCard) -> Self {
        NewCard { authorization_code: card.authorization_code, bank: card.bank, card_type: card.card_type }
    }
}

/// The payment provider. All amounts are in kobo.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway: Clone {
    /// Charges a card that was saved earlier, identified by its authorization code. `metadata` is passed through to
    /// the provider and comes back in the resulting webhook.
    async fn charge_saved_card(
        &self,
        email: &str,
        authorization_code: &str,
        amount: Kobo,
        metadata: Value,
    ) -> Result<CardCharge, GatewayError>;

    /// Sends `amount` to a transfer recipient. `reference` makes the call idempotent on the provider side.
    async fn initiate_transfer(
        &self,
        recipient_code: &str,
        amount: Kobo,
        reference: &str,
    ) -> Result<TransferReceipt, GatewayError>;

    async fn fetch_transfer(&self, transfer_id: i64) -> Result<TransferDetails, GatewayError>;

    /// Looks up a card-tokenisation transaction. Fails unless the transaction succeeded.
    async fn verify_transaction(&self, reference: &str) -> Result<VerifiedCard, GatewayError>;

    /// Registers a bank account as a payout destination and returns its recipient code.
    async fn create_transfer_recipient(
        &self,
        name: &str,
        account_number: &str,
        bank_code: &str,
    ) -> Result<String, GatewayError>;
}
