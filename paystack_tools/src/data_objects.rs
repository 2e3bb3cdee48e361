use boiboi_common::Kobo;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Every Paystack response is wrapped in this envelope. `status` is false when the request was refused, in which case
/// `message` says why and `data` is usually absent.
#[derive(Debug, Clone, Deserialize)]
pub struct PaystackResponse<T> {
    pub status: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChargeAuthorizationRequest {
    pub email: String,
    pub amount: Kobo,
    pub authorization_code: String,
    pub metadata: Value,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChargeData {
    pub amount: Kobo,
    pub status: String,
    pub reference: String,
    #[serde(default)]
    pub gateway_response: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferRequest {
    pub source: String,
    pub reason: String,
    pub amount: Kobo,
    pub recipient: String,
    pub reference: String,
}

impl TransferRequest {
    pub fn withdrawal(recipient: &str, amount: Kobo, reference: &str) -> Self {
        Self {
            source: "balance".to_string(),
            reason: "Withdrawal".to_string(),
            amount,
            recipient: recipient.to_string(),
            reference: reference.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransferData {
    pub id: i64,
    pub status: String,
    pub reference: String,
    #[serde(default)]
    pub transfer_code: String,
    pub amount: Kobo,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Recipient {
    pub recipient_code: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransferDetailsData {
    pub id: i64,
    pub amount: Kobo,
    pub reference: String,
    pub status: String,
    pub recipient: Recipient,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Customer {
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Authorization {
    pub authorization_code: String,
    #[serde(default)]
    pub bank: Option<String>,
    #[serde(default)]
    pub card_type: Option<String>,
    #[serde(default)]
    pub last4: Option<String>,
    #[serde(default)]
    pub reusable: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransactionData {
    pub id: i64,
    pub status: String,
    pub reference: String,
    pub amount: Kobo,
    #[serde(default)]
    pub gateway_response: String,
    pub customer: Customer,
    pub authorization: Option<Authorization>,
    /// Paystack sends an empty string when no metadata was attached.
    #[serde(default)]
    pub metadata: Value,
}

impl TransactionData {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferRecipientRequest {
    #[serde(rename = "type")]
    pub recipient_type: String,
    pub name: String,
    pub account_number: String,
    pub bank_code: String,
    pub currency: String,
}

impl TransferRecipientRequest {
    pub fn nuban(name: &str, account_number: &str, bank_code: &str) -> Self {
        Self {
            recipient_type: "nuban".to_string(),
            name: name.to_string(),
            account_number: account_number.to_string(),
            bank_code: bank_code.to_string(),
            currency: boiboi_common::NAIRA_CURRENCY_CODE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransferRecipientData {
    pub recipient_code: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub name: String,
}
