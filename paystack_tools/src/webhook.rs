//! Webhook payloads. Paystack posts `{"event": "...", "data": {...}}`; the shape of `data` depends on the event.
//!
//! Signature checks happen before any of this is parsed, so the types here trust their input.
use boiboi_common::Kobo;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{data_objects::Customer, PaystackApiError};

pub const CHARGE_SUCCESS: &str = "charge.success";
pub const CHARGE_FAILED: &str = "charge.failed";
pub const TRANSFER_SUCCESS: &str = "transfer.success";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookPayload {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChargeEvent {
    pub reference: String,
    pub amount: Kobo,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub gateway_response: String,
    pub customer: Customer,
    #[serde(default)]
    pub metadata: Value,
}

impl ChargeEvent {
    /// The `type` the charge was tagged with when it was initiated, if any.
    pub fn purpose(&self) -> Option<&str> {
        self.metadata.get("type").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransferEvent {
    pub id: i64,
    pub amount: Kobo,
    pub reference: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone)]
pub enum PaystackEvent {
    ChargeSuccess(ChargeEvent),
    ChargeFailed(ChargeEvent),
    TransferSuccess(TransferEvent),
    /// An event the marketplace does not subscribe to. Carries the event name.
    Other(String),
}

impl TryFrom<WebhookPayload> for PaystackEvent {
    type Error = PaystackApiError;

    fn try_from(payload: WebhookPayload) -> Result<Self, Self::Error> {
        let invalid = |e: serde_json::Error| PaystackApiError::InvalidWebhook(format!("{}: {e}", payload.event));
        let event = match payload.event.as_str() {
            CHARGE_SUCCESS => Self::ChargeSuccess(serde_json::from_value(payload.data.clone()).map_err(invalid)?),
            CHARGE_FAILED => Self::ChargeFailed(serde_json::from_value(payload.data.clone()).map_err(invalid)?),
            TRANSFER_SUCCESS => Self::TransferSuccess(serde_json::from_value(payload.data.clone()).map_err(invalid)?),
            other => Self::Other(other.to_string()),
        };
        Ok(event)
    }
}

impl PaystackEvent {
    pub fn from_slice(body: &[u8]) -> Result<Self, PaystackApiError> {
        let payload = serde_json::from_slice::<WebhookPayload>(body)
            .map_err(|e| PaystackApiError::InvalidWebhook(e.to_string()))?;
        Self::try_from(payload)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn wallet_top_up() {
        let body = include_bytes!("./test_assets/charge_success.json");
        let event = PaystackEvent::from_slice(body).unwrap();
        let PaystackEvent::ChargeSuccess(charge) = event else {
            panic!("Expected charge.success, got {event:?}");
        };
        assert_eq!(charge.reference, "T_top_1xkq9d");
        assert_eq!(charge.amount, Kobo::from_naira(2_500));
        assert_eq!(charge.customer.email, "ada@example.com");
        assert_eq!(charge.purpose(), Some("wallet"));
    }

    #[test]
    fn charge_without_metadata() {
        let body = br#"{"event": "charge.failed", "data": {"reference": "T_1", "amount": 100,
            "customer": {"email": "ada@example.com"}, "metadata": ""}}"#;
        let PaystackEvent::ChargeFailed(charge) = PaystackEvent::from_slice(body).unwrap() else {
            panic!("Expected charge.failed");
        };
        assert_eq!(charge.purpose(), None);
    }

    #[test]
    fn transfers_and_unknown_events() {
        let body = br#"{"event": "transfer.success", "data": {"id": 14938, "amount": 20000, "reference": "abc",
            "status": "success"}}"#;
        assert!(matches!(PaystackEvent::from_slice(body).unwrap(), PaystackEvent::TransferSuccess(t) if t.id == 14938));
        let body = br#"{"event": "subscription.create", "data": {}}"#;
        assert!(matches!(PaystackEvent::from_slice(body).unwrap(), PaystackEvent::Other(e) if e == "subscription.create"));
    }

    #[test]
    fn malformed_payloads() {
        assert!(PaystackEvent::from_slice(b"not json").is_err());
        let body = br#"{"event": "charge.success", "data": {"reference": "T_1"}}"#;
        assert!(matches!(PaystackEvent::from_slice(body), Err(PaystackApiError::InvalidWebhook(_))));
    }
}
