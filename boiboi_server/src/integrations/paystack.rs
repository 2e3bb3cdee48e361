//! Adapts the Paystack REST client to the engine's [`PaymentGateway`] contract.
use boiboi_engine::{
    db_types::Kobo,
    traits::{CardCharge, ChargeStatus, GatewayError, PaymentGateway, TransferDetails, TransferReceipt, VerifiedCard},
    ChargeNotification,
};
use log::*;
use paystack_tools::{ChargeEvent, PaystackApi, PaystackApiError};
use serde_json::{json, Value};

#[derive(Clone)]
pub struct PaystackGateway {
    api: PaystackApi,
}

impl PaystackGateway {
    pub fn new(api: PaystackApi) -> Self {
        Self { api }
    }
}

pub fn gateway_error(e: PaystackApiError) -> GatewayError {
    match e {
        PaystackApiError::QueryError { status, message } => {
            let payload = serde_json::from_str::<Value>(&message).unwrap_or_else(|_| json!({ "message": message }));
            debug!("Paystack answered with status {status}: {payload}");
            GatewayError::Rejected(payload)
        },
        PaystackApiError::Declined(message) => GatewayError::Rejected(json!({ "message": message })),
        PaystackApiError::RestResponseError(s) | PaystackApiError::Initialization(s) => GatewayError::Transport(s),
        PaystackApiError::JsonError(s) | PaystackApiError::InvalidWebhook(s) => GatewayError::Decode(s),
        PaystackApiError::EmptyResponse => GatewayError::Decode("Paystack returned no data".into()),
    }
}

fn charge_status(status: &str) -> ChargeStatus {
    serde_json::from_value(Value::String(status.to_ascii_lowercase())).unwrap_or(ChargeStatus::Unknown)
}

/// Converts a verified `charge.success` webhook into the engine's top-up notification.
pub fn charge_notification(event: ChargeEvent) -> ChargeNotification {
    let purpose = event.purpose().map(String::from);
    ChargeNotification { email: event.customer.email, amount: event.amount, reference: event.reference, purpose }
}

impl PaymentGateway for PaystackGateway {
    async fn charge_saved_card(
        &self,
        email: &str,
        authorization_code: &str,
        amount: Kobo,
        metadata: Value,
    ) -> Result<CardCharge, GatewayError> {
        let charge = self
            .api
            .charge_authorization(email, authorization_code, amount, metadata)
            .await
            .map_err(gateway_error)?;
        Ok(CardCharge {
            status: charge_status(&charge.status),
            gateway_response: charge.gateway_response,
            reference: charge.reference,
        })
    }

    async fn initiate_transfer(
        &self,
        recipient_code: &str,
        amount: Kobo,
        reference: &str,
    ) -> Result<TransferReceipt, GatewayError> {
        let transfer = self.api.initiate_transfer(recipient_code, amount, reference).await.map_err(gateway_error)?;
        Ok(TransferReceipt { status: transfer.status, transfer_id: transfer.id, reference: transfer.reference })
    }

    async fn fetch_transfer(&self, transfer_id: i64) -> Result<TransferDetails, GatewayError> {
        let details = self.api.fetch_transfer(transfer_id).await.map_err(gateway_error)?;
        Ok(TransferDetails {
            recipient_code: details.recipient.recipient_code,
            reference: details.reference,
            amount: details.amount,
            status: details.status,
        })
    }

    async fn verify_transaction(&self, reference: &str) -> Result<VerifiedCard, GatewayError> {
        let tx = self.api.verify_transaction(reference).await.map_err(gateway_error)?;
        if !tx.is_success() {
            return Err(GatewayError::Rejected(json!({
                "message": format!("Transaction {reference} was not successful"),
                "status": tx.status,
                "gatewayResponse": tx.gateway_response,
            })));
        }
        let auth = tx
            .authorization
            .ok_or_else(|| GatewayError::Decode(format!("Transaction {reference} carries no card authorization")))?;
        Ok(VerifiedCard {
            email: tx.customer.email,
            authorization_code: auth.authorization_code,
            bank: auth.bank.unwrap_or_default(),
            card_type: auth.card_type.unwrap_or_default(),
            reusable: auth.reusable,
        })
    }

    async fn create_transfer_recipient(
        &self,
        name: &str,
        account_number: &str,
        bank_code: &str,
    ) -> Result<String, GatewayError> {
        let recipient =
            self.api.create_transfer_recipient(name, account_number, bank_code).await.map_err(gateway_error)?;
        Ok(recipient.recipient_code)
    }
}
