use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use serde_json::{json, Value};

use boiboi_engine::{
    db_types::{new_payment_reference, Kobo},
    traits::{
        CardCharge,
        ChargeStatus,
        GatewayError,
        PaymentGateway,
        TransferDetails,
        TransferReceipt,
        VerifiedCard,
    },
};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCharge {
    pub email: String,
    pub authorization_code: String,
    pub amount: Kobo,
    pub metadata: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedTransfer {
    pub recipient_code: String,
    pub amount: Kobo,
    pub reference: String,
}

#[derive(Debug, Default)]
struct GatewayState {
    charge_outcome: Option<(ChargeStatus, String)>,
    transfer_outcomes: VecDeque<Result<String, GatewayError>>,
    verified_card: Option<VerifiedCard>,
    charges: Vec<RecordedCharge>,
    transfers: Vec<RecordedTransfer>,
    next_transfer_id: i64,
}

/// An in-memory payment gateway. Charges succeed and transfers complete unless told otherwise.
#[derive(Debug, Clone, Default)]
pub struct MockGateway {
    state: Arc<Mutex<GatewayState>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every following card charge comes back with this status and gateway response.
    pub fn set_charge_outcome(&self, status: ChargeStatus, gateway_response: &str) {
        self.state.lock().unwrap().charge_outcome = Some((status, gateway_response.to_string()));
    }

    /// Queues the outcome of the next transfer. `Ok(status)` is returned as the transfer status.
    pub fn push_transfer_outcome(&self, outcome: Result<&str, GatewayError>) {
        self.state.lock().unwrap().transfer_outcomes.push_back(outcome.map(String::from));
    }

    pub fn set_verified_card(&self, card: VerifiedCard) {
        self.state.lock().unwrap().verified_card = Some(card);
    }

    pub fn charges(&self) -> Vec<RecordedCharge> {
        self.state.lock().unwrap().charges.clone()
    }

    pub fn transfers(&self) -> Vec<RecordedTransfer> {
        self.state.lock().unwrap().transfers.clone()
    }
}

impl PaymentGateway for MockGateway {
    async fn charge_saved_card(
        &self,
        email: &str,
        authorization_code: &str,
        amount: Kobo,
        metadata: Value,
    ) -> Result<CardCharge, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.charges.push(RecordedCharge {
            email: email.to_string(),
            authorization_code: authorization_code.to_string(),
            amount,
            metadata,
        });
        let (status, gateway_response) =
            state.charge_outcome.clone().unwrap_or((ChargeStatus::Success, "Approved".to_string()));
        Ok(CardCharge { status, gateway_response, reference: new_payment_reference() })
    }

    async fn initiate_transfer(
        &self,
        recipient_code: &str,
        amount: Kobo,
        reference: &str,
    ) -> Result<TransferReceipt, GatewayError> {
        let mut state = self.state.lock().unwrap();
        let status = state.transfer_outcomes.pop_front().unwrap_or_else(|| Ok("success".to_string()))?;
        state.transfers.push(RecordedTransfer {
            recipient_code: recipient_code.to_string(),
            amount,
            reference: reference.to_string(),
        });
        state.next_transfer_id += 1;
        Ok(TransferReceipt { status, transfer_id: state.next_transfer_id, reference: reference.to_string() })
    }

    async fn fetch_transfer(&self, transfer_id: i64) -> Result<TransferDetails, GatewayError> {
        let state = self.state.lock().unwrap();
        let index = usize::try_from(transfer_id - 1).map_err(|e| GatewayError::Decode(e.to_string()))?;
        let transfer = state
            .transfers
            .get(index)
            .ok_or_else(|| GatewayError::Rejected(json!({"status": false, "message": "Transfer not found"})))?;
        Ok(TransferDetails {
            recipient_code: transfer.recipient_code.clone(),
            reference: transfer.reference.clone(),
            amount: transfer.amount,
            status: "success".to_string(),
        })
    }

    async fn verify_transaction(&self, reference: &str) -> Result<VerifiedCard, GatewayError> {
        self.state.lock().unwrap().verified_card.clone().ok_or_else(|| {
            GatewayError::Rejected(json!({"status": false, "message": format!("Transaction {reference} not found")}))
        })
    }

    async fn create_transfer_recipient(
        &self,
        _name: &str,
        account_number: &str,
        bank_code: &str,
    ) -> Result<String, GatewayError> {
        Ok(format!("RCP_{bank_code}_{account_number}"))
    }
}
