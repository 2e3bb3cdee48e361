use std::sync::Arc;

use boiboi_common::Kobo;
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{
    config::PaystackConfig,
    data_objects::{
        ChargeAuthorizationRequest,
        ChargeData,
        PaystackResponse,
        TransactionData,
        TransferData,
        TransferDetailsData,
        TransferRecipientData,
        TransferRecipientRequest,
        TransferRequest,
    },
    PaystackApiError,
};

#[derive(Clone)]
pub struct PaystackApi {
    config: PaystackConfig,
    client: Arc<Client>,
}

impl PaystackApi {
    pub fn new(config: PaystackConfig) -> Result<Self, PaystackApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let bearer = format!("Bearer {}", config.secret_key.reveal());
        let mut val = HeaderValue::from_str(&bearer).map_err(|e| PaystackApiError::Initialization(e.to_string()))?;
        val.set_sensitive(true);
        headers.insert(AUTHORIZATION, val);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaystackApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// Sends a request and unwraps Paystack's response envelope. A refused request (`status: false`) is an error
    /// carrying Paystack's message.
    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, PaystackApiError> {
        let url = self.url(path);
        trace!("Sending Paystack query: {method} {url}");
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| PaystackApiError::RestResponseError(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.map_err(|e| PaystackApiError::RestResponseError(e.to_string()))?;
            return Err(PaystackApiError::QueryError { status: status.as_u16(), message });
        }
        trace!("Paystack query successful. {status}");
        let envelope = response
            .json::<PaystackResponse<T>>()
            .await
            .map_err(|e| PaystackApiError::JsonError(e.to_string()))?;
        if !envelope.status {
            return Err(PaystackApiError::Declined(envelope.message));
        }
        envelope.data.ok_or(PaystackApiError::EmptyResponse)
    }

    /// Charges a saved card. Paystack answers a declined charge with a successful response, so callers must check
    /// the returned `status`.
    pub async fn charge_authorization(
        &self,
        email: &str,
        authorization_code: &str,
        amount: Kobo,
        metadata: Value,
    ) -> Result<ChargeData, PaystackApiError> {
        let body = ChargeAuthorizationRequest {
            email: email.to_string(),
            amount,
            authorization_code: authorization_code.to_string(),
            metadata,
        };
        debug!("Charging saved card of {email} for {amount}");
        let charge =
            self.rest_query::<ChargeData, _>(Method::POST, "/transaction/charge_authorization", Some(body)).await?;
        info!("Card charge {} for {email}: {} ({})", charge.reference, charge.status, charge.gateway_response);
        Ok(charge)
    }

    pub async fn initiate_transfer(
        &self,
        recipient_code: &str,
        amount: Kobo,
        reference: &str,
    ) -> Result<TransferData, PaystackApiError> {
        let body = TransferRequest::withdrawal(recipient_code, amount, reference);
        debug!("Initiating transfer {reference} of {amount} to {recipient_code}");
        let transfer = self.rest_query::<TransferData, _>(Method::POST, "/transfer", Some(body)).await?;
        info!("Transfer {reference} is {} (id {})", transfer.status, transfer.id);
        Ok(transfer)
    }

    pub async fn fetch_transfer(&self, transfer_id: i64) -> Result<TransferDetailsData, PaystackApiError> {
        let path = format!("/transfer/{transfer_id}");
        self.rest_query::<TransferDetailsData, ()>(Method::GET, &path, None).await
    }

    pub async fn verify_transaction(&self, reference: &str) -> Result<TransactionData, PaystackApiError> {
        let path = format!("/transaction/verify/{reference}");
        debug!("Verifying transaction {reference}");
        self.rest_query::<TransactionData, ()>(Method::GET, &path, None).await
    }

    pub async fn create_transfer_recipient(
        &self,
        name: &str,
        account_number: &str,
        bank_code: &str,
    ) -> Result<TransferRecipientData, PaystackApiError> {
        let body = TransferRecipientRequest::nuban(name, account_number, bank_code);
        let recipient =
            self.rest_query::<TransferRecipientData, _>(Method::POST, "/transferrecipient", Some(body)).await?;
        info!("Created transfer recipient {} for {name}", recipient.recipient_code);
        Ok(recipient)
    }
}
