use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaystackApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Paystack declined the request: {0}")]
    Declined(String),
    #[error("Paystack returned no data for a successful request")]
    EmptyResponse,
    #[error("Unexpected webhook payload: {0}")]
    InvalidWebhook(String),
}
