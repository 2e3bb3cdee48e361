use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use boiboi_engine::{traits::GatewayError, LedgerError, MarketplaceError};
use log::error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    /// The request was valid, but the current state of the marketplace does not allow it.
    #[error("{0}")]
    PreconditionFailed(String),
    #[error("The payment provider could not process the request. {0}")]
    GatewayError(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::PreconditionFailed(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedToken(_) => StatusCode::UNAUTHORIZED,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
                AuthError::AccountNotFound => StatusCode::FORBIDDEN,
            },
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::GatewayError(_) => StatusCode::BAD_GATEWAY,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No access token was provided.")]
    MissingToken,
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("Access token is invalid. {0}")]
    ValidationError(String),
    #[error("Access token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
    #[error("User account not found.")]
    AccountNotFound,
}

impl From<MarketplaceError> for ServerError {
    fn from(e: MarketplaceError) -> Self {
        match e {
            MarketplaceError::Validation(_) => Self::InvalidRequestBody(e.to_string()),
            MarketplaceError::StoreNotFound(_) | MarketplaceError::CardNotFound => Self::NoRecordFound(e.to_string()),
            MarketplaceError::StoreInactive |
            MarketplaceError::WalletNotProvisioned |
            MarketplaceError::InsufficientBalance { .. } |
            MarketplaceError::PaymentDeclined { .. } |
            MarketplaceError::NoWithdrawalBank |
            MarketplaceError::InvalidTransition { .. } => Self::PreconditionFailed(e.to_string()),
            MarketplaceError::WithdrawalNotAllowed(_) => Self::InsufficientPermissions(e.to_string()),
            MarketplaceError::Gateway(e) => e.into(),
            MarketplaceError::Ledger(e) => e.into(),
        }
    }
}

impl From<GatewayError> for ServerError {
    fn from(e: GatewayError) -> Self {
        error!("💻️ Payment gateway error: {e}");
        Self::GatewayError(e.to_string())
    }
}

impl From<LedgerError> for ServerError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::DatabaseError(ref msg) | LedgerError::Busy(ref msg) => {
                error!("🗃️ Database error: {msg}");
                Self::BackendError(e.to_string())
            },
            LedgerError::OrderNotFound(_) |
            LedgerError::UserNotFound(_) |
            LedgerError::EmailNotFound(_) |
            LedgerError::StoreNotFound(_) |
            LedgerError::RiderNotFound(_) |
            LedgerError::WithdrawalNotFound(_) => Self::NoRecordFound(e.to_string()),
            LedgerError::NotOrderParticipant(_) => Self::InsufficientPermissions(e.to_string()),
            LedgerError::WrongOrderCode |
            LedgerError::OrderAlreadyCompleted |
            LedgerError::OrderAlreadyCancelled |
            LedgerError::OrderNotCompleted |
            LedgerError::RiderAlreadyAssigned |
            LedgerError::RiderNotAssigned(_) |
            LedgerError::CartNotFound(_) |
            LedgerError::CartNotOwned(_) |
            LedgerError::CartAlreadyCheckedOut(_) |
            LedgerError::WithdrawalStateConflict(_) |
            LedgerError::InsufficientBalance { .. } => Self::PreconditionFailed(e.to_string()),
            LedgerError::StoreAdminNotFound(_) |
            LedgerError::DeliveryServiceNotFound(_) |
            LedgerError::DeliveryAdminNotFound(_) |
            LedgerError::NoCheckoutSettings |
            LedgerError::FeeError(_) => {
                error!("🗃️ Inconsistent marketplace data: {e}");
                Self::BackendError(e.to_string())
            },
        }
    }
}
