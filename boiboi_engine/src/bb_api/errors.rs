use thiserror::Error;

use crate::{
    db::traits::LedgerError,
    db_types::{Kobo, ProgressStatus, StoreId},
    traits::{ChargeStatus, GatewayError},
};

#[derive(Debug, Clone, Error)]
pub enum MarketplaceError {
    /// The request is malformed. Nothing was changed.
    #[error("{0}")]
    Validation(String),
    #[error("Store {0} not found")]
    StoreNotFound(StoreId),
    #[error("This store is not currently accepting orders")]
    StoreInactive,
    #[error("You do not have a wallet yet")]
    WalletNotProvisioned,
    #[error("Insufficient wallet balance. Balance: {balance}, required: {required}")]
    InsufficientBalance { balance: Kobo, required: Kobo },
    #[error("Card not found")]
    CardNotFound,
    #[error("Payment was not approved. Status: {status:?}, gateway response: {gateway_response}")]
    PaymentDeclined { status: ChargeStatus, gateway_response: String },
    #[error("{0}")]
    Gateway(#[from] GatewayError),
    #[error("Withdrawal not allowed. {0}")]
    WithdrawalNotAllowed(String),
    #[error("Please add a withdrawal bank account first")]
    NoWithdrawalBank,
    #[error("Cannot move order progress from {from} to {to}")]
    InvalidTransition { from: ProgressStatus, to: ProgressStatus },
    #[error("{0}")]
    Ledger(#[from] LedgerError),
}

impl MarketplaceError {
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }
}
