use serde::{Deserialize, Serialize};

use crate::{
    db::traits::Settlement,
    db_types::{Order, ProgressStatus, WalletTransaction, WithdrawalRequest},
};

/// A paid order was created at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlacedEvent {
    pub order: Order,
}

impl OrderPlacedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdatedEvent {
    pub previous: ProgressStatus,
    pub order: Order,
}

impl ProgressUpdatedEvent {
    pub fn new(previous: ProgressStatus, order: Order) -> Self {
        Self { previous, order }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCompletedEvent {
    pub settlement: Settlement,
}

impl OrderCompletedEvent {
    pub fn new(settlement: Settlement) -> Self {
        Self { settlement }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelledEvent {
    pub order: Order,
    pub refund: WalletTransaction,
}

impl OrderCancelledEvent {
    pub fn new(order: Order, refund: WalletTransaction) -> Self {
        Self { order, refund }
    }
}

/// Money arrived in a user's wallet from outside the platform, i.e. a top-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletCreditedEvent {
    pub transaction: WalletTransaction,
}

impl WalletCreditedEvent {
    pub fn new(transaction: WalletTransaction) -> Self {
        Self { transaction }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalProcessedEvent {
    pub request: WithdrawalRequest,
    pub transaction: WalletTransaction,
}

impl WithdrawalProcessedEvent {
    pub fn new(request: WithdrawalRequest, transaction: WalletTransaction) -> Self {
        Self { request, transaction }
    }
}
