use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Order, OrderStatusType, StoreId, UserId, WalletTransaction, WithdrawalStatus},
    fees::FeeSplit,
};

//--------------------------------------   OrderQueryFilter  ---------------------------------------------------------
/// Filters for order searches. Empty filters match every order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQueryFilter {
    pub store_id: Option<StoreId>,
    pub rider_id: Option<UserId>,
    pub customer_id: Option<UserId>,
    pub status: Option<OrderStatusType>,
}

impl OrderQueryFilter {
    pub fn with_store_id(mut self, store_id: StoreId) -> Self {
        self.store_id = Some(store_id);
        self
    }

    pub fn with_rider_id(mut self, rider_id: UserId) -> Self {
        self.rider_id = Some(rider_id);
        self
    }

    pub fn with_customer_id(mut self, customer_id: UserId) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.store_id.is_none() && self.rider_id.is_none() && self.customer_id.is_none() && self.status.is_none()
    }
}

//--------------------------------------  WithdrawalFilter   ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalFilter {
    pub user_id: Option<UserId>,
    pub status: Option<WithdrawalStatus>,
}

//--------------------------------------     Settlement      ---------------------------------------------------------
/// Where the rider's share of a settled order went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "to", content = "userId")]
pub enum RiderPayout {
    /// Credited to the rider's p2p balance (in-house fleet)
    RiderP2pBalance(UserId),
    /// Credited to the wallet of the delivery service's admin
    DeliveryServiceAdmin(UserId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub order: Order,
    pub split: FeeSplit,
    pub store_admin: UserId,
    pub rider_payout: RiderPayout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cancellation {
    pub order: Order,
    pub refund: WalletTransaction,
}

//--------------------------------------      TopUpResult    ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopUpResult {
    Credited(WalletTransaction),
    /// A wallet transaction with this reference already exists. Nothing was changed.
    AlreadyApplied(String),
}

/// Whose ratings to aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RatingSubject {
    Rider(UserId),
    Store(StoreId),
}
