use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    db::traits::{AccountManagement, Cancellation, Settlement, TopUpResult},
    db_types::{
        Card,
        CartId,
        CheckoutSettings,
        DeviceToken,
        Kobo,
        NewCard,
        NewOrder,
        NewWithdrawalBank,
        NewWithdrawalRequest,
        Order,
        OrderId,
        ProgressStatus,
        StoreId,
        UserId,
        WalletTransaction,
        WithdrawalBank,
        WithdrawalId,
        WithdrawalRequest,
        WithdrawalRetry,
    },
    fees::{FeeError, FeePolicy},
};

/// The mutating half of the Ledger Store.
///
/// Every method that touches more than one record is atomic: either all of its writes commit, or none do. Balances
/// are always changed with in-place increments, never by writing back a value that was read earlier.
#[allow(async_fn_in_trait)]
pub trait MarketplaceDatabase: Clone + AccountManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Creates an order from a paid cart. In a single transaction this
    /// * marks the cart as completed, failing if the cart does not exist, belongs to someone else or was already
    ///   checked out,
    /// * for wallet payments, debits the customer's wallet by the order price, failing with
    ///   [`LedgerError::InsufficientBalance`] if less than [`crate::db_types::MINIMUM_WALLET_BALANCE`] would remain,
    ///   and records a debit wallet transaction,
    /// * inserts the order transaction record,
    /// * inserts the order (status `ongoing`, progress `orderReceivedByVendor`, paid),
    /// * clears the customer's current-cart pointer.
    ///
    /// The cart claim and the wallet debit are conditional writes, so concurrent checkouts cannot reuse a cart or
    /// take the wallet below the floor.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, LedgerError>;

    /// Sets the order's progress status. If `rider` is given, the order is assigned to that rider as well, unless
    /// another rider holds it already, in which case nothing changes and [`LedgerError::NotOrderParticipant`] is
    /// returned. Fails with [`LedgerError::OrderAlreadyCompleted`] or [`LedgerError::OrderAlreadyCancelled`] if the
    /// order reached a terminal state.
    async fn update_order_progress(
        &self,
        order_id: &OrderId,
        status: ProgressStatus,
        rider: Option<&UserId>,
    ) -> Result<Order, LedgerError>;

    /// Completes an order and pays everyone out. In a single transaction this
    /// * checks that the order exists, that `code` matches, and that the order is still ongoing,
    /// * reads the checkout settings and computes the fee split using `policy`,
    /// * credits the store admin's wallet,
    /// * credits either the rider's p2p balance (in-house fleet) or the delivery service admin's wallet,
    /// * records a credit wallet transaction for each of the two payouts,
    /// * credits the platform account,
    /// * marks the order as completed.
    ///
    /// The status change is conditional on the order still being ongoing, so two concurrent completions cannot both
    /// succeed.
    async fn complete_order(
        &self,
        order_id: &OrderId,
        code: &str,
        policy: &dyn FeePolicy,
    ) -> Result<Settlement, LedgerError>;

    /// Cancels an ongoing order that has no rider and refunds the full price to the customer's wallet, recording a
    /// credit wallet transaction. `acting_user` must be the customer or the admin of the order's store.
    async fn cancel_order(&self, order_id: &OrderId, acting_user: &UserId) -> Result<Cancellation, LedgerError>;

    /// Stores the customer's ratings for a completed order.
    async fn rate_order(
        &self,
        order_id: &OrderId,
        customer: &UserId,
        rider_rating: Option<i64>,
        vendor_rating: Option<i64>,
    ) -> Result<Order, LedgerError>;

    /// Credits a wallet top-up to the user with the given e-mail. If a wallet transaction with the same reference
    /// exists already, nothing happens.
    async fn credit_wallet_top_up(&self, email: &str, amount: Kobo, reference: &str)
        -> Result<TopUpResult, LedgerError>;

    /// Saves a verified card. The user's first card becomes the selected card.
    async fn insert_card(&self, user_id: &UserId, card: NewCard) -> Result<Card, LedgerError>;

    /// Saves a withdrawal bank and makes it the user's only active bank.
    async fn insert_withdrawal_bank(
        &self,
        user_id: &UserId,
        bank: NewWithdrawalBank,
    ) -> Result<WithdrawalBank, LedgerError>;

    async fn upsert_device_token(
        &self,
        user_id: &UserId,
        token: &str,
        device_type: &str,
    ) -> Result<DeviceToken, LedgerError>;

    async fn delete_device_token(&self, token: &str) -> Result<(), LedgerError>;

    async fn insert_withdrawal_request(&self, request: NewWithdrawalRequest)
        -> Result<WithdrawalRequest, LedgerError>;

    /// Records a successful payout. In a single transaction this debits the user's wallet by the request amount,
    /// records a debit wallet transaction with the gateway `reference`, and marks the request as processed.
    async fn complete_withdrawal(&self, id: &WithdrawalId, reference: &str) -> Result<WalletTransaction, LedgerError>;

    /// Records a failed payout attempt: bumps the attempt counter and either schedules the next attempt or moves the
    /// request to the dead-letter state.
    async fn record_withdrawal_failure(
        &self,
        id: &WithdrawalId,
        error: &str,
        retry: WithdrawalRetry,
    ) -> Result<WithdrawalRequest, LedgerError>;

    /// Moves a dead-lettered request back to pending with a fresh attempt budget.
    async fn requeue_withdrawal(&self, id: &WithdrawalId) -> Result<WithdrawalRequest, LedgerError>;

    async fn upsert_rider_rating(&self, user_id: &UserId, value: f64, at: DateTime<Utc>) -> Result<(), LedgerError>;

    async fn update_store_rating(&self, store_id: &StoreId, value: f64) -> Result<(), LedgerError>;

    async fn update_checkout_settings(&self, settings: CheckoutSettings) -> Result<CheckoutSettings, LedgerError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), LedgerError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("An error occurred in the database: {0}")]
    DatabaseError(String),
    /// Another connection holds a conflicting lock. The transaction was rolled back and can be retried.
    #[error("The database is busy: {0}")]
    Busy(String),
    #[error("Order {0} not found")]
    OrderNotFound(OrderId),
    #[error("Cart {0} not found")]
    CartNotFound(CartId),
    #[error("Cart {0} does not belong to you")]
    CartNotOwned(CartId),
    #[error("Cart {0} has already been checked out")]
    CartAlreadyCheckedOut(CartId),
    #[error("User {0} not found")]
    UserNotFound(UserId),
    #[error("No user found with e-mail {0}")]
    EmailNotFound(String),
    #[error("Store {0} not found")]
    StoreNotFound(StoreId),
    #[error("No admin user found for store {0}")]
    StoreAdminNotFound(StoreId),
    #[error("No rider has been assigned to order {0}")]
    RiderNotAssigned(OrderId),
    #[error("Rider {0} not found")]
    RiderNotFound(UserId),
    #[error("No delivery service found for rider {0}")]
    DeliveryServiceNotFound(UserId),
    #[error("No admin user found for the delivery service of rider {0}")]
    DeliveryAdminNotFound(UserId),
    #[error("No checkout settings record found")]
    NoCheckoutSettings,
    #[error("Wrong order code inputted")]
    WrongOrderCode,
    #[error("Order has been marked as completed already")]
    OrderAlreadyCompleted,
    #[error("Order has been marked as cancelled already")]
    OrderAlreadyCancelled,
    #[error("Order is not completed yet")]
    OrderNotCompleted,
    #[error("You can't cancel an order that has been assigned to a rider")]
    RiderAlreadyAssigned,
    #[error("User {0} is not allowed to modify this order")]
    NotOrderParticipant(UserId),
    #[error("Withdrawal request {0} not found")]
    WithdrawalNotFound(WithdrawalId),
    #[error("Withdrawal request {0} is not in a state that allows this action")]
    WithdrawalStateConflict(WithdrawalId),
    #[error("Insufficient wallet balance. Balance: {balance}, required: {required}")]
    InsufficientBalance { balance: Kobo, required: Kobo },
    #[error("Could not settle order. {0}")]
    FeeError(#[from] FeeError),
}

/// SQLite result codes for a lock conflict: `SQLITE_BUSY` and `SQLITE_LOCKED`, plus their extended forms.
const SQLITE_LOCK_CODES: [&str; 6] = ["5", "6", "261", "262", "517", "773"];

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        let busy = e
            .as_database_error()
            .and_then(|db_err| db_err.code())
            .is_some_and(|code| SQLITE_LOCK_CODES.contains(&code.as_ref()));
        if busy {
            LedgerError::Busy(e.to_string())
        } else {
            LedgerError::DatabaseError(e.to_string())
        }
    }
}

impl LedgerError {
    /// True if the failed transaction left nothing behind and may succeed when run again.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Busy(_))
    }
}

impl From<sqlx::migrate::MigrateError> for LedgerError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        LedgerError::DatabaseError(format!("Migration failed: {e}"))
    }
}
