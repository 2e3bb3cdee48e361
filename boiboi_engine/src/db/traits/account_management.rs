use chrono::{DateTime, Utc};

use crate::{
    db::traits::{LedgerError, OrderQueryFilter, RatingSubject, WithdrawalFilter},
    db_types::{
        Card,
        Cart,
        CartId,
        CheckoutSettings,
        DeliveryService,
        DeliveryServiceId,
        DeviceToken,
        Order,
        OrderId,
        PlatformAccount,
        RiderRating,
        Store,
        StoreId,
        User,
        UserId,
        UserRole,
        WalletTransaction,
        WithdrawalBank,
        WithdrawalId,
        WithdrawalRequest,
    },
};

/// Read-only queries against the Ledger Store.
///
/// Nothing in this trait mutates state, so implementations can serve these from any connection without opening a
/// transaction. The mutating counterpart is [`crate::MarketplaceDatabase`].
#[allow(async_fn_in_trait)]
pub trait AccountManagement {
    async fn fetch_user(&self, user_id: &UserId) -> Result<Option<User>, LedgerError>;

    async fn fetch_user_by_email(&self, email: &str) -> Result<Option<User>, LedgerError>;

    /// All active users with the given role. Used to broadcast new orders to riders.
    async fn fetch_users_by_role(&self, role: UserRole) -> Result<Vec<User>, LedgerError>;

    async fn fetch_store(&self, store_id: &StoreId) -> Result<Option<Store>, LedgerError>;

    /// The merchant user that administers the given store.
    async fn fetch_store_admin(&self, store_id: &StoreId) -> Result<Option<User>, LedgerError>;

    async fn fetch_active_stores(&self) -> Result<Vec<Store>, LedgerError>;

    async fn fetch_delivery_service(&self, id: &DeliveryServiceId) -> Result<Option<DeliveryService>, LedgerError>;

    async fn fetch_cart(&self, cart_id: &CartId) -> Result<Option<Cart>, LedgerError>;

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, LedgerError>;

    /// Orders matching the filter, newest first.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, LedgerError>;

    async fn fetch_cards(&self, user_id: &UserId) -> Result<Vec<Card>, LedgerError>;

    async fn fetch_active_bank(&self, user_id: &UserId) -> Result<Option<WithdrawalBank>, LedgerError>;

    /// Wallet transactions for the user, newest first.
    async fn fetch_wallet_transactions(&self, user_id: &UserId) -> Result<Vec<WalletTransaction>, LedgerError>;

    async fn fetch_withdrawal_request(&self, id: &WithdrawalId) -> Result<Option<WithdrawalRequest>, LedgerError>;

    async fn fetch_withdrawal_requests(&self, filter: WithdrawalFilter) -> Result<Vec<WithdrawalRequest>, LedgerError>;

    /// Pending withdrawal requests created at or before `created_before` whose next attempt is due at `now`.
    async fn fetch_due_withdrawals(
        &self,
        created_before: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<WithdrawalRequest>, LedgerError>;

    async fn fetch_device_tokens(&self, user_id: &UserId) -> Result<Vec<DeviceToken>, LedgerError>;

    /// The rating values (possibly null) of the `limit` most recently completed orders for the subject.
    async fn fetch_recent_ratings(&self, subject: &RatingSubject, limit: i64)
        -> Result<Vec<Option<i64>>, LedgerError>;

    async fn fetch_rider_rating(&self, user_id: &UserId) -> Result<Option<RiderRating>, LedgerError>;

    async fn fetch_checkout_settings(&self) -> Result<Option<CheckoutSettings>, LedgerError>;

    async fn fetch_platform_account(&self) -> Result<PlatformAccount, LedgerError>;
}
