use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqlitePool;

use super::{db_url, new_pool, orders, retry_on_busy, run_migrations, stores, users, wallet, withdrawals};
use crate::{
    db::traits::{
        AccountManagement,
        Cancellation,
        LedgerError,
        MarketplaceDatabase,
        OrderQueryFilter,
        RatingSubject,
        RiderPayout,
        Settlement,
        TopUpResult,
        WithdrawalFilter,
    },
    db_types::{
        new_payment_reference,
        AccountStatus,
        Card,
        Cart,
        CartId,
        CheckoutSettings,
        DeliveryService,
        DeliveryServiceId,
        DeviceToken,
        Kobo,
        NewCard,
        NewOrder,
        NewUser,
        NewWithdrawalBank,
        NewWithdrawalRequest,
        Order,
        OrderId,
        OrderStatusType,
        PaymentMethod,
        PlatformAccount,
        ProgressStatus,
        RiderRating,
        Store,
        StoreId,
        TransactionType,
        User,
        UserId,
        UserRole,
        WalletTransaction,
        WithdrawalBank,
        WithdrawalId,
        WithdrawalRequest,
        WithdrawalRetry,
        MINIMUM_WALLET_BALANCE,
    },
    fees::FeePolicy,
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({})", self.url)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `BB_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, LedgerError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    /// Connects to the database at `url`, creating the file if necessary, and brings the schema up to date.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, LedgerError> {
        let pool = new_pool(url, max_connections).await?;
        run_migrations(&pool).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    //------------------------------------  Provisioning  -------------------------------------------------------------
    // Account, store and fleet records are normally created by the signup and onboarding flows. These helpers are
    // used by the admin tooling and the test suites.

    pub async fn insert_user(&self, user: NewUser) -> Result<User, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        users::insert_user(user, &mut conn).await
    }

    pub async fn insert_store(&self, name: &str, status: AccountStatus) -> Result<Store, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        stores::insert_store(name, status, &mut conn).await
    }

    pub async fn insert_delivery_service(
        &self,
        name: &str,
        signup_code: &str,
        admin: Option<&UserId>,
    ) -> Result<DeliveryService, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        stores::insert_delivery_service(name, signup_code, admin, &mut conn).await
    }

    pub async fn set_delivery_service_admin(&self, id: &DeliveryServiceId, admin: &UserId) -> Result<(), LedgerError> {
        let mut conn = self.pool.acquire().await?;
        stores::set_delivery_service_admin(id, admin, &mut conn).await
    }

    /// Opens a new cart for the user and makes it their current cart.
    pub async fn insert_cart(&self, user_id: &UserId) -> Result<Cart, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let cart = stores::insert_cart(user_id, &mut tx).await?;
        tx.commit().await?;
        Ok(cart)
    }

    /// Works out where the rider's share of a settled order goes.
    async fn rider_payout_target(
        order: &Order,
        conn: &mut sqlx::SqliteConnection,
    ) -> Result<RiderPayout, LedgerError> {
        let rider_id = order.rider_id.clone().ok_or_else(|| LedgerError::RiderNotAssigned(order.id.clone()))?;
        let rider = users::fetch_user(&rider_id, &mut *conn)
            .await?
            .ok_or_else(|| LedgerError::RiderNotFound(rider_id.clone()))?;
        let service_id =
            rider.delivery_service_id.ok_or_else(|| LedgerError::DeliveryServiceNotFound(rider_id.clone()))?;
        let service = stores::fetch_delivery_service(&service_id, &mut *conn)
            .await?
            .ok_or_else(|| LedgerError::DeliveryServiceNotFound(rider_id.clone()))?;
        if service.is_in_house() {
            return Ok(RiderPayout::RiderP2pBalance(rider_id));
        }
        let admin_id = service.admin_user_id.ok_or_else(|| LedgerError::DeliveryAdminNotFound(rider_id.clone()))?;
        match users::fetch_user(&admin_id, conn).await? {
            Some(admin) => Ok(RiderPayout::DeliveryServiceAdmin(admin.id)),
            None => Err(LedgerError::DeliveryAdminNotFound(rider_id)),
        }
    }

    //------------------------------------  Ledger transactions  ------------------------------------------------------
    // Each of these runs in a single transaction. The trait methods wrap them in `retry_on_busy`.

    async fn try_insert_order(&self, order: NewOrder) -> Result<Order, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let customer_id = order.customer_id.clone();
        let cart_id = order.cart_id.clone();
        let price = order.price;
        let method = order.method;
        let reference = order.payment_reference.clone();
        stores::claim_cart(&cart_id, &customer_id, &mut tx).await?;
        if method == PaymentMethod::Wallet {
            users::debit_wallet_above_floor(&customer_id, price, MINIMUM_WALLET_BALANCE, &mut tx).await?;
            wallet::insert_wallet_transaction(&customer_id, price, TransactionType::Debit, &reference, &mut tx).await?;
        }
        let order = orders::insert_order(order, &mut tx).await?;
        users::clear_current_cart(&customer_id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} ({method}, {price}) has been saved in the DB", order.id);
        Ok(order)
    }

    async fn try_update_order_progress(
        &self,
        order_id: &OrderId,
        status: ProgressStatus,
        rider: Option<&UserId>,
    ) -> Result<Order, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::update_progress(order_id, status, rider, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn try_complete_order(
        &self,
        order_id: &OrderId,
        code: &str,
        policy: &dyn FeePolicy,
    ) -> Result<Settlement, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let order =
            orders::fetch_order(order_id, &mut tx).await?.ok_or_else(|| LedgerError::OrderNotFound(order_id.clone()))?;
        if order.code != code.trim() {
            return Err(LedgerError::WrongOrderCode);
        }
        match order.status {
            OrderStatusType::Completed => return Err(LedgerError::OrderAlreadyCompleted),
            OrderStatusType::Cancelled => return Err(LedgerError::OrderAlreadyCancelled),
            OrderStatusType::Ongoing => {},
        }
        let settings = wallet::fetch_checkout_settings(&mut tx).await?.ok_or(LedgerError::NoCheckoutSettings)?;
        let split = policy.split(order.price, order.delivery_fee, &settings)?;
        trace!("🗃️ Fee split for order {order_id} using the {} policy: {split:?}", policy.name());

        let store_admin = users::fetch_store_admin(&order.store_id, &mut tx)
            .await?
            .ok_or_else(|| LedgerError::StoreAdminNotFound(order.store_id.clone()))?;
        users::adjust_wallet_balance(&store_admin.id, split.to_store, &mut tx).await?;
        let store_ref = new_payment_reference();
        wallet::insert_wallet_transaction(&store_admin.id, split.to_store, TransactionType::Credit, &store_ref, &mut tx)
            .await?;

        let rider_payout = Self::rider_payout_target(&order, &mut tx).await?;
        let rider_ref = new_payment_reference();
        let beneficiary = match &rider_payout {
            RiderPayout::RiderP2pBalance(rider_id) => {
                users::adjust_p2p_balance(rider_id, split.to_rider, &mut tx).await?;
                rider_id
            },
            RiderPayout::DeliveryServiceAdmin(admin_id) => {
                users::adjust_wallet_balance(admin_id, split.to_rider, &mut tx).await?;
                admin_id
            },
        };
        wallet::insert_wallet_transaction(beneficiary, split.to_rider, TransactionType::Credit, &rider_ref, &mut tx)
            .await?;

        wallet::credit_platform(split.to_platform, &mut tx).await?;
        let order = orders::finalize_order(order_id, OrderStatusType::Completed, &mut tx).await?;
        tx.commit().await?;
        debug!(
            "🗃️ Order {order_id} settled. Store: {}, rider: {}, platform: {}",
            split.to_store, split.to_rider, split.to_platform
        );
        Ok(Settlement { order, split, store_admin: store_admin.id, rider_payout })
    }

    async fn try_cancel_order(&self, order_id: &OrderId, acting_user: &UserId) -> Result<Cancellation, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let order =
            orders::fetch_order(order_id, &mut tx).await?.ok_or_else(|| LedgerError::OrderNotFound(order_id.clone()))?;
        match order.status {
            OrderStatusType::Completed => return Err(LedgerError::OrderAlreadyCompleted),
            OrderStatusType::Cancelled => return Err(LedgerError::OrderAlreadyCancelled),
            OrderStatusType::Ongoing => {},
        }
        if &order.customer_id != acting_user {
            let store_admin = users::fetch_store_admin(&order.store_id, &mut tx).await?;
            if store_admin.map_or(true, |u| &u.id != acting_user) {
                return Err(LedgerError::NotOrderParticipant(acting_user.clone()));
            }
        }
        if order.rider_id.is_some() {
            return Err(LedgerError::RiderAlreadyAssigned);
        }
        let order = orders::finalize_order(order_id, OrderStatusType::Cancelled, &mut tx).await?;
        users::adjust_wallet_balance(&order.customer_id, order.price, &mut tx).await?;
        let reference = new_payment_reference();
        let refund =
            wallet::insert_wallet_transaction(&order.customer_id, order.price, TransactionType::Credit, &reference, &mut tx)
                .await?;
        tx.commit().await?;
        debug!("🗃️ Order {order_id} cancelled. {} refunded to {}", order.price, order.customer_id);
        Ok(Cancellation { order, refund })
    }

    async fn try_credit_wallet_top_up(
        &self,
        email: &str,
        amount: Kobo,
        reference: &str,
    ) -> Result<TopUpResult, LedgerError> {
        let mut tx = self.pool.begin().await?;
        if wallet::reference_exists(reference, &mut tx).await? {
            debug!("🗃️ Top-up {reference} has already been applied. Ignoring");
            return Ok(TopUpResult::AlreadyApplied(reference.to_string()));
        }
        let user = users::fetch_user_by_email(email, &mut tx)
            .await?
            .ok_or_else(|| LedgerError::EmailNotFound(email.to_string()))?;
        users::adjust_wallet_balance(&user.id, amount, &mut tx).await?;
        let entry = wallet::insert_wallet_transaction(&user.id, amount, TransactionType::Credit, reference, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Wallet of {} topped up with {amount}", user.id);
        Ok(TopUpResult::Credited(entry))
    }
}

impl MarketplaceDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, LedgerError> {
        retry_on_busy("Order checkout", || self.try_insert_order(order.clone())).await
    }

    async fn update_order_progress(
        &self,
        order_id: &OrderId,
        status: ProgressStatus,
        rider: Option<&UserId>,
    ) -> Result<Order, LedgerError> {
        retry_on_busy("Order progress update", || self.try_update_order_progress(order_id, status, rider)).await
    }

    async fn complete_order(
        &self,
        order_id: &OrderId,
        code: &str,
        policy: &dyn FeePolicy,
    ) -> Result<Settlement, LedgerError> {
        retry_on_busy("Order settlement", || self.try_complete_order(order_id, code, policy)).await
    }

    async fn cancel_order(&self, order_id: &OrderId, acting_user: &UserId) -> Result<Cancellation, LedgerError> {
        retry_on_busy("Order cancellation", || self.try_cancel_order(order_id, acting_user)).await
    }

    async fn rate_order(
        &self,
        order_id: &OrderId,
        customer: &UserId,
        rider_rating: Option<i64>,
        vendor_rating: Option<i64>,
    ) -> Result<Order, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let order =
            orders::fetch_order(order_id, &mut tx).await?.ok_or_else(|| LedgerError::OrderNotFound(order_id.clone()))?;
        if &order.customer_id != customer {
            return Err(LedgerError::NotOrderParticipant(customer.clone()));
        }
        if order.status != OrderStatusType::Completed {
            return Err(LedgerError::OrderNotCompleted);
        }
        let order = orders::update_ratings(order_id, rider_rating, vendor_rating, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn credit_wallet_top_up(
        &self,
        email: &str,
        amount: Kobo,
        reference: &str,
    ) -> Result<TopUpResult, LedgerError> {
        retry_on_busy("Wallet top-up", || self.try_credit_wallet_top_up(email, amount, reference)).await
    }

    async fn insert_card(&self, user_id: &UserId, card: NewCard) -> Result<Card, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let card = users::insert_card(user_id, card, &mut tx).await?;
        tx.commit().await?;
        Ok(card)
    }

    async fn insert_withdrawal_bank(
        &self,
        user_id: &UserId,
        bank: NewWithdrawalBank,
    ) -> Result<WithdrawalBank, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let bank = users::insert_withdrawal_bank(user_id, bank, &mut tx).await?;
        tx.commit().await?;
        Ok(bank)
    }

    async fn upsert_device_token(
        &self,
        user_id: &UserId,
        token: &str,
        device_type: &str,
    ) -> Result<DeviceToken, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        users::upsert_device_token(user_id, token, device_type, &mut conn).await
    }

    async fn delete_device_token(&self, token: &str) -> Result<(), LedgerError> {
        let mut conn = self.pool.acquire().await?;
        users::delete_device_token(token, &mut conn).await
    }

    async fn insert_withdrawal_request(
        &self,
        request: NewWithdrawalRequest,
    ) -> Result<WithdrawalRequest, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        withdrawals::insert_withdrawal_request(request, &mut conn).await
    }

    async fn complete_withdrawal(&self, id: &WithdrawalId, reference: &str) -> Result<WalletTransaction, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let request = withdrawals::mark_processed(id, &mut tx).await?;
        users::adjust_wallet_balance(&request.user_id, -request.amount, &mut tx).await?;
        let entry =
            wallet::insert_wallet_transaction(&request.user_id, request.amount, TransactionType::Debit, reference, &mut tx)
                .await?;
        tx.commit().await?;
        debug!("🗃️ Withdrawal {id} of {} for {} marked as processed", request.amount, request.user_id);
        Ok(entry)
    }

    async fn record_withdrawal_failure(
        &self,
        id: &WithdrawalId,
        error: &str,
        retry: WithdrawalRetry,
    ) -> Result<WithdrawalRequest, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        withdrawals::record_failure(id, error, retry, &mut conn).await
    }

    async fn requeue_withdrawal(&self, id: &WithdrawalId) -> Result<WithdrawalRequest, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        withdrawals::requeue(id, &mut conn).await
    }

    async fn upsert_rider_rating(&self, user_id: &UserId, value: f64, at: DateTime<Utc>) -> Result<(), LedgerError> {
        let mut conn = self.pool.acquire().await?;
        wallet::upsert_rider_rating(user_id, value, at, &mut conn).await
    }

    async fn update_store_rating(&self, store_id: &StoreId, value: f64) -> Result<(), LedgerError> {
        let mut conn = self.pool.acquire().await?;
        stores::update_store_rating(store_id, value, &mut conn).await
    }

    async fn update_checkout_settings(&self, settings: CheckoutSettings) -> Result<CheckoutSettings, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        wallet::upsert_checkout_settings(settings, &mut conn).await
    }

    async fn close(&mut self) -> Result<(), LedgerError> {
        self.pool.close().await;
        Ok(())
    }
}

impl AccountManagement for SqliteDatabase {
    async fn fetch_user(&self, user_id: &UserId) -> Result<Option<User>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_user(user_id, &mut conn).await
    }

    async fn fetch_user_by_email(&self, email: &str) -> Result<Option<User>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_user_by_email(email, &mut conn).await
    }

    async fn fetch_users_by_role(&self, role: UserRole) -> Result<Vec<User>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_users_by_role(role, &mut conn).await
    }

    async fn fetch_store(&self, store_id: &StoreId) -> Result<Option<Store>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        stores::fetch_store(store_id, &mut conn).await
    }

    async fn fetch_cart(&self, cart_id: &CartId) -> Result<Option<Cart>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        stores::fetch_cart(cart_id, &mut conn).await
    }

    async fn fetch_store_admin(&self, store_id: &StoreId) -> Result<Option<User>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_store_admin(store_id, &mut conn).await
    }

    async fn fetch_active_stores(&self) -> Result<Vec<Store>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        stores::fetch_active_stores(&mut conn).await
    }

    async fn fetch_delivery_service(&self, id: &DeliveryServiceId) -> Result<Option<DeliveryService>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        stores::fetch_delivery_service(id, &mut conn).await
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(order_id, &mut conn).await
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        orders::search_orders(query, &mut conn).await
    }

    async fn fetch_cards(&self, user_id: &UserId) -> Result<Vec<Card>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_cards(user_id, &mut conn).await
    }

    async fn fetch_active_bank(&self, user_id: &UserId) -> Result<Option<WithdrawalBank>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_active_bank(user_id, &mut conn).await
    }

    async fn fetch_wallet_transactions(&self, user_id: &UserId) -> Result<Vec<WalletTransaction>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        wallet::fetch_wallet_transactions(user_id, &mut conn).await
    }

    async fn fetch_withdrawal_request(&self, id: &WithdrawalId) -> Result<Option<WithdrawalRequest>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        withdrawals::fetch_withdrawal_request(id, &mut conn).await
    }

    async fn fetch_withdrawal_requests(&self, filter: WithdrawalFilter) -> Result<Vec<WithdrawalRequest>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        withdrawals::fetch_withdrawal_requests(filter, &mut conn).await
    }

    async fn fetch_due_withdrawals(
        &self,
        created_before: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<WithdrawalRequest>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        withdrawals::fetch_due_withdrawals(created_before, now, &mut conn).await
    }

    async fn fetch_device_tokens(&self, user_id: &UserId) -> Result<Vec<DeviceToken>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_device_tokens(user_id, &mut conn).await
    }

    async fn fetch_recent_ratings(
        &self,
        subject: &RatingSubject,
        limit: i64,
    ) -> Result<Vec<Option<i64>>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_recent_ratings(subject, limit, &mut conn).await
    }

    async fn fetch_rider_rating(&self, user_id: &UserId) -> Result<Option<RiderRating>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        wallet::fetch_rider_rating(user_id, &mut conn).await
    }

    async fn fetch_checkout_settings(&self) -> Result<Option<CheckoutSettings>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        wallet::fetch_checkout_settings(&mut conn).await
    }

    async fn fetch_platform_account(&self) -> Result<PlatformAccount, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        wallet::fetch_platform_account(&mut conn).await
    }
}
