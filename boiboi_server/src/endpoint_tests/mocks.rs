use boiboi_engine::{
    db_types::{
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
        NewWithdrawalBank,
        NewWithdrawalRequest,
        Order,
        OrderId,
        OrderStatusType,
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
        WithdrawalStatus,
    },
    fees::FeePolicy,
    traits::{CardCharge, GatewayError, PaymentGateway, TransferDetails, TransferReceipt, VerifiedCard},
    AccountManagement,
    Cancellation,
    LedgerError,
    MarketplaceDatabase,
    OrderQueryFilter,
    RatingSubject,
    Settlement,
    TopUpResult,
    WithdrawalFilter,
};
use chrono::{DateTime, Utc};
use mockall::mock;
use serde_json::Value;

pub const CUSTOMER_ID: &str = "65f0a1b2c3d4e5f6a7b8c9d0";
pub const MERCHANT_ID: &str = "65f0a1b2c3d4e5f6a7b8c9e0";
pub const RIDER_ID: &str = "65f0a1b2c3d4e5f6a7b8c9f0";
pub const STORE_ID: &str = "65f0a1b2c3d4e5f6a7b8c9d1";
pub const ORDER_ID: &str = "65f0a1b2c3d4e5f6a7b8ca00";

mock! {
    pub Ledger {}

    impl Clone for Ledger {
        fn clone(&self) -> Self;
    }

    impl AccountManagement for Ledger {
        async fn fetch_user(&self, user_id: &UserId) -> Result<Option<User>, LedgerError>;
        async fn fetch_user_by_email(&self, email: &str) -> Result<Option<User>, LedgerError>;
        async fn fetch_users_by_role(&self, role: UserRole) -> Result<Vec<User>, LedgerError>;
        async fn fetch_store(&self, store_id: &StoreId) -> Result<Option<Store>, LedgerError>;
        async fn fetch_store_admin(&self, store_id: &StoreId) -> Result<Option<User>, LedgerError>;
        async fn fetch_cart(&self, cart_id: &CartId) -> Result<Option<Cart>, LedgerError>;
        async fn fetch_active_stores(&self) -> Result<Vec<Store>, LedgerError>;
        async fn fetch_delivery_service(&self, id: &DeliveryServiceId) -> Result<Option<DeliveryService>, LedgerError>;
        async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, LedgerError>;
        async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, LedgerError>;
        async fn fetch_cards(&self, user_id: &UserId) -> Result<Vec<Card>, LedgerError>;
        async fn fetch_active_bank(&self, user_id: &UserId) -> Result<Option<WithdrawalBank>, LedgerError>;
        async fn fetch_wallet_transactions(&self, user_id: &UserId) -> Result<Vec<WalletTransaction>, LedgerError>;
        async fn fetch_withdrawal_request(&self, id: &WithdrawalId) -> Result<Option<WithdrawalRequest>, LedgerError>;
        async fn fetch_withdrawal_requests(&self, filter: WithdrawalFilter) -> Result<Vec<WithdrawalRequest>, LedgerError>;
        async fn fetch_due_withdrawals(&self, created_before: DateTime<Utc>, now: DateTime<Utc>) -> Result<Vec<WithdrawalRequest>, LedgerError>;
        async fn fetch_device_tokens(&self, user_id: &UserId) -> Result<Vec<DeviceToken>, LedgerError>;
        async fn fetch_recent_ratings(&self, subject: &RatingSubject, limit: i64) -> Result<Vec<Option<i64>>, LedgerError>;
        async fn fetch_rider_rating(&self, user_id: &UserId) -> Result<Option<RiderRating>, LedgerError>;
        async fn fetch_checkout_settings(&self) -> Result<Option<CheckoutSettings>, LedgerError>;
        async fn fetch_platform_account(&self) -> Result<PlatformAccount, LedgerError>;
    }

    impl MarketplaceDatabase for Ledger {
        fn url(&self) -> &str;
        async fn insert_order(&self, order: NewOrder) -> Result<Order, LedgerError>;
        async fn update_order_progress<'a>(&self, order_id: &OrderId, status: ProgressStatus, rider: Option<&'a UserId>) -> Result<Order, LedgerError>;
        async fn complete_order(&self, order_id: &OrderId, code: &str, policy: &dyn FeePolicy) -> Result<Settlement, LedgerError>;
        async fn cancel_order(&self, order_id: &OrderId, acting_user: &UserId) -> Result<Cancellation, LedgerError>;
        async fn rate_order(&self, order_id: &OrderId, customer: &UserId, rider_rating: Option<i64>, vendor_rating: Option<i64>) -> Result<Order, LedgerError>;
        async fn credit_wallet_top_up(&self, email: &str, amount: Kobo, reference: &str) -> Result<TopUpResult, LedgerError>;
        async fn insert_card(&self, user_id: &UserId, card: NewCard) -> Result<Card, LedgerError>;
        async fn insert_withdrawal_bank(&self, user_id: &UserId, bank: NewWithdrawalBank) -> Result<WithdrawalBank, LedgerError>;
        async fn upsert_device_token(&self, user_id: &UserId, token: &str, device_type: &str) -> Result<DeviceToken, LedgerError>;
        async fn delete_device_token(&self, token: &str) -> Result<(), LedgerError>;
        async fn insert_withdrawal_request(&self, request: NewWithdrawalRequest) -> Result<WithdrawalRequest, LedgerError>;
        async fn complete_withdrawal(&self, id: &WithdrawalId, reference: &str) -> Result<WalletTransaction, LedgerError>;
        async fn record_withdrawal_failure(&self, id: &WithdrawalId, error: &str, retry: WithdrawalRetry) -> Result<WithdrawalRequest, LedgerError>;
        async fn requeue_withdrawal(&self, id: &WithdrawalId) -> Result<WithdrawalRequest, LedgerError>;
        async fn upsert_rider_rating(&self, user_id: &UserId, value: f64, at: DateTime<Utc>) -> Result<(), LedgerError>;
        async fn update_store_rating(&self, store_id: &StoreId, value: f64) -> Result<(), LedgerError>;
        async fn update_checkout_settings(&self, settings: CheckoutSettings) -> Result<CheckoutSettings, LedgerError>;
    }
}

mock! {
    pub Gateway {}

    impl Clone for Gateway {
        fn clone(&self) -> Self;
    }

    impl PaymentGateway for Gateway {
        async fn charge_saved_card(&self, email: &str, authorization_code: &str, amount: Kobo, metadata: Value) -> Result<CardCharge, GatewayError>;
        async fn initiate_transfer(&self, recipient_code: &str, amount: Kobo, reference: &str) -> Result<TransferReceipt, GatewayError>;
        async fn fetch_transfer(&self, transfer_id: i64) -> Result<TransferDetails, GatewayError>;
        async fn verify_transaction(&self, reference: &str) -> Result<VerifiedCard, GatewayError>;
        async fn create_transfer_recipient(&self, name: &str, account_number: &str, bank_code: &str) -> Result<String, GatewayError>;
    }
}

pub fn id<T: std::str::FromStr>(s: &str) -> T
where T::Err: std::fmt::Debug {
    s.parse().unwrap()
}

pub fn user(id_str: &str, role: UserRole) -> User {
    let now = Utc::now();
    User {
        id: id(id_str),
        role,
        status: AccountStatus::Active,
        is_admin: role == UserRole::Merchant,
        first_name: "Ada".into(),
        email: "ada@example.com".into(),
        store_id: (role == UserRole::Merchant).then(|| id(STORE_ID)),
        delivery_service_id: None,
        current_cart_id: None,
        has_wallet: true,
        wallet_balance: Kobo::from_naira(10_000),
        p2p_balance: Kobo::default(),
        created_at: now,
        updated_at: now,
    }
}

pub fn order() -> Order {
    let now = Utc::now();
    Order {
        id: id(ORDER_ID),
        cart_id: CartId::random(),
        customer_id: id(CUSTOMER_ID),
        store_id: id(STORE_ID),
        rider_id: None,
        code: "4821".into(),
        status: OrderStatusType::Ongoing,
        progress_status: ProgressStatus::OrderReceivedByVendor,
        price: Kobo::from_naira(2_500),
        delivery_fee: Kobo::from_naira(500),
        service_charge: Kobo::from_naira(100),
        coupon_price: Kobo::default(),
        is_paid_for: true,
        order_transaction_id: "T_order_1".into(),
        delivery_location: "12 Allen Avenue, Ikeja".into(),
        delivery_instruction: None,
        rider_rating: None,
        vendor_rating: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn top_up(reference: &str, amount: Kobo) -> WalletTransaction {
    WalletTransaction {
        id: "1".into(),
        payment_reference: reference.into(),
        user_id: id(CUSTOMER_ID),
        amount,
        tx_type: TransactionType::Credit,
        created_at: Utc::now(),
    }
}

pub fn withdrawal_request(amount: Kobo, created_at: DateTime<Utc>) -> WithdrawalRequest {
    WithdrawalRequest {
        id: id("65f0a1b2c3d4e5f6a7b8cb00"),
        user_id: id(RIDER_ID),
        amount,
        request_type: UserRole::Rider,
        status: WithdrawalStatus::Pending,
        attempts: 0,
        next_attempt_at: None,
        last_error: None,
        created_at,
        updated_at: created_at,
    }
}

pub fn bank_account() -> WithdrawalBank {
    WithdrawalBank {
        id: 1,
        user_id: id(RIDER_ID),
        name: "Ada Obi".into(),
        bank_name: "Access Bank".into(),
        account_number: "0123456789".into(),
        recipient_code: "RCP_2x5j67tnnw1t98k".into(),
        is_active: true,
        created_at: Utc::now(),
    }
}
