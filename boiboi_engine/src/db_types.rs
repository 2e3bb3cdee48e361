//! Data types shared by the Ledger Store backends and the engine APIs.
use std::{fmt::Display, str::FromStr};

pub use boiboi_common::Kobo;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

/// Signup code of the platform's own rider fleet. Riders in this fleet are paid into their p2p balance directly.
pub const IN_HOUSE_FLEET_CODE: &str = "BBP2P";

/// The least a customer's wallet may hold after paying for an order.
pub const MINIMUM_WALLET_BALANCE: Kobo = Kobo::from_naira(100);

const OBJECT_ID_LEN: usize = 24;
const PAYMENT_REFERENCE_LEN: usize = 10;
const REFERENCE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ConversionError(String);

/// Generates a fresh random payment reference, e.g. for wallet debits and refunds.
pub fn new_payment_reference() -> String {
    let mut rng = rand::thread_rng();
    (0..PAYMENT_REFERENCE_LEN)
        .map(|_| REFERENCE_CHARSET[rng.gen_range(0..REFERENCE_CHARSET.len())] as char)
        .collect()
}

/// A random 24-character hex id, used for records that have no typed id.
pub fn new_object_id() -> String {
    let bytes: [u8; OBJECT_ID_LEN / 2] = rand::random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

macro_rules! object_id {
    ($name:ident, $label:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
        #[sqlx(transparent)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn random() -> Self {
                Self(new_object_id())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = ConversionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                if s.len() == OBJECT_ID_LEN && s.chars().all(|c| c.is_ascii_hexdigit()) {
                    Ok(Self(s.to_ascii_lowercase()))
                } else {
                    Err(ConversionError(format!("Invalid {} id: {s}", $label)))
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

object_id!(UserId, "user");
object_id!(StoreId, "store");
object_id!(OrderId, "order");
object_id!(CartId, "cart");
object_id!(DeliveryServiceId, "delivery service");
object_id!(WithdrawalId, "withdrawal");
object_id!(CardId, "card");

/// Implements `Display` and `FromStr` for a fieldless enum, using the same string values as its serde and sqlx
/// representations.
macro_rules! string_enum {
    ($name:ident, $label:literal, { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($s),)+
                }
            }
        }

        impl FromStr for $name {
            type Err = ConversionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant),)+
                    s => Err(ConversionError(format!("Invalid {}: {s}", $label))),
                }
            }
        }
    };
}

//--------------------------------------      UserRole       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Customer,
    Merchant,
    Rider,
}

string_enum!(UserRole, "user role", { Customer => "customer", Merchant => "merchant", Rider => "rider" });

//--------------------------------------    AccountStatus    ---------------------------------------------------------
/// Lifecycle status shared by users and stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Pending,
    Active,
    Disabled,
}

string_enum!(AccountStatus, "account status", { Pending => "pending", Active => "active", Disabled => "disabled" });

//--------------------------------------   OrderStatusType   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatusType {
    /// The order has been paid for and is being fulfilled.
    Ongoing,
    /// The order was delivered and settled. Terminal.
    Completed,
    /// The order was cancelled and refunded. Terminal.
    Cancelled,
}

string_enum!(OrderStatusType, "order status", {
    Ongoing => "ongoing",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Ongoing)
    }
}

//--------------------------------------   ProgressStatus    ---------------------------------------------------------
/// The delivery sub-state of an ongoing order, in the order they are expected to occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum ProgressStatus {
    OrderCreated,
    OrderReceivedByVendor,
    OrderAcceptedByRider,
    RiderAtVendor,
    RiderOnHisWay,
    RiderAtUserLocation,
}

string_enum!(ProgressStatus, "order progress status", {
    OrderCreated => "orderCreated",
    OrderReceivedByVendor => "orderReceivedByVendor",
    OrderAcceptedByRider => "orderAcceptedByRider",
    RiderAtVendor => "riderAtVendor",
    RiderOnHisWay => "riderOnHisWay",
    RiderAtUserLocation => "riderAtUserLocation",
});

impl ProgressStatus {
    pub const ALL: [ProgressStatus; 6] = [
        Self::OrderCreated,
        Self::OrderReceivedByVendor,
        Self::OrderAcceptedByRider,
        Self::RiderAtVendor,
        Self::RiderOnHisWay,
        Self::RiderAtUserLocation,
    ];
}

//--------------------------------------   TransactionType   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Debit,
    Credit,
}

string_enum!(TransactionType, "transaction type", { Debit => "debit", Credit => "credit" });

//--------------------------------------  WithdrawalStatus   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum WithdrawalStatus {
    Pending,
    Processed,
    /// Gave up after too many failed payout attempts. Only an admin can requeue it.
    DeadLetter,
}

string_enum!(WithdrawalStatus, "withdrawal status", {
    Pending => "pending",
    Processed => "processed",
    DeadLetter => "deadLetter",
});

//--------------------------------------    PaymentMethod    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Wallet,
}

string_enum!(PaymentMethod, "checkout type", { Card => "card", Wallet => "wallet" });

//--------------------------------------        User         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub role: UserRole,
    pub status: AccountStatus,
    pub is_admin: bool,
    pub first_name: String,
    pub email: String,
    pub store_id: Option<StoreId>,
    pub delivery_service_id: Option<DeliveryServiceId>,
    pub current_cart_id: Option<CartId>,
    /// True once the user's wallet (virtual account) has been provisioned.
    pub has_wallet: bool,
    pub wallet_balance: Kobo,
    pub p2p_balance: Kobo,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Account provisioning record. Accounts are normally created by the signup flow.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: UserId,
    pub role: UserRole,
    pub status: AccountStatus,
    pub is_admin: bool,
    pub first_name: String,
    pub email: String,
    pub store_id: Option<StoreId>,
    pub delivery_service_id: Option<DeliveryServiceId>,
    pub current_cart_id: Option<CartId>,
    pub has_wallet: bool,
    pub wallet_balance: Kobo,
}

impl NewUser {
    pub fn new(role: UserRole, first_name: &str, email: &str) -> Self {
        Self {
            id: UserId::random(),
            role,
            status: AccountStatus::Active,
            is_admin: false,
            first_name: first_name.to_string(),
            email: email.to_string(),
            store_id: None,
            delivery_service_id: None,
            current_cart_id: None,
            has_wallet: true,
            wallet_balance: Kobo::default(),
        }
    }

    pub fn with_balance(mut self, balance: Kobo) -> Self {
        self.wallet_balance = balance;
        self
    }

    pub fn with_store(mut self, store_id: StoreId) -> Self {
        self.store_id = Some(store_id);
        self
    }

    pub fn with_delivery_service(mut self, id: DeliveryServiceId) -> Self {
        self.delivery_service_id = Some(id);
        self
    }

    pub fn as_admin(mut self) -> Self {
        self.is_admin = true;
        self
    }

    pub fn without_wallet(mut self) -> Self {
        self.has_wallet = false;
        self
    }
}

//--------------------------------------        Store        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    pub description: String,
    pub status: AccountStatus,
    /// Rolling average of vendor ratings. Written only by the rating aggregator.
    pub rating: f64,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------   DeliveryService   ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryService {
    pub id: DeliveryServiceId,
    pub name: String,
    pub signup_code: String,
    pub admin_user_id: Option<UserId>,
}

impl DeliveryService {
    pub fn is_in_house(&self) -> bool {
        self.signup_code == IN_HOUSE_FLEET_CODE
    }
}

//--------------------------------------        Cart         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub is_completed: bool,
}

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub cart_id: CartId,
    pub customer_id: UserId,
    pub store_id: StoreId,
    pub rider_id: Option<UserId>,
    /// The pickup code the rider must present to complete the order
    pub code: String,
    pub status: OrderStatusType,
    pub progress_status: ProgressStatus,
    /// Gross amount paid by the customer
    pub price: Kobo,
    pub delivery_fee: Kobo,
    pub service_charge: Kobo,
    pub coupon_price: Kobo,
    pub is_paid_for: bool,
    pub order_transaction_id: String,
    pub delivery_location: String,
    pub delivery_instruction: Option<String>,
    pub rider_rating: Option<i64>,
    pub vendor_rating: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// The goods value of the order, i.e. everything except the delivery fee.
    pub fn subtotal(&self) -> Kobo {
        self.price - self.delivery_fee
    }
}

//--------------------------------------       NewOrder      ---------------------------------------------------------
/// Everything needed to create an order and its order transaction at checkout.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub cart_id: CartId,
    pub customer_id: UserId,
    pub store_id: StoreId,
    pub code: String,
    pub price: Kobo,
    pub delivery_fee: Kobo,
    pub service_charge: Kobo,
    pub coupon_price: Kobo,
    pub delivery_location: String,
    pub delivery_instruction: Option<String>,
    /// The gateway reference for card payments, or a generated reference for wallet payments
    pub payment_reference: String,
    pub method: PaymentMethod,
}

impl NewOrder {
    pub fn new(cart_id: CartId, customer_id: UserId, store_id: StoreId, price: Kobo, code: &str) -> Self {
        Self {
            cart_id,
            customer_id,
            store_id,
            code: code.to_string(),
            price,
            delivery_fee: Kobo::default(),
            service_charge: Kobo::default(),
            coupon_price: Kobo::default(),
            delivery_location: String::default(),
            delivery_instruction: None,
            payment_reference: new_payment_reference(),
            method: PaymentMethod::Wallet,
        }
    }
}

//--------------------------------------  OrderTransaction   ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTransaction {
    pub id: String,
    pub cart_id: CartId,
    pub customer_id: UserId,
    pub vendor_id: StoreId,
    pub total_price: Kobo,
    pub payment_reference: String,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------  WalletTransaction  ---------------------------------------------------------
/// An append-only ledger entry. Never updated after insert.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletTransaction {
    pub id: String,
    pub payment_reference: String,
    pub user_id: UserId,
    pub amount: Kobo,
    pub tx_type: TransactionType,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------  WithdrawalRequest  ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRequest {
    pub id: WithdrawalId,
    pub user_id: UserId,
    pub amount: Kobo,
    pub request_type: UserRole,
    pub status: WithdrawalStatus,
    pub attempts: i64,
    pub next_attempt_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewWithdrawalRequest {
    pub user_id: UserId,
    pub amount: Kobo,
    pub request_type: UserRole,
    pub created_at: DateTime<Utc>,
}

impl NewWithdrawalRequest {
    pub fn new(user_id: UserId, amount: Kobo, request_type: UserRole) -> Self {
        Self { user_id, amount, request_type, created_at: Utc::now() }
    }
}

/// What to do with a withdrawal request after a failed payout attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WithdrawalRetry {
    RetryAt(DateTime<Utc>),
    DeadLetter,
}

//--------------------------------------  Cards and banks    ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    pub user_id: UserId,
    #[serde(skip_serializing)]
    pub authorization_code: String,
    pub bank: String,
    pub card_type: String,
    pub is_selected: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCard {
    pub authorization_code: String,
    pub bank: String,
    pub card_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalBank {
    pub id: i64,
    pub user_id: UserId,
    pub name: String,
    pub bank_name: String,
    pub account_number: String,
    pub recipient_code: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewWithdrawalBank {
    pub name: String,
    pub bank_name: String,
    pub account_number: String,
    pub recipient_code: String,
}

//--------------------------------------     DeviceToken     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceToken {
    pub id: i64,
    pub user_id: UserId,
    pub token: String,
    pub device_type: String,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------  CheckoutSettings   ---------------------------------------------------------
/// Platform-wide settlement settings. Percentages are held in basis points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSettings {
    pub store_percent_bps: i64,
    pub platform_percent_bps: i64,
}

//--------------------------------------   PlatformAccount   ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformAccount {
    pub balance: Kobo,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------     RiderRating     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiderRating {
    pub user_id: UserId,
    pub value: f64,
    pub updated_at: DateTime<Utc>,
}
