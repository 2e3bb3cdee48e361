use std::fmt::Display;

use boiboi_engine::{
    db_types::{Kobo, OrderStatusType, ProgressStatus, StoreId, UserId, WithdrawalStatus},
    OrderQueryFilter,
    WithdrawalFilter,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self { status: "ok".into(), message: "Boiboi server is up and running".into(), timestamp: Utc::now() }
    }
}

/// Query string for order searches. Ids are kept as strings so that a malformed one is reported as a bad request
/// instead of being silently dropped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSearchParams {
    pub store_id: Option<String>,
    pub rider_id: Option<String>,
    pub customer_id: Option<String>,
    pub status: Option<OrderStatusType>,
}

impl OrderSearchParams {
    pub fn into_filter(self) -> Result<OrderQueryFilter, String> {
        Ok(OrderQueryFilter {
            store_id: self.store_id.map(|s| s.parse::<StoreId>()).transpose().map_err(|e| format!("{e}"))?,
            rider_id: self.rider_id.map(|s| s.parse::<UserId>()).transpose().map_err(|e| format!("{e}"))?,
            customer_id: self.customer_id.map(|s| s.parse::<UserId>()).transpose().map_err(|e| format!("{e}"))?,
            status: self.status,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalSearchParams {
    pub user_id: Option<String>,
    pub status: Option<WithdrawalStatus>,
}

impl WithdrawalSearchParams {
    pub fn into_filter(self) -> Result<WithdrawalFilter, String> {
        let user_id = self.user_id.map(|s| s.parse::<UserId>()).transpose().map_err(|e| format!("{e}"))?;
        Ok(WithdrawalFilter { user_id, status: self.status })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteOrderRequest {
    #[serde(deserialize_with = "code_from_number_or_string")]
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdateRequest {
    pub status: ProgressStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingRequest {
    pub rider_rating: Option<i64>,
    pub vendor_rating: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRequestBody {
    pub amount: Kobo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveCardRequest {
    pub reference: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDeviceRequest {
    pub token: String,
    #[serde(default)]
    pub device_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub user_id: String,
    /// Token lifetime in minutes. Defaults to a day.
    pub lifetime: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
}

fn code_from_number_or_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where D: Deserializer<'de> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Code {
        Number(u64),
        Text(String),
    }
    Ok(match Code::deserialize(deserializer)? {
        Code::Number(n) => n.to_string(),
        Code::Text(s) => s,
    })
}
