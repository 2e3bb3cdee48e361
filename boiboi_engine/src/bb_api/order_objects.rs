use serde::{Deserialize, Deserializer, Serialize};

use crate::db_types::{CardId, CartId, Kobo, NewOrder, PaymentMethod, StoreId, UserId};

const MAX_CODE_DIGITS: usize = 8;
/// No single order may cost more than ₦10,000,000.
pub const MAX_ORDER_TOTAL: Kobo = Kobo::from_naira(10_000_000);

/// A checkout request as sent by the customer app. All amounts are in kobo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub cart_id: String,
    pub store_id: String,
    #[serde(default)]
    pub is_errand: bool,
    pub checkout_type: PaymentMethod,
    #[serde(default)]
    pub card_id: Option<String>,
    pub total_price: Kobo,
    #[serde(default)]
    pub delivery_fee: Kobo,
    #[serde(default)]
    pub service_charge: Kobo,
    #[serde(default)]
    pub coupon_price: Kobo,
    #[serde(deserialize_with = "code_from_number_or_string")]
    pub code: String,
    #[serde(default)]
    pub delivery_location: Option<String>,
    #[serde(default)]
    pub delivery_instruction: Option<String>,
}

/// A [`CheckoutRequest`] that passed validation.
#[derive(Debug, Clone)]
pub struct ValidCheckout {
    pub cart_id: CartId,
    pub store_id: StoreId,
    pub card_id: Option<CardId>,
    pub request: CheckoutRequest,
}

impl CheckoutRequest {
    /// Checks everything that can be checked without touching the database.
    pub fn validate(self) -> Result<ValidCheckout, String> {
        if self.cart_id.trim().is_empty() {
            return Err("Cart id is required".into());
        }
        if self.store_id.trim().is_empty() {
            return Err("Store id is required".into());
        }
        if self.is_errand {
            return Err("Errands cannot be checked out as orders".into());
        }
        let cart_id = self.cart_id.parse::<CartId>().map_err(|e| e.to_string())?;
        let store_id = self.store_id.parse::<StoreId>().map_err(|e| e.to_string())?;
        for (name, amount) in [
            ("Total price", self.total_price),
            ("Delivery fee", self.delivery_fee),
            ("Service charge", self.service_charge),
            ("Coupon price", self.coupon_price),
        ] {
            if amount.is_negative() {
                return Err(format!("{name} cannot be negative"));
            }
            if amount > MAX_ORDER_TOTAL {
                return Err(format!("{name} cannot exceed {MAX_ORDER_TOTAL}"));
            }
        }
        let code = self.code.trim();
        if code.is_empty() || code.len() > MAX_CODE_DIGITS || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!("Order code must be between 1 and {MAX_CODE_DIGITS} digits"));
        }
        let card_id = match (self.checkout_type, &self.card_id) {
            (PaymentMethod::Card, None) => return Err("A card is required for card checkout".into()),
            (PaymentMethod::Card, Some(id)) => Some(id.parse::<CardId>().map_err(|e| e.to_string())?),
            (PaymentMethod::Wallet, _) => None,
        };
        Ok(ValidCheckout { cart_id, store_id, card_id, request: self })
    }
}

impl ValidCheckout {
    pub fn into_new_order(self, customer_id: UserId, payment_reference: String) -> NewOrder {
        let r = self.request;
        NewOrder {
            cart_id: self.cart_id,
            customer_id,
            store_id: self.store_id,
            code: r.code.trim().to_string(),
            price: r.total_price,
            delivery_fee: r.delivery_fee,
            service_charge: r.service_charge,
            coupon_price: r.coupon_price,
            delivery_location: r.delivery_location.unwrap_or_default(),
            delivery_instruction: r.delivery_instruction,
            payment_reference,
            method: r.checkout_type,
        }
    }
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

#[cfg(test)]
mod test {
    use super::*;

    fn request() -> CheckoutRequest {
        serde_json::from_str(
            r#"{
                "cartId": "65f0a1b2c3d4e5f6a7b8c9d0",
                "storeId": "65f0a1b2c3d4e5f6a7b8c9d1",
                "checkoutType": "wallet",
                "totalPrice": 350000,
                "deliveryFee": 50000,
                "code": 4821
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn numeric_codes_are_accepted() {
        let req = request();
        assert_eq!(req.code, "4821");
        assert!(!req.is_errand);
        let valid = req.validate().unwrap();
        assert!(valid.card_id.is_none());
        let order = valid.into_new_order(UserId::random(), "ref".into());
        assert_eq!(order.price, Kobo::from(350_000));
        assert_eq!(order.method, PaymentMethod::Wallet);
    }

    #[test]
    fn invalid_requests() {
        let mut req = request();
        req.is_errand = true;
        assert!(req.validate().unwrap_err().contains("Errands"));
        let mut req = request();
        req.cart_id = String::new();
        assert_eq!(req.validate().unwrap_err(), "Cart id is required");
        let mut req = request();
        req.total_price = Kobo::from(-1);
        assert_eq!(req.validate().unwrap_err(), "Total price cannot be negative");
        let mut req = request();
        req.total_price = Kobo::from(i64::MAX);
        assert_eq!(req.validate().unwrap_err(), "Total price cannot exceed ₦10000000.00");
        let mut req = request();
        req.delivery_fee = MAX_ORDER_TOTAL + Kobo::from(1);
        assert!(req.validate().unwrap_err().starts_with("Delivery fee cannot exceed"));
        let mut req = request();
        req.total_price = MAX_ORDER_TOTAL;
        assert!(req.validate().is_ok());
        let mut req = request();
        req.code = "12a4".into();
        assert!(req.validate().is_err());
        let mut req = request();
        req.checkout_type = PaymentMethod::Card;
        assert_eq!(req.validate().unwrap_err(), "A card is required for card checkout");
        let mut req = request();
        req.store_id = "store-1".into();
        assert!(req.validate().is_err());
    }
}
