use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use boiboi_engine::{
    db_types::{AccountStatus, Card, Cart, CartId, Store, UserRole},
    events::EventProducers,
    traits::{CardCharge, ChargeStatus},
    CheckoutApi,
    LedgerError,
};
use chrono::Utc;
use serde_json::json;

use super::{
    helpers::{bearer, issue_token, send_request},
    mocks::{id, user, MockGateway, MockLedger, CUSTOMER_ID, STORE_ID},
};

const CART_ID: &str = "65f0a1b2c3d4e5f6a7b8cc00";
const CARD_ID: &str = "65f0a1b2c3d4e5f6a7b8cd00";
const OTHER_CUSTOMER: &str = "65f0a1b2c3d4e5f6a7b8c9d9";

fn checkout_api(db: MockLedger, gateway: MockGateway) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(CheckoutApi::new(db, gateway, EventProducers::default())));
    }
}

fn card_checkout() -> TestRequest {
    let token = issue_token(CUSTOMER_ID, UserRole::Customer);
    TestRequest::post().uri("/api/orders/checkout").insert_header(bearer(&token)).set_json(json!({
        "cartId": CART_ID,
        "storeId": STORE_ID,
        "checkoutType": "card",
        "cardId": CARD_ID,
        "totalPrice": 250_000,
        "deliveryFee": 50_000,
        "code": 4821
    }))
}

/// A ledger that knows the store, the customer and their saved card. `cart_owner` owns the open cart.
fn ledger(cart_owner: &'static str) -> MockLedger {
    let mut db = MockLedger::new();
    db.expect_fetch_store().returning(|_| {
        Ok(Some(Store {
            id: id(STORE_ID),
            name: "Mama Put Kitchen".into(),
            description: String::new(),
            status: AccountStatus::Active,
            rating: 0.0,
            created_at: Utc::now(),
        }))
    });
    db.expect_fetch_user().returning(|_| Ok(Some(user(CUSTOMER_ID, UserRole::Customer))));
    db.expect_fetch_cards().returning(|_| {
        Ok(vec![Card {
            id: id(CARD_ID),
            user_id: id(CUSTOMER_ID),
            authorization_code: "AUTH_8dfhjjdt".into(),
            bank: "Zenith Bank".into(),
            card_type: "visa".into(),
            is_selected: true,
            created_at: Utc::now(),
        }])
    });
    db.expect_fetch_cart()
        .returning(move |_| Ok(Some(Cart { id: id::<CartId>(CART_ID), user_id: id(cart_owner), is_completed: false })));
    db
}

#[actix_web::test]
async fn charged_card_with_unsaved_order() {
    let _ = env_logger::try_init();
    let mut db = ledger(CUSTOMER_ID);
    db.expect_insert_order().times(1).returning(|_| Err(LedgerError::DatabaseError("disk I/O error".into())));
    let mut gateway = MockGateway::new();
    gateway.expect_charge_saved_card().times(1).returning(|_, _, _, _| {
        Ok(CardCharge {
            status: ChargeStatus::Success,
            gateway_response: "Approved".into(),
            reference: "T_card_5521".into(),
        })
    });
    let (status, body) = send_request(card_checkout(), checkout_api(db, gateway)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "was: {body}");
}

#[actix_web::test]
async fn foreign_carts_are_not_charged() {
    let _ = env_logger::try_init();
    // No charge or insert expectations: either call would fail the test
    let db = ledger(OTHER_CUSTOMER);
    let (status, body) = send_request(card_checkout(), checkout_api(db, MockGateway::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "was: {body}");
}
