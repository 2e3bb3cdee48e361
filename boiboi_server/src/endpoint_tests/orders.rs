use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use boiboi_engine::{
    db_types::{ProgressStatus, StoreId, UserRole},
    events::EventProducers,
    LedgerError,
    OrderFlowApi,
    SettlementApi,
};

use super::{
    helpers::{bearer, issue_token, send_request},
    mocks::{id, order, user, MockLedger, CUSTOMER_ID, MERCHANT_ID, ORDER_ID, RIDER_ID, STORE_ID},
};

const OTHER_CUSTOMER: &str = "65f0a1b2c3d4e5f6a7b8c9d9";

fn orders_api(db: MockLedger) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(OrderFlowApi::new(db, EventProducers::default())));
    }
}

#[actix_web::test]
async fn merchants_only_see_their_store() {
    let _ = env_logger::try_init();
    let mut db = MockLedger::new();
    db.expect_fetch_user().returning(|_| Ok(Some(user(MERCHANT_ID, UserRole::Merchant))));
    db.expect_search_orders()
        .withf(|q| q.store_id == Some(id::<StoreId>(STORE_ID)) && q.customer_id.is_none())
        .times(1)
        .returning(|_| Ok(vec![order()]));
    let token = issue_token(MERCHANT_ID, UserRole::Merchant);
    // A merchant asking for another store still only gets their own
    let req = TestRequest::get()
        .uri("/api/orders?storeId=65f0a1b2c3d4e5f6a7b8c9ff&status=ongoing")
        .insert_header(bearer(&token));
    let (status, body) = send_request(req, orders_api(db)).await;
    assert_eq!(status, StatusCode::OK, "was: {body}");
}

#[actix_web::test]
async fn malformed_search_ids() {
    let _ = env_logger::try_init();
    let token = issue_token(RIDER_ID, UserRole::Rider);
    let req = TestRequest::get().uri("/api/orders?riderId=rider-7").insert_header(bearer(&token));
    let (status, body) = send_request(req, orders_api(MockLedger::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Invalid user id"), "was: {body}");
}

#[actix_web::test]
async fn customers_cannot_see_other_orders() {
    let _ = env_logger::try_init();
    let mut db = MockLedger::new();
    db.expect_fetch_order().returning(|_| Ok(Some(order())));
    let token = issue_token(OTHER_CUSTOMER, UserRole::Customer);
    let req = TestRequest::get().uri(&format!("/api/orders/{ORDER_ID}")).insert_header(bearer(&token));
    let (status, _) = send_request(req, orders_api(db)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn customers_see_their_own_orders() {
    let _ = env_logger::try_init();
    let mut db = MockLedger::new();
    db.expect_fetch_order().returning(|_| Ok(Some(order())));
    let token = issue_token(CUSTOMER_ID, UserRole::Customer);
    let req = TestRequest::get().uri(&format!("/api/orders/{ORDER_ID}")).insert_header(bearer(&token));
    let (status, body) = send_request(req, orders_api(db)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(ORDER_ID), "was: {body}");
}

#[actix_web::test]
async fn bad_order_id_in_path() {
    let _ = env_logger::try_init();
    let token = issue_token(CUSTOMER_ID, UserRole::Customer);
    let req = TestRequest::get().uri("/api/orders/not-an-order").insert_header(bearer(&token));
    let (status, _) = send_request(req, orders_api(MockLedger::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn only_participants_complete_orders() {
    let _ = env_logger::try_init();
    let mut db = MockLedger::new();
    db.expect_fetch_order().returning(|_| Ok(Some(order())));
    let settlement = MockLedger::new();
    let token = issue_token(RIDER_ID, UserRole::Rider);
    let req = TestRequest::post()
        .uri(&format!("/api/orders/{ORDER_ID}/complete"))
        .insert_header(bearer(&token))
        .set_json(serde_json::json!({"code": 4821}));
    let (status, body) = send_request(req, move |cfg| {
        cfg.app_data(web::Data::new(OrderFlowApi::new(db, EventProducers::default())));
        cfg.app_data(web::Data::new(SettlementApi::new(settlement, EventProducers::default())));
    })
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("is not allowed to modify this order"), "was: {body}");
}

#[actix_web::test]
async fn wrong_pickup_code() {
    let _ = env_logger::try_init();
    let mut db = MockLedger::new();
    db.expect_fetch_order().returning(|_| Ok(Some(order())));
    let mut settlement = MockLedger::new();
    settlement
        .expect_complete_order()
        .withf(|_, code, _| code == "1234")
        .times(1)
        .returning(|_, _, _| Err(LedgerError::WrongOrderCode));
    let token = issue_token(CUSTOMER_ID, UserRole::Customer);
    let req = TestRequest::post()
        .uri(&format!("/api/orders/{ORDER_ID}/complete"))
        .insert_header(bearer(&token))
        .set_json(serde_json::json!({"code": "1234"}));
    let (status, body) = send_request(req, move |cfg| {
        cfg.app_data(web::Data::new(OrderFlowApi::new(db, EventProducers::default())));
        cfg.app_data(web::Data::new(SettlementApi::new(settlement, EventProducers::default())));
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Wrong order code inputted"), "was: {body}");
}

#[actix_web::test]
async fn riders_accept_orders() {
    let _ = env_logger::try_init();
    let mut db = MockLedger::new();
    db.expect_fetch_order().returning(|_| Ok(Some(order())));
    db.expect_fetch_user().returning(|_| Ok(Some(user(RIDER_ID, UserRole::Rider))));
    db.expect_update_order_progress()
        .withf(|_, status, rider| {
            *status == ProgressStatus::OrderAcceptedByRider && rider.map(|r| r.as_str()) == Some(RIDER_ID)
        })
        .times(1)
        .returning(|_, status, rider| {
            let mut order = order();
            order.progress_status = status;
            order.rider_id = rider.cloned();
            Ok(order)
        });
    let token = issue_token(RIDER_ID, UserRole::Rider);
    let req = TestRequest::patch()
        .uri(&format!("/api/orders/{ORDER_ID}/orderProgress"))
        .insert_header(bearer(&token))
        .set_json(serde_json::json!({"status": "orderAcceptedByRider"}));
    let (status, body) = send_request(req, orders_api(db)).await;
    assert_eq!(status, StatusCode::OK, "was: {body}");
    assert!(body.contains(r#""progressStatus":"orderAcceptedByRider""#), "was: {body}");
}

#[actix_web::test]
async fn customers_cannot_move_orders_along() {
    let _ = env_logger::try_init();
    let token = issue_token(CUSTOMER_ID, UserRole::Customer);
    let req = TestRequest::patch()
        .uri(&format!("/api/orders/{ORDER_ID}/orderProgress"))
        .insert_header(bearer(&token))
        .set_json(serde_json::json!({"status": "riderAtVendor"}));
    let (status, _) = send_request(req, orders_api(MockLedger::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
