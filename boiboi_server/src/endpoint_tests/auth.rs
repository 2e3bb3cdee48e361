use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use boiboi_engine::{db_types::UserRole, events::EventProducers, OrderFlowApi};

use super::{
    helpers::{bearer, expired_token, issue_token, send_request},
    mocks::{order, MockLedger, CUSTOMER_ID, RIDER_ID},
};

fn no_data(_cfg: &mut ServiceConfig) {}

fn orders_api(cfg: &mut ServiceConfig) {
    let mut db = MockLedger::new();
    db.expect_search_orders().returning(|_| Ok(vec![order()]));
    cfg.app_data(web::Data::new(OrderFlowApi::new(db, EventProducers::default())));
}

#[actix_web::test]
async fn health_check_needs_no_token() {
    let _ = env_logger::try_init();
    let (status, body) = send_request(TestRequest::get().uri("/api/ping"), no_data).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""status":"ok""#), "was: {body}");
}

#[actix_web::test]
async fn missing_token() {
    let _ = env_logger::try_init();
    let (status, body) = send_request(TestRequest::get().uri("/api/orders"), orders_api).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("No access token was provided"), "was: {body}");
}

#[actix_web::test]
async fn garbage_token() {
    let _ = env_logger::try_init();
    let req = TestRequest::get().uri("/api/orders").insert_header(bearer("made.up.nonsense"));
    let (status, body) = send_request(req, orders_api).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Access token is not in the correct format"), "was: {body}");
}

#[actix_web::test]
async fn expired_token_is_rejected() {
    let _ = env_logger::try_init();
    let token = expired_token(CUSTOMER_ID, UserRole::Customer);
    let req = TestRequest::get().uri("/api/orders").insert_header(bearer(&token));
    let (status, body) = send_request(req, orders_api).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Access token is invalid"), "was: {body}");
}

#[actix_web::test]
async fn tampered_token_is_rejected() {
    let _ = env_logger::try_init();
    let mut token = issue_token(CUSTOMER_ID, UserRole::Customer);
    // Flip the role in the payload without re-signing
    let parts = token.split('.').map(String::from).collect::<Vec<_>>();
    let other = issue_token(RIDER_ID, UserRole::Rider);
    let other_payload = other.split('.').nth(1).unwrap().to_string();
    token = format!("{}.{}.{}", parts[0], other_payload, parts[2]);
    let req = TestRequest::get().uri("/api/orders").insert_header(bearer(&token));
    let (status, _) = send_request(req, orders_api).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn valid_token() {
    let _ = env_logger::try_init();
    let token = issue_token(CUSTOMER_ID, UserRole::Customer);
    let req = TestRequest::get().uri("/api/orders").insert_header(bearer(&token));
    let (status, body) = send_request(req, orders_api).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""code":"4821""#), "was: {body}");
}

#[actix_web::test]
async fn roles_are_enforced() {
    let _ = env_logger::try_init();
    let token = issue_token(RIDER_ID, UserRole::Rider);
    let req = TestRequest::post()
        .uri("/api/orders/checkout")
        .insert_header(bearer(&token))
        .set_json(serde_json::json!({"cartId": "65f0a1b2c3d4e5f6a7b8cc00"}));
    let (status, body) = send_request(req, no_data).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("This action requires one of these roles: customer"), "was: {body}");
}
