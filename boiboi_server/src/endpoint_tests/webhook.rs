use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use boiboi_engine::{db_types::Kobo, events::EventProducers, LedgerError, TopUpResult, WalletApi};

use super::{
    helpers::{paystack_signature, send_request, PAYSTACK_PEER},
    mocks::{top_up, MockGateway, MockLedger},
};

const TOP_UP: &str = r#"{
    "event": "charge.success",
    "data": {
        "reference": "T_top_991",
        "amount": 150000,
        "status": "success",
        "gateway_response": "Approved",
        "customer": {"email": "ada@example.com"},
        "metadata": {}
    }
}"#;

fn wallet_api(db: MockLedger) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(WalletApi::new(db, MockGateway::new(), EventProducers::default())));
    }
}

fn webhook_request(body: &'static str) -> TestRequest {
    TestRequest::post()
        .uri("/webhook/paystack")
        .peer_addr(PAYSTACK_PEER.parse().unwrap())
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body)
}

#[actix_web::test]
async fn missing_signature() {
    let _ = env_logger::try_init();
    let (status, body) = send_request(webhook_request(TOP_UP), wallet_api(MockLedger::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "No HMAC signature found.");
}

#[actix_web::test]
async fn wrong_signature() {
    let _ = env_logger::try_init();
    let req = webhook_request(TOP_UP).insert_header(paystack_signature("a different body"));
    let (status, body) = send_request(req, wallet_api(MockLedger::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "Invalid HMAC signature.");
}

#[actix_web::test]
async fn unknown_peer() {
    let _ = env_logger::try_init();
    let req = TestRequest::post()
        .uri("/webhook/paystack")
        .peer_addr("10.1.1.1:5000".parse().unwrap())
        .insert_header(paystack_signature(TOP_UP))
        .set_payload(TOP_UP);
    let (status, _) = send_request(req, wallet_api(MockLedger::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn top_up_is_credited_once() {
    let _ = env_logger::try_init();
    let mut db = MockLedger::new();
    db.expect_credit_wallet_top_up()
        .withf(|email, amount, reference| {
            email == "ada@example.com" && *amount == Kobo::from(150_000) && reference == "T_top_991"
        })
        .times(1)
        .returning(|_, amount, reference| Ok(TopUpResult::Credited(top_up(reference, amount))));
    let req = webhook_request(TOP_UP).insert_header(paystack_signature(TOP_UP));
    let (status, body) = send_request(req, wallet_api(db)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Charge T_top_991 processed"), "was: {body}");
}

#[actix_web::test]
async fn unknown_email_is_acknowledged() {
    let _ = env_logger::try_init();
    let mut db = MockLedger::new();
    db.expect_credit_wallet_top_up()
        .times(1)
        .returning(|email, _, _| Err(LedgerError::EmailNotFound(email.to_string())));
    let req = webhook_request(TOP_UP).insert_header(paystack_signature(TOP_UP));
    let (status, body) = send_request(req, wallet_api(db)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""success":false"#), "was: {body}");
}

#[actix_web::test]
async fn storage_failures_ask_for_a_retry() {
    let _ = env_logger::try_init();
    let mut db = MockLedger::new();
    db.expect_credit_wallet_top_up()
        .times(1)
        .returning(|_, _, _| Err(LedgerError::DatabaseError("database is locked".into())));
    let req = webhook_request(TOP_UP).insert_header(paystack_signature(TOP_UP));
    let (status, _) = send_request(req, wallet_api(db)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_web::test]
async fn other_events_are_ignored() {
    let _ = env_logger::try_init();
    const EVENT: &str = r#"{"event": "subscription.create", "data": {}}"#;
    let req = webhook_request(EVENT).insert_header(paystack_signature(EVENT));
    let (status, body) = send_request(req, wallet_api(MockLedger::new())).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Ignored"), "was: {body}");
}
