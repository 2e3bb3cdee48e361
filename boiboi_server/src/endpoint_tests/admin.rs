use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use boiboi_engine::{
    db_types::{CheckoutSettings, Kobo, PlatformAccount, UserRole},
    events::EventProducers,
    OrderFlowApi,
    SettlementApi,
};
use chrono::Utc;

use super::{
    helpers::{auth_config, bearer, send_request, ADMIN_KEY},
    mocks::{user, MockLedger, RIDER_ID},
};
use crate::{
    auth::{TokenIssuer, TokenValidator},
    data_objects::TokenResponse,
};

fn settlement_api(db: MockLedger) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(SettlementApi::new(db, EventProducers::default())));
    }
}

fn platform_db() -> MockLedger {
    let mut db = MockLedger::new();
    db.expect_fetch_platform_account()
        .returning(|| Ok(PlatformAccount { balance: Kobo::from_naira(1_200), updated_at: Utc::now() }));
    db
}

#[actix_web::test]
async fn admin_key_is_required() {
    let _ = env_logger::try_init();
    let (status, _) = send_request(TestRequest::get().uri("/api/admin/platform"), settlement_api(platform_db())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = TestRequest::get().uri("/api/admin/platform").insert_header(bearer("not-the-admin-key"));
    let (status, body) = send_request(req, settlement_api(platform_db())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Invalid admin key"), "was: {body}");
}

#[actix_web::test]
async fn platform_account() {
    let _ = env_logger::try_init();
    let req = TestRequest::get().uri("/api/admin/platform").insert_header(bearer(ADMIN_KEY));
    let (status, body) = send_request(req, settlement_api(platform_db())).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""balance":120000"#), "was: {body}");
}

#[actix_web::test]
async fn checkout_settings_must_cover_the_whole_subtotal() {
    let _ = env_logger::try_init();
    let req = TestRequest::put()
        .uri("/api/admin/settings/checkout")
        .insert_header(bearer(ADMIN_KEY))
        .set_json(serde_json::json!({"storePercentBps": 8000, "platformPercentBps": 1000}));
    let (status, body) = send_request(req, settlement_api(MockLedger::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("must add up to 100%"), "was: {body}");
}

#[actix_web::test]
async fn checkout_settings_are_saved() {
    let _ = env_logger::try_init();
    let mut db = MockLedger::new();
    db.expect_update_checkout_settings().times(1).returning(Ok);
    let req = TestRequest::put()
        .uri("/api/admin/settings/checkout")
        .insert_header(bearer(ADMIN_KEY))
        .set_json(CheckoutSettings { store_percent_bps: 9000, platform_percent_bps: 1000 });
    let (status, body) = send_request(req, settlement_api(db)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""storePercentBps":9000"#), "was: {body}");
}

#[actix_web::test]
async fn missing_checkout_settings() {
    let _ = env_logger::try_init();
    let mut db = MockLedger::new();
    db.expect_fetch_checkout_settings().returning(|| Ok(None));
    let req = TestRequest::get().uri("/api/admin/settings/checkout").insert_header(bearer(ADMIN_KEY));
    let (status, _) = send_request(req, settlement_api(db)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn support_tokens_carry_the_users_role() {
    let _ = env_logger::try_init();
    let mut db = MockLedger::new();
    db.expect_fetch_user().returning(|_| Ok(Some(user(RIDER_ID, UserRole::Rider))));
    let req = TestRequest::post()
        .uri("/api/admin/token")
        .insert_header(bearer(ADMIN_KEY))
        .set_json(serde_json::json!({"userId": RIDER_ID, "lifetime": 30}));
    let (status, body) = send_request(req, move |cfg| {
        cfg.app_data(web::Data::new(OrderFlowApi::new(db, EventProducers::default())));
        cfg.app_data(web::Data::new(TokenIssuer::new(&auth_config().jwt_secret)));
    })
    .await;
    assert_eq!(status, StatusCode::OK, "was: {body}");
    let response: TokenResponse = serde_json::from_str(&body).unwrap();
    let claims = TokenValidator::new(&auth_config().jwt_secret).validate(&response.access_token).unwrap();
    assert_eq!(claims.sub.as_str(), RIDER_ID);
    assert_eq!(claims.role, UserRole::Rider);
}
