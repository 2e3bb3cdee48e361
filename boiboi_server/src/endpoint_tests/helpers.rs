use actix_web::{
    body,
    http::StatusCode,
    test,
    test::TestRequest,
    web::ServiceConfig,
    App,
};
use boiboi_common::Secret;
use boiboi_engine::db_types::{UserId, UserRole};
use chrono::Duration;
use jsonwebtoken::{encode, EncodingKey, Header};
use log::debug;
use paystack_tools::PaystackConfig;

use super::mocks::{MockGateway, MockLedger};
use crate::{
    auth::{JwtClaims, TokenIssuer},
    config::{default_paystack_whitelist, AuthConfig, PaystackSettings, ServerOptions},
    helpers::calculate_hmac,
    server::configure_routes,
};

// Test-only secrets. DO NOT re-use these anywhere.
pub const JWT_SECRET: &str = "endpoint-test-secret-0f3a9c2e7b1d4f60";
pub const ADMIN_KEY: &str = "endpoint-test-admin-key";
pub const PAYSTACK_SECRET: &str = "sk_test_5e1f0c8a2b7d4e9f";
pub const PAYSTACK_PEER: &str = "52.31.139.75:443";

pub fn auth_config() -> AuthConfig {
    AuthConfig { jwt_secret: Secret::new(JWT_SECRET.into()), admin_key: Secret::new(ADMIN_KEY.into()) }
}

pub fn paystack_settings() -> PaystackSettings {
    let api = PaystackConfig { secret_key: Secret::new(PAYSTACK_SECRET.into()), ..Default::default() };
    PaystackSettings { api, whitelist: Some(default_paystack_whitelist()) }
}

pub fn issue_token(user: &str, role: UserRole) -> String {
    let user = user.parse::<UserId>().expect("Invalid user id");
    TokenIssuer::new(&auth_config().jwt_secret).issue_token(user, role, None).expect("Failed to sign token")
}

pub fn expired_token(user: &str, role: UserRole) -> String {
    let claims = JwtClaims::new(user.parse().expect("Invalid user id"), role, Duration::minutes(-5));
    encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET.as_bytes())).expect("Failed to sign token")
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

pub fn paystack_signature(body: &str) -> (&'static str, String) {
    ("x-paystack-signature", calculate_hmac(PAYSTACK_SECRET, body.as_bytes()))
}

/// Sends the request through the full set of routes and middleware. `data` registers the API objects the request
/// needs. Errors raised by middleware are rendered the same way the server would render them.
pub async fn send_request<F>(req: TestRequest, data: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) + 'static {
    let auth = auth_config();
    let paystack = paystack_settings();
    let app = App::new().configure(data).configure(move |cfg| {
        configure_routes::<MockLedger, MockGateway>(cfg, &auth, &paystack, ServerOptions::default())
    });
    let service = test::init_service(app).await;
    let (status, bytes) = match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            (status, test::read_body(res).await)
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            (status, body::to_bytes(res.into_body()).await.unwrap_or_default())
        },
    };
    let body = String::from_utf8_lossy(&bytes).into_owned();
    debug!("Response: {status} {body}");
    (status, body)
}
