//! Push delivery through Firebase Cloud Messaging.
//!
//! Without a server key, notifications are only logged. That keeps local and staging setups quiet.
use std::time::Duration;

use boiboi_common::Secret;
use boiboi_engine::traits::{Notification, PushError, PushSender};
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
};
use serde::Deserialize;
use serde_json::json;

use crate::{config::PushConfig, errors::ServerError};

/// FCM error codes meaning the token will never work again.
const STALE_TOKEN_ERRORS: [&str; 3] = ["NotRegistered", "InvalidRegistration", "MismatchSenderId"];

#[derive(Clone)]
pub enum PushService {
    Fcm(FcmSender),
    Disabled,
}

impl PushService {
    pub fn from_config(config: &PushConfig) -> Result<Self, ServerError> {
        match &config.server_key {
            Some(key) => Ok(Self::Fcm(FcmSender::new(&config.url, key, config.timeout)?)),
            None => Ok(Self::Disabled),
        }
    }
}

impl PushSender for PushService {
    async fn send(&self, device_token: &str, notification: &Notification) -> Result<(), PushError> {
        match self {
            Self::Fcm(sender) => sender.send(device_token, notification).await,
            Self::Disabled => {
                info!("📬️ [push disabled] {}: {} ({device_token})", notification.title, notification.body);
                Ok(())
            },
        }
    }
}

#[derive(Clone)]
pub struct FcmSender {
    url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct FcmResponse {
    #[serde(default)]
    failure: u32,
    #[serde(default)]
    results: Vec<FcmResult>,
}

#[derive(Debug, Deserialize)]
struct FcmResult {
    error: Option<String>,
}

impl FcmSender {
    pub fn new(url: &str, server_key: &Secret<String>, timeout: Duration) -> Result<Self, ServerError> {
        let mut headers = HeaderMap::with_capacity(2);
        let mut key = HeaderValue::from_str(&format!("key={}", server_key.reveal()))
            .map_err(|e| ServerError::ConfigurationError(format!("Invalid push server key. {e}")))?;
        key.set_sensitive(true);
        headers.insert(AUTHORIZATION, key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ServerError::InitializeError(e.to_string()))?;
        Ok(Self { url: url.to_string(), client })
    }

    async fn send(&self, device_token: &str, notification: &Notification) -> Result<(), PushError> {
        let body = json!({
            "to": device_token,
            "notification": { "title": notification.title, "body": notification.body },
        });
        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PushError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(PushError::Transport(format!("FCM answered with {status}")));
        }
        let result = response.json::<FcmResponse>().await.map_err(|e| PushError::Transport(e.to_string()))?;
        classify_response(result)
    }
}

fn classify_response(response: FcmResponse) -> Result<(), PushError> {
    if response.failure == 0 {
        return Ok(());
    }
    let error = response.results.into_iter().find_map(|r| r.error).unwrap_or_else(|| "Unknown".into());
    if STALE_TOKEN_ERRORS.contains(&error.as_str()) {
        Err(PushError::StaleToken(error))
    } else {
        Err(PushError::Transport(error))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn response(json: &str) -> FcmResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn fcm_results() {
        assert!(classify_response(response(r#"{"success": 1, "failure": 0, "results": [{}]}"#)).is_ok());
        let stale = classify_response(response(r#"{"failure": 1, "results": [{"error": "NotRegistered"}]}"#));
        assert!(matches!(stale, Err(PushError::StaleToken(e)) if e == "NotRegistered"));
        let busy = classify_response(response(r#"{"failure": 1, "results": [{"error": "Unavailable"}]}"#));
        assert!(matches!(busy, Err(PushError::Transport(_))));
    }

    #[tokio::test]
    async fn disabled_push_just_logs() {
        let push = PushService::from_config(&PushConfig::default()).unwrap();
        assert!(matches!(push, PushService::Disabled));
        push.send("token", &Notification::new("Hi", "there")).await.unwrap();
    }
}
