use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn new<T: Into<String>, B: Into<String>>(title: T, body: B) -> Self {
        Self { title: title.into(), body: body.into() }
    }
}

#[derive(Debug, Clone, Error)]
pub enum PushError {
    /// The device token is no longer registered with the push provider and should be forgotten.
    #[error("Device token is no longer valid: {0}")]
    StaleToken(String),
    #[error("Could not deliver push notification: {0}")]
    Transport(String),
}

#[allow(async_fn_in_trait)]
pub trait PushSender: Clone {
    async fn send(&self, device_token: &str, notification: &Notification) -> Result<(), PushError>;
}
