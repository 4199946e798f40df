//! Pushover delivery for cooldown notifications.

use async_trait::async_trait;
use elite_core::alerts::{NotificationSink, SinkError};
use elite_types::PushoverConfig;
use reqwest::Client as HttpClient;
use serde::Serialize;
use tracing::debug;

const MESSAGES_URL: &str = "https://api.pushover.net/1/messages.json";

#[derive(Serialize)]
struct PushoverMessage<'a> {
    token: &'a str,
    user: &'a str,
    message: &'a str,
}

pub struct PushoverSink {
    http_client: HttpClient,
    api_key: String,
    user_key: String,
}

impl PushoverSink {
    pub fn new(config: &PushoverConfig) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key: config.api_key.clone(),
            user_key: config.user_key.clone(),
        }
    }
}

#[async_trait]
impl NotificationSink for PushoverSink {
    async fn notify(&self, message: &str) -> Result<(), SinkError> {
        self.http_client
            .post(MESSAGES_URL)
            .form(&PushoverMessage {
                token: &self.api_key,
                user: &self.user_key,
                message,
            })
            .send()
            .await?
            .error_for_status()?;
        debug!("Pushover notification sent");
        Ok(())
    }
}
