use std::time::Duration;

use reqwest::Client;
use tracing::info;
use url::Url;

use crate::emit::WirePayload;
use crate::error::{ReleaseNotifierError, Result};

/// Posts payloads to an incoming-webhook URL (Slack or Discord).
#[derive(Debug, Clone)]
pub struct WebhookTransport {
    client: Client,
    url: String,
    delay: Duration,
}

impl WebhookTransport {
    /// Creates a transport for the given webhook URL.
    ///
    /// Consecutive posts are spaced 3 seconds apart by default.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        if Url::parse(&url).is_err() {
            return Err(ReleaseNotifierError::InvalidBaseUrl(url));
        }
        Ok(Self {
            client: Client::new(),
            url,
            delay: Duration::from_secs(3),
        })
    }

    /// Sets the pause between consecutive posts.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Posts every payload in order, stopping at the first failure.
    pub async fn send_all(&self, payloads: &[WirePayload]) -> Result<()> {
        for (index, payload) in payloads.iter().enumerate() {
            if index > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let response = self.client.post(&self.url).json(payload).send().await?;
            if !response.status().is_success() {
                let status = response.status().as_u16();
                let message = response.text().await.unwrap_or_default();
                return Err(ReleaseNotifierError::ApiError { status, message });
            }
            info!(message = index + 1, total = payloads.len(), "payload delivered");
        }
        Ok(())
    }
}
