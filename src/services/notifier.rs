use crate::config::ShareConfig;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

const MAILJET_SEND_URL: &str = "https://api.mailjet.com/v3.1/send";
const SENDER_NAME: &str = "GhostShare";

/// Everything a notifier needs to tell a recipient about a share
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkMessage {
    pub to: String,
    pub filename: String,
    pub link: String,
    pub expires_at: DateTime<Utc>,
    pub one_time: bool,
}

impl LinkMessage {
    pub fn subject(&self) -> String {
        "🔗 Your GhostShare download link".to_string()
    }

    pub fn text_body(&self) -> String {
        let expiry = if self.one_time {
            "after the first download".to_string()
        } else {
            format!("at {}", self.expires_at.format("%Y-%m-%d %H:%M UTC"))
        };
        format!(
            "Your file \"{}\" is ready for download!\n\nDownload link: {}\n\nThis link expires {}.\n",
            self.filename, self.link, expiry
        )
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_link(&self, message: &LinkMessage) -> Result<()>;
}

/// Sends plain-text mail through the Mailjet v3.1 send API
pub struct MailjetNotifier {
    client: Client,
    api_key: String,
    api_secret: String,
    from_email: String,
    endpoint: String,
}

impl MailjetNotifier {
    pub fn new(
        api_key: String,
        api_secret: String,
        from_email: String,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            client,
            api_key,
            api_secret,
            from_email,
            endpoint: MAILJET_SEND_URL.to_string(),
        })
    }

    /// Points the notifier at a different send endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn payload(&self, message: &LinkMessage) -> serde_json::Value {
        json!({
            "Messages": [{
                "From": { "Email": self.from_email, "Name": SENDER_NAME },
                "To": [{ "Email": message.to, "Name": "" }],
                "Subject": message.subject(),
                "TextPart": message.text_body(),
            }]
        })
    }
}

#[async_trait]
impl Notifier for MailjetNotifier {
    async fn send_link(&self, message: &LinkMessage) -> Result<()> {
        let res = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .json(&self.payload(message))
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("Mailjet returned {}: {}", status, body));
        }

        tracing::info!("📧 Share link for {} sent", message.filename);
        Ok(())
    }
}

/// Logs instead of sending. Used when no mail provider is configured.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send_link(&self, message: &LinkMessage) -> Result<()> {
        tracing::info!(
            "Mail provider not configured, skipping link notification for {}",
            message.filename
        );
        Ok(())
    }
}

/// Mailjet when its three settings are present, otherwise a no-op
pub fn notifier_from_config(config: &ShareConfig) -> Result<Box<dyn Notifier>> {
    match (
        &config.mailjet_api_key,
        &config.mailjet_api_secret,
        &config.mailjet_from_email,
    ) {
        (Some(key), Some(secret), Some(from)) => Ok(Box::new(MailjetNotifier::new(
            key.clone(),
            secret.clone(),
            from.clone(),
            config.store_timeout(),
        )?)),
        _ => Ok(Box::new(NoopNotifier)),
    }
}
