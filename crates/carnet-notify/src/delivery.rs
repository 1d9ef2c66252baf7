//! Email delivery adapters.
//!
//! Two modes, selected by configuration:
//! - **Real**: HTTP POST of the message to a mail relay endpoint. Any
//!   transport failure or non-2xx response is raised as an error, which is
//!   what triggers the worker's negative acknowledgment.
//! - **Mock**: used when no relay is configured. Logs the full content and
//!   always reports success, so the pipeline stays exercisable in
//!   development.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use carnet_core::{DeliveryMode, DeliveryReceipt, Error, NotificationMessage, Result};

/// Trait for email delivery backends.
#[async_trait]
pub trait EmailDelivery: Send + Sync {
    /// Deliver one message. Errors trigger redelivery; a returned receipt
    /// means the message may be acknowledged.
    async fn send(&self, message: &NotificationMessage) -> Result<DeliveryReceipt>;

    /// Which mode this adapter operates in.
    fn mode(&self) -> DeliveryMode;
}

/// Email delivery configuration.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `EMAIL_RELAY_URL` | unset | Relay endpoint; unset selects mock mode |
/// | `EMAIL_RELAY_TOKEN` | unset | Bearer token for the relay |
/// | `EMAIL_FROM` | `carnet <noreply@carnet.local>` | Sender header |
#[derive(Debug, Clone, Default)]
pub struct EmailConfig {
    pub relay_url: Option<String>,
    pub relay_token: Option<String>,
    pub from: String,
}

impl EmailConfig {
    /// Read configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            relay_url: std::env::var("EMAIL_RELAY_URL").ok().filter(|v| !v.is_empty()),
            relay_token: std::env::var("EMAIL_RELAY_TOKEN").ok().filter(|v| !v.is_empty()),
            from: std::env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "carnet <noreply@carnet.local>".to_string()),
        }
    }

    /// Build the adapter this configuration selects: HTTP relay when a URL
    /// is present, mock otherwise.
    pub fn build(self) -> Arc<dyn EmailDelivery> {
        match self.relay_url {
            Some(_) => Arc::new(HttpRelayDelivery::new(self)),
            None => {
                warn!(
                    subsystem = "notify",
                    component = "delivery",
                    "EMAIL_RELAY_URL not configured; emails are logged, not sent"
                );
                Arc::new(MockDelivery::new())
            }
        }
    }
}

// =============================================================================
// HTTP RELAY DELIVERY
// =============================================================================

/// Real delivery via an HTTP mail relay.
pub struct HttpRelayDelivery {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
    from: String,
}

impl HttpRelayDelivery {
    /// Create an adapter from a config carrying a relay URL.
    pub fn new(config: EmailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.relay_url.unwrap_or_default(),
            token: config.relay_token,
            from: config.from,
        }
    }
}

#[async_trait]
impl EmailDelivery for HttpRelayDelivery {
    async fn send(&self, message: &NotificationMessage) -> Result<DeliveryReceipt> {
        let payload = serde_json::json!({
            "from": self.from,
            "to": message.to,
            "subject": message.subject,
            "text": message.body,
            "shared_by": message.shared_by,
            "timestamp": message.timestamp,
        });

        let mut request = self.client.post(&self.url).json(&payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Delivery(format!("relay unreachable: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Delivery(format!(
                "relay returned {}",
                response.status()
            )));
        }

        // Relays that return a JSON body with an id are honored; anything
        // else gets a locally generated receipt id.
        let message_id = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|v| v.get("id").and_then(|id| id.as_str()).map(String::from))
            .unwrap_or_else(|| uuid::Uuid::now_v7().to_string());

        info!(
            subsystem = "notify",
            component = "delivery",
            to = %message.to,
            message_id = %message_id,
            "Email sent"
        );

        Ok(DeliveryReceipt {
            message_id,
            mode: DeliveryMode::Real,
        })
    }

    fn mode(&self) -> DeliveryMode {
        DeliveryMode::Real
    }
}

// =============================================================================
// MOCK DELIVERY
// =============================================================================

/// Mock delivery for development and tests.
///
/// Logs the message content and reports success. Tests can script failures
/// for the first N sends and inspect the call log.
#[derive(Clone, Default)]
pub struct MockDelivery {
    sent: Arc<Mutex<Vec<NotificationMessage>>>,
    fail_first: Arc<Mutex<u32>>,
}

impl MockDelivery {
    /// Create a mock adapter that always succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the first `n` sends with a delivery error, then succeed.
    pub fn failing_first(n: u32) -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            fail_first: Arc::new(Mutex::new(n)),
        }
    }

    /// Messages successfully "sent" so far.
    pub fn sent(&self) -> Vec<NotificationMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Number of successful sends.
    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl EmailDelivery for MockDelivery {
    async fn send(&self, message: &NotificationMessage) -> Result<DeliveryReceipt> {
        {
            let mut remaining = self.fail_first.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(Error::Delivery("mock delivery failure".to_string()));
            }
        }

        info!(
            subsystem = "notify",
            component = "delivery",
            to = %message.to,
            subject = %message.subject,
            shared_by = %message.shared_by,
            "EMAIL (MOCK): {}",
            message.body
        );

        self.sent.lock().unwrap().push(message.clone());

        Ok(DeliveryReceipt {
            message_id: format!("mock_{}", Utc::now().timestamp_millis()),
            mode: DeliveryMode::Mock,
        })
    }

    fn mode(&self) -> DeliveryMode {
        DeliveryMode::Mock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn message() -> NotificationMessage {
        NotificationMessage {
            to: "friend@example.com".to_string(),
            subject: "Note shared with you".to_string(),
            body: "Take a look".to_string(),
            note_id: Uuid::now_v7(),
            shared_by: "owner@example.com".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_mock_delivery_succeeds_and_records() {
        let mock = MockDelivery::new();
        let receipt = mock.send(&message()).await.unwrap();

        assert_eq!(receipt.mode, DeliveryMode::Mock);
        assert!(receipt.message_id.starts_with("mock_"));
        assert_eq!(mock.sent_count(), 1);
        assert_eq!(mock.sent()[0].to, "friend@example.com");
    }

    #[tokio::test]
    async fn test_mock_delivery_scripted_failures() {
        let mock = MockDelivery::failing_first(2);

        assert!(mock.send(&message()).await.is_err());
        assert!(mock.send(&message()).await.is_err());
        assert!(mock.send(&message()).await.is_ok());
        assert_eq!(mock.sent_count(), 1);
    }

    #[test]
    fn test_email_config_builds_mock_without_relay() {
        let adapter = EmailConfig {
            relay_url: None,
            relay_token: None,
            from: "x".to_string(),
        }
        .build();
        assert_eq!(adapter.mode(), DeliveryMode::Mock);
    }

    #[test]
    fn test_email_config_builds_real_with_relay() {
        let adapter = EmailConfig {
            relay_url: Some("http://localhost:8025/send".to_string()),
            relay_token: None,
            from: "x".to_string(),
        }
        .build();
        assert_eq!(adapter.mode(), DeliveryMode::Real);
    }
}
