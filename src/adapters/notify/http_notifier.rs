//! Mail relay adapter. Implements Notifier by POSTing a JSON message to an HTTP endpoint.
//!
//! Works with relays that accept `{from, to, subject, text}` (Mailgun/Postmark-style
//! gateways or a local sidecar that speaks SMTP).

use crate::domain::DomainError;
use crate::ports::Notifier;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Connect + response timeout for a single relay request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// HTTP mail relay notifier.
pub struct HttpNotifier {
    client: Arc<Client>,
    endpoint: String,
    token: Option<String>,
    from: String,
}

impl HttpNotifier {
    /// # Arguments
    /// * `endpoint` - Relay URL that accepts the JSON message
    /// * `token` - Optional bearer token
    /// * `from` - Sender address
    pub fn new(endpoint: String, token: Option<String>, from: String) -> Result<Self, DomainError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DomainError::NotifierFailure(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client: Arc::new(client),
            endpoint,
            token,
            from,
        })
    }

    fn message<'a>(&'a self, to: &'a str, subject: &'a str, body: &'a str) -> RelayMessage<'a> {
        RelayMessage {
            from: &self.from,
            to,
            subject,
            text: body,
        }
    }
}

#[async_trait::async_trait]
impl Notifier for HttpNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DomainError> {
        debug!(to, subject, endpoint = %self.endpoint, "posting alert to mail relay");

        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&self.message(to, subject, body));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let res = request
            .send()
            .await
            .map_err(|e| DomainError::NotifierFailure(format!("Request failed: {}", e)))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_else(|_| "unknown".to_string());
            warn!(to, %status, "mail relay rejected message");
            return Err(DomainError::NotifierFailure(format!(
                "Relay error {}: {}",
                status, text
            )));
        }

        Ok(())
    }
}
