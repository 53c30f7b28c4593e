//! Decides whether a subscription should be alerted for a weather snapshot, and sends it.
//!
//! Never touches `last_notified`; the scheduler records it after a confirmed send.

use crate::domain::{DomainError, Notification, Subscription, WeatherSnapshot, evaluate};
use crate::ports::Notifier;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Default upper bound on a single notifier call.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Notification decision engine.
pub struct NotificationService {
    notifier: Arc<dyn Notifier>,
    send_timeout: Duration,
}

impl NotificationService {
    pub fn new(notifier: Arc<dyn Notifier>, send_timeout: Duration) -> Self {
        Self {
            notifier,
            send_timeout,
        }
    }

    /// Evaluate `sub.condition` against `weather` and send the alert when it holds.
    ///
    /// Returns `Ok(true)` only when the notifier confirmed the send, `Ok(false)` when the
    /// condition did not hold. Condition errors are returned unchanged; a notifier error
    /// or timeout is a `NotifierFailure`. No retry happens here.
    pub async fn evaluate_and_notify(
        &self,
        sub: &Subscription,
        weather: &WeatherSnapshot,
    ) -> Result<bool, DomainError> {
        if !evaluate(&sub.condition, weather)? {
            debug!(
                subscription_id = sub.id,
                condition = %sub.condition,
                temperature = weather.temperature,
                "condition not met"
            );
            return Ok(false);
        }

        let notification = Notification::weather_alert(sub, weather);
        self.deliver(&notification).await?;

        info!(
            subscription_id = sub.id,
            city = %sub.city,
            to = %notification.to,
            "weather alert sent"
        );
        Ok(true)
    }

    async fn deliver(&self, n: &Notification) -> Result<(), DomainError> {
        let send = self.notifier.send(&n.to, &n.subject, &n.body);
        match tokio::time::timeout(self.send_timeout, send).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(DomainError::NotifierFailure(msg))) => Err(DomainError::NotifierFailure(msg)),
            Ok(Err(other)) => Err(DomainError::NotifierFailure(other.to_string())),
            Err(_) => Err(DomainError::NotifierFailure(format!(
                "send to {} timed out after {:?}",
                n.to, self.send_timeout
            ))),
        }
    }
}
