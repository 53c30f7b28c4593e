//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{
    DomainError, NewSubscription, PendingConfirmation, Subscription, WeatherSnapshot,
};
use chrono::{DateTime, Utc};

/// Source of current weather per city.
#[async_trait::async_trait]
pub trait WeatherSource: Send + Sync {
    /// Latest snapshot for `city`. Unknown cities are a `FetchFailure`.
    async fn current_weather(&self, city: &str) -> Result<WeatherSnapshot, DomainError>;
}

/// Write side for weather snapshots.
#[async_trait::async_trait]
pub trait WeatherStore: Send + Sync {
    /// Insert or replace the latest snapshot for `weather.city`.
    async fn save_weather(&self, weather: &WeatherSnapshot) -> Result<(), DomainError>;
}

/// Subscription persistence as seen by the scheduler.
#[async_trait::async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// All subscriptions with `verified = true`.
    async fn list_confirmed(&self) -> Result<Vec<Subscription>, DomainError>;

    /// Persist `last_notified = at` for one subscription. Called only after a successful send.
    async fn record_notified(&self, id: i64, at: DateTime<Utc>) -> Result<(), DomainError>;
}

/// Subscription persistence as seen by the register/confirm flow.
#[async_trait::async_trait]
pub trait SubscriptionRegistry: Send + Sync {
    /// Store an unverified subscription and return its id.
    /// An existing (email, city) pair is a `DuplicateSubscription`.
    async fn create_pending(&self, sub: &NewSubscription) -> Result<i64, DomainError>;

    /// Look up a subscription by its confirmation token.
    async fn find_by_token(&self, token: &str) -> Result<Option<PendingConfirmation>, DomainError>;

    /// Set `verified` and clear the token and its expiry.
    async fn confirm(&self, id: i64) -> Result<(), DomainError>;
}

/// Delivery of a single message: alerts and confirmation emails.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DomainError>;
}
