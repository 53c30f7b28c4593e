//! Domain entities. Pure data structures for the core business.
//!
//! No database/HTTP types here — adapters map into these.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current weather for one city, as reported by a `WeatherSource`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub city: String,
    /// Degrees Celsius.
    pub temperature: f64,
    /// Relative humidity, 0–100.
    pub humidity: u8,
    /// Free-text label such as "Rain" or "Clear". Compared case-insensitively.
    pub condition: String,
    pub observed_at: DateTime<Utc>,
}

/// A standing interest in alerts for one city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub email: String,
    pub city: String,
    /// Condition DSL text, e.g. `temp < 10` or `rain`.
    pub condition: String,
    pub verified: bool,
    /// Set by the scheduler after a successful send.
    pub last_notified: Option<DateTime<Utc>>,
}

/// A subscription as submitted, before it is stored. Carries the confirmation token.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubscription {
    pub email: String,
    pub city: String,
    pub condition: String,
    pub verification_token: String,
    pub token_expires_at: DateTime<Utc>,
}

/// An unconfirmed subscription looked up by its confirmation token.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingConfirmation {
    pub subscription: Subscription,
    pub token_expires_at: Option<DateTime<Utc>>,
}

/// Message handed to the `Notifier`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    /// Alert for a subscription whose condition held against `weather`.
    pub fn weather_alert(sub: &Subscription, weather: &WeatherSnapshot) -> Self {
        Self {
            to: sub.email.clone(),
            subject: format!("Weather Alert for {}", sub.city),
            body: format!(
                "Condition {} met: current temp {:.1}°C",
                sub.condition.trim(),
                weather.temperature
            ),
        }
    }
}
