//! In-memory port implementations for use-case tests.

use crate::domain::{
    DomainError, NewSubscription, Notification, PendingConfirmation, Subscription,
    WeatherSnapshot,
};
use crate::ports::{Notifier, SubscriptionRegistry, SubscriptionStore, WeatherSource, WeatherStore};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

pub fn subscription(id: i64, city: &str, condition: &str) -> Subscription {
    Subscription {
        id,
        email: format!("user{id}@example.com"),
        city: city.to_string(),
        condition: condition.to_string(),
        verified: true,
        last_notified: None,
    }
}

pub fn snapshot(city: &str, temperature: f64, condition: &str) -> WeatherSnapshot {
    WeatherSnapshot {
        city: city.to_string(),
        temperature,
        humidity: 60,
        condition: condition.to_string(),
        observed_at: Utc::now(),
    }
}

/// Keeps subscriptions in memory; `record_notified` writes back into them.
#[derive(Default)]
pub struct FakeStore {
    pub subscriptions: Mutex<Vec<Subscription>>,
    pub recorded: Mutex<Vec<(i64, DateTime<Utc>)>>,
    pub fail_list: bool,
    pub fail_record: bool,
}

impl FakeStore {
    pub fn with(subscriptions: Vec<Subscription>) -> Self {
        Self {
            subscriptions: Mutex::new(subscriptions),
            ..Self::default()
        }
    }
}

#[async_trait::async_trait]
impl SubscriptionStore for FakeStore {
    async fn list_confirmed(&self) -> Result<Vec<Subscription>, DomainError> {
        if self.fail_list {
            return Err(DomainError::FetchFailure("store offline".into()));
        }
        Ok(self.subscriptions.lock().await.clone())
    }

    async fn record_notified(&self, id: i64, at: DateTime<Utc>) -> Result<(), DomainError> {
        if self.fail_record {
            return Err(DomainError::Repo("write rejected".into()));
        }
        self.recorded.lock().await.push((id, at));
        if let Some(sub) = self.subscriptions.lock().await.iter_mut().find(|s| s.id == id) {
            sub.last_notified = Some(at);
        }
        Ok(())
    }
}

/// Serves fixed snapshots by city and logs every lookup.
#[derive(Default)]
pub struct FakeWeather {
    pub snapshots: HashMap<String, WeatherSnapshot>,
    pub lookups: Mutex<Vec<String>>,
}

impl FakeWeather {
    pub fn with(snapshots: Vec<WeatherSnapshot>) -> Self {
        Self {
            snapshots: snapshots.into_iter().map(|w| (w.city.clone(), w)).collect(),
            lookups: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl WeatherSource for FakeWeather {
    async fn current_weather(&self, city: &str) -> Result<WeatherSnapshot, DomainError> {
        self.lookups.lock().await.push(city.to_string());
        self.snapshots
            .get(city)
            .cloned()
            .ok_or_else(|| DomainError::FetchFailure(format!("city not found: {city}")))
    }
}

/// Records sent messages; can be told to fail, stall, or cancel a token mid-send.
#[derive(Default)]
pub struct FakeNotifier {
    pub sent: Mutex<Vec<Notification>>,
    pub attempts: AtomicUsize,
    pub fail: bool,
    pub delay: Option<Duration>,
    pub cancel_on_send: Option<CancellationToken>,
}

impl FakeNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Notifier for FakeNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DomainError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(token) = &self.cancel_on_send {
            token.cancel();
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(DomainError::NotifierFailure("smtp: connection refused".into()));
        }
        self.sent.lock().await.push(Notification {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

/// One stored row of `FakeRegistry`.
#[derive(Debug, Clone)]
pub struct RegistryRow {
    pub subscription: Subscription,
    pub token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
}

/// In-memory registry with the same (email, city) uniqueness as the SQLite table.
#[derive(Default)]
pub struct FakeRegistry {
    pub rows: Mutex<Vec<RegistryRow>>,
}

impl FakeRegistry {
    pub async fn insert_pending(&self, token: &str, expires_at: Option<DateTime<Utc>>) -> i64 {
        let mut rows = self.rows.lock().await;
        let id = rows.len() as i64 + 1;
        let mut sub = subscription(id, "Kyiv", "temp < 10");
        sub.verified = false;
        rows.push(RegistryRow {
            subscription: sub,
            token: Some(token.to_string()),
            token_expires_at: expires_at,
        });
        id
    }
}

#[async_trait::async_trait]
impl SubscriptionRegistry for FakeRegistry {
    async fn create_pending(&self, sub: &NewSubscription) -> Result<i64, DomainError> {
        let mut rows = self.rows.lock().await;
        if rows
            .iter()
            .any(|r| r.subscription.email == sub.email && r.subscription.city == sub.city)
        {
            return Err(DomainError::DuplicateSubscription {
                email: sub.email.clone(),
                city: sub.city.clone(),
            });
        }
        let id = rows.len() as i64 + 1;
        rows.push(RegistryRow {
            subscription: Subscription {
                id,
                email: sub.email.clone(),
                city: sub.city.clone(),
                condition: sub.condition.clone(),
                verified: false,
                last_notified: None,
            },
            token: Some(sub.verification_token.clone()),
            token_expires_at: Some(sub.token_expires_at),
        });
        Ok(id)
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<PendingConfirmation>, DomainError> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .find(|r| r.token.as_deref() == Some(token))
            .map(|r| PendingConfirmation {
                subscription: r.subscription.clone(),
                token_expires_at: r.token_expires_at,
            }))
    }

    async fn confirm(&self, id: i64) -> Result<(), DomainError> {
        let mut rows = self.rows.lock().await;
        let row = rows
            .iter_mut()
            .find(|r| r.subscription.id == id)
            .ok_or_else(|| DomainError::Repo(format!("subscription {id} not found")))?;
        row.subscription.verified = true;
        row.token = None;
        row.token_expires_at = None;
        Ok(())
    }
}

/// Collects saved snapshots.
#[derive(Default)]
pub struct FakeWeatherStore {
    pub saved: Mutex<Vec<WeatherSnapshot>>,
}

#[async_trait::async_trait]
impl WeatherStore for FakeWeatherStore {
    async fn save_weather(&self, weather: &WeatherSnapshot) -> Result<(), DomainError> {
        self.saved.lock().await.push(weather.clone());
        Ok(())
    }
}
