//! Register and confirm flow for alert subscriptions.
//!
//! `create` stores an unverified subscription with a one-day confirmation token and mails
//! the link; `confirm` flips it to verified so the scheduler starts picking it up.

use crate::domain::{DomainError, NewSubscription, Subscription, validate_condition};
use crate::ports::{Notifier, SubscriptionRegistry, WeatherSource};
use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;
use std::sync::Arc;
use tracing::{info, warn};

/// Confirmation link target used when none is configured.
pub const DEFAULT_CONFIRM_URL: &str = "http://localhost:8080/subscriptions/confirm";

const TOKEN_TTL_HOURS: i64 = 24;
const CONFIRM_SUBJECT: &str = "Please confirm your subscription";

pub struct SubscriptionService {
    registry: Arc<dyn SubscriptionRegistry>,
    weather: Arc<dyn WeatherSource>,
    notifier: Arc<dyn Notifier>,
    confirm_url: String,
}

impl SubscriptionService {
    pub fn new(
        registry: Arc<dyn SubscriptionRegistry>,
        weather: Arc<dyn WeatherSource>,
        notifier: Arc<dyn Notifier>,
        confirm_url: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            weather,
            notifier,
            confirm_url: confirm_url.into(),
        }
    }

    /// Register a pending subscription and send its confirmation email. Returns the new id.
    ///
    /// The city must already have a weather record. A second subscription for the same
    /// email and city is a `DuplicateSubscription`.
    pub async fn create(
        &self,
        email: &str,
        city: &str,
        condition: &str,
    ) -> Result<i64, DomainError> {
        let email = email.trim();
        let city = city.trim();
        let condition = condition.trim();
        if !is_plausible_email(email) {
            return Err(DomainError::InvalidSubscription(format!(
                "invalid email {:?}",
                email
            )));
        }
        if city.is_empty() {
            return Err(DomainError::InvalidSubscription("city is required".into()));
        }
        validate_condition(condition)
            .map_err(|e| DomainError::InvalidSubscription(e.to_string()))?;

        self.weather.current_weather(city).await.map_err(|e| {
            warn!(city, error = %e, "subscription rejected: no weather for city");
            DomainError::CityNotFound(city.to_string())
        })?;

        let token = generate_token();
        let expires_at = Utc::now() + TimeDelta::hours(TOKEN_TTL_HOURS);
        let id = self
            .registry
            .create_pending(&NewSubscription {
                email: email.to_string(),
                city: city.to_string(),
                condition: condition.to_string(),
                verification_token: token.clone(),
                token_expires_at: expires_at,
            })
            .await?;
        info!(subscription_id = id, city, "subscription saved, awaiting confirmation");

        let body = self.confirmation_body(&token, expires_at);
        self.notifier
            .send(email, CONFIRM_SUBJECT, &body)
            .await
            .map_err(|e| match e {
                DomainError::NotifierFailure(_) => e,
                other => DomainError::NotifierFailure(other.to_string()),
            })?;
        info!(subscription_id = id, to = email, "confirmation email sent");

        Ok(id)
    }

    /// Confirm the subscription holding `token`. A missing expiry counts as expired.
    pub async fn confirm(&self, token: &str) -> Result<Subscription, DomainError> {
        let pending = self
            .registry
            .find_by_token(token.trim())
            .await?
            .ok_or(DomainError::TokenNotFound)?;

        let expired = pending
            .token_expires_at
            .is_none_or(|expires_at| Utc::now() > expires_at);
        if expired {
            warn!(subscription_id = pending.subscription.id, "confirmation token expired");
            return Err(DomainError::TokenExpired);
        }

        let mut subscription = pending.subscription;
        self.registry.confirm(subscription.id).await?;
        subscription.verified = true;
        info!(subscription_id = subscription.id, "subscription confirmed");
        Ok(subscription)
    }

    fn confirmation_body(&self, token: &str, expires_at: DateTime<Utc>) -> String {
        format!(
            "Click to confirm: {}?token={}\nExpires at: {}",
            self.confirm_url,
            token,
            expires_at.to_rfc2822()
        )
    }
}

/// 16 random bytes, hex encoded.
fn generate_token() -> String {
    hex::encode(rand::thread_rng().r#gen::<[u8; 16]>())
}

/// `local@domain.tld`, no whitespace.
fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
        && !domain.contains('@')
}
