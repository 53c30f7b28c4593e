//! Recurring evaluation of confirmed subscriptions.
//!
//! Each tick: list confirmed subscriptions -> cooldown gate -> fetch weather -> decide/send
//! -> record `last_notified`. One subscription failing never stops the rest of the tick;
//! only a failed listing aborts it. Ticks run one after another in a single task.

use crate::domain::{DomainError, Subscription};
use crate::ports::{SubscriptionStore, WeatherSource};
use crate::usecases::notify_service::NotificationService;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const MINUTE: Duration = Duration::from_secs(60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Tick cadence and per-subscription cooldown window. Both are non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulePolicy {
    tick_interval: Duration,
    cooldown: Duration,
}

impl SchedulePolicy {
    pub fn new(tick_interval: Duration, cooldown: Duration) -> Result<Self, DomainError> {
        if tick_interval.is_zero() {
            return Err(DomainError::InvalidSchedule(
                "tick interval must be greater than zero".into(),
            ));
        }
        if cooldown.is_zero() {
            return Err(DomainError::InvalidSchedule(
                "cooldown must be greater than zero".into(),
            ));
        }
        Ok(Self {
            tick_interval,
            cooldown,
        })
    }

    /// Tick every minute, at most one alert per subscription per minute.
    pub const fn minutely() -> Self {
        Self {
            tick_interval: MINUTE,
            cooldown: MINUTE,
        }
    }

    /// Tick once a day, at most one alert per subscription per day.
    pub const fn daily() -> Self {
        Self {
            tick_interval: DAY,
            cooldown: DAY,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Whether a subscription last notified at `last_notified` may be alerted at `now`.
    pub fn is_due(&self, last_notified: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        let Some(last) = last_notified else {
            return true;
        };
        let elapsed = now.signed_duration_since(last);
        TimeDelta::from_std(self.cooldown).is_ok_and(|cooldown| elapsed >= cooldown)
    }
}

impl Default for SchedulePolicy {
    fn default() -> Self {
        Self::minutely()
    }
}

/// Maps scheduled tick instants onto wall-clock time.
///
/// Fixed once when the loop starts, so consecutive ticks are exactly one interval apart
/// in wall time no matter how late the task wakes up.
#[derive(Debug, Clone, Copy)]
pub struct TickClock {
    origin_instant: Instant,
    origin_wall: DateTime<Utc>,
}

impl TickClock {
    pub fn new(origin_instant: Instant, origin_wall: DateTime<Utc>) -> Self {
        Self {
            origin_instant,
            origin_wall,
        }
    }

    pub fn start() -> Self {
        Self::new(Instant::now(), Utc::now())
    }

    pub fn wall_time(&self, scheduled: Instant) -> DateTime<Utc> {
        let elapsed = scheduled.saturating_duration_since(self.origin_instant);
        TimeDelta::from_std(elapsed)
            .ok()
            .and_then(|d| self.origin_wall.checked_add_signed(d))
            .unwrap_or(self.origin_wall)
    }
}

/// Counters for one tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub considered: usize,
    pub cooled_down: usize,
    pub not_matched: usize,
    pub notified: usize,
    pub failed: usize,
}

enum Outcome {
    CooledDown,
    NotMatched,
    Notified,
}

/// Recurring evaluation scheduler.
pub struct AlertScheduler {
    subscriptions: Arc<dyn SubscriptionStore>,
    weather: Arc<dyn WeatherSource>,
    notifications: Arc<NotificationService>,
    policy: SchedulePolicy,
}

impl AlertScheduler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionStore>,
        weather: Arc<dyn WeatherSource>,
        notifications: Arc<NotificationService>,
        policy: SchedulePolicy,
    ) -> Self {
        Self {
            subscriptions,
            weather,
            notifications,
            policy,
        }
    }

    pub fn policy(&self) -> SchedulePolicy {
        self.policy
    }

    /// Run ticks until `shutdown` is cancelled. The first tick fires immediately.
    ///
    /// Each tick is evaluated as of its scheduled time, not the moment the task woke up.
    /// Cancellation is observed between ticks and between subscriptions, so a send that
    /// already started is always followed by its `record_notified`.
    pub async fn run(&self, shutdown: CancellationToken) {
        let clock = TickClock::start();
        let mut ticker = tokio::time::interval(self.policy.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            tick_secs = self.policy.tick_interval.as_secs(),
            cooldown_secs = self.policy.cooldown.as_secs(),
            "alert scheduler started"
        );

        loop {
            let scheduled = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                at = ticker.tick() => at,
            };
            if let Err(e) = self.tick(clock.wall_time(scheduled), &shutdown).await {
                error!(error = %e, "tick aborted");
            }
        }

        info!("alert scheduler stopped");
    }

    /// Run a single tick as of `now`.
    pub async fn run_tick(&self, now: DateTime<Utc>) -> Result<TickReport, DomainError> {
        self.tick(now, &CancellationToken::new()).await
    }

    async fn tick(
        &self,
        now: DateTime<Utc>,
        shutdown: &CancellationToken,
    ) -> Result<TickReport, DomainError> {
        let subscriptions = self
            .subscriptions
            .list_confirmed()
            .await
            .map_err(|e| match e {
                DomainError::FetchFailure(_) => e,
                other => DomainError::FetchFailure(other.to_string()),
            })?;

        let eligible: Vec<&Subscription> = subscriptions.iter().filter(|s| s.verified).collect();

        let mut report = TickReport::default();
        for sub in eligible.iter().copied() {
            if shutdown.is_cancelled() {
                info!(
                    remaining = eligible.len() - report.considered,
                    "shutdown requested; ending tick early"
                );
                break;
            }
            report.considered += 1;
            match self.process(sub, now).await {
                Ok(Outcome::CooledDown) => report.cooled_down += 1,
                Ok(Outcome::NotMatched) => report.not_matched += 1,
                Ok(Outcome::Notified) => report.notified += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        subscription_id = sub.id,
                        city = %sub.city,
                        condition = %sub.condition,
                        error = %e,
                        "subscription skipped this tick"
                    );
                }
            }
        }

        info!(
            considered = report.considered,
            notified = report.notified,
            not_matched = report.not_matched,
            cooled_down = report.cooled_down,
            failed = report.failed,
            "tick complete"
        );
        Ok(report)
    }

    async fn process(&self, sub: &Subscription, now: DateTime<Utc>) -> Result<Outcome, DomainError> {
        if !self.policy.is_due(sub.last_notified, now) {
            debug!(subscription_id = sub.id, "within cooldown; skipping");
            return Ok(Outcome::CooledDown);
        }

        let weather = self.weather.current_weather(&sub.city).await?;
        if !self.notifications.evaluate_and_notify(sub, &weather).await? {
            return Ok(Outcome::NotMatched);
        }

        self.subscriptions
            .record_notified(sub.id, now)
            .await
            .inspect_err(|e| {
                error!(
                    subscription_id = sub.id,
                    error = %e,
                    "alert sent but last_notified was not recorded"
                )
            })?;
        Ok(Outcome::Notified)
    }
}
