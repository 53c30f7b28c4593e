//! Application configuration. Schedule, storage path, mail relay, confirmation link.

use crate::usecases::{DEFAULT_CONFIRM_URL, DEFAULT_SEND_TIMEOUT, SchedulePolicy};
use serde::Deserialize;
use std::time::Duration;

/// Default sender address when `mail_from` is unset.
pub const DEFAULT_MAIL_FROM: &str = "weather-alert@localhost";

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Directory holding alerts.db. Read from WEATHER_ALERTS_DATA_DIR.
    #[serde(default)]
    pub data_dir: Option<String>,

    /// Schedule preset: "minute" or "daily". Read from WEATHER_ALERTS_SCHEDULE.
    #[serde(default)]
    pub schedule: Option<String>,

    /// Overrides the preset tick interval. Read from WEATHER_ALERTS_TICK_SECS.
    #[serde(default)]
    pub tick_secs: Option<u64>,

    /// Overrides the preset cooldown window. Read from WEATHER_ALERTS_COOLDOWN_SECS.
    #[serde(default)]
    pub cooldown_secs: Option<u64>,

    /// Upper bound on one notifier call. Read from WEATHER_ALERTS_SEND_TIMEOUT_SECS.
    #[serde(default)]
    pub send_timeout_secs: Option<u64>,

    // ─────────────────────────────────────────────────────────────────────────
    // Mail relay
    // ─────────────────────────────────────────────────────────────────────────
    /// Relay endpoint. When unset, alerts are only logged. Read from WEATHER_ALERTS_NOTIFIER_URL.
    #[serde(default)]
    pub notifier_url: Option<String>,

    /// Bearer token for the relay. Read from WEATHER_ALERTS_NOTIFIER_TOKEN.
    #[serde(default)]
    pub notifier_token: Option<String>,

    /// Sender address. Read from WEATHER_ALERTS_MAIL_FROM.
    #[serde(default)]
    pub mail_from: Option<String>,

    /// Base URL of the confirmation link in subscription emails.
    /// Read from WEATHER_ALERTS_CONFIRM_URL.
    #[serde(default)]
    pub confirm_url: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        if let Ok(path) = std::env::var("WEATHER_ALERTS_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        c = c.add_source(config::Environment::with_prefix("WEATHER_ALERTS").try_parsing(true));
        let cfg: Self = c.build()?.try_deserialize()?;
        cfg.schedule_policy()?;
        Ok(cfg)
    }

    pub fn data_dir_or_default(&self) -> &str {
        self.data_dir.as_deref().unwrap_or("./data")
    }

    /// Preset from `schedule`, with `tick_secs` / `cooldown_secs` applied on top.
    pub fn schedule_policy(&self) -> Result<SchedulePolicy, config::ConfigError> {
        let preset = match self
            .schedule
            .as_deref()
            .map(|s| s.trim().to_ascii_lowercase())
            .as_deref()
        {
            None | Some("minute") | Some("minutely") => SchedulePolicy::minutely(),
            Some("daily") | Some("day") => SchedulePolicy::daily(),
            Some(other) => {
                return Err(config::ConfigError::Message(format!(
                    "unknown schedule {:?} (expected \"minute\" or \"daily\")",
                    other
                )));
            }
        };

        SchedulePolicy::new(
            self.tick_secs
                .map(Duration::from_secs)
                .unwrap_or(preset.tick_interval()),
            self.cooldown_secs
                .map(Duration::from_secs)
                .unwrap_or(preset.cooldown()),
        )
        .map_err(|e| config::ConfigError::Message(e.to_string()))
    }

    /// Returns the per-send timeout. Defaults to 30 seconds.
    pub fn send_timeout(&self) -> Duration {
        self.send_timeout_secs
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SEND_TIMEOUT)
    }

    pub fn mail_from_or_default(&self) -> String {
        self.mail_from
            .clone()
            .unwrap_or_else(|| DEFAULT_MAIL_FROM.to_string())
    }

    pub fn confirm_url_or_default(&self) -> &str {
        self.confirm_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_CONFIRM_URL)
    }

    /// Returns true if a mail relay endpoint is configured.
    pub fn is_relay_configured(&self) -> bool {
        self.notifier_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }
}
