//! SQLite-backed store via libsql. Implements SubscriptionStore, SubscriptionRegistry,
//! WeatherSource and WeatherStore.
//!
//! One database file (data/alerts.db) with two tables: `subscriptions` and `weather`
//! (latest snapshot per city). Timestamps are stored as unix milliseconds so the
//! cooldown comparison sees the same instant that was recorded.

use crate::domain::{
    DomainError, NewSubscription, PendingConfirmation, Subscription, WeatherSnapshot,
};
use crate::ports::{SubscriptionRegistry, SubscriptionStore, WeatherSource, WeatherStore};
use chrono::{DateTime, Utc};
use libsql::{Database, Row, params};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const SUBSCRIPTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS subscriptions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL,
    city TEXT NOT NULL,
    condition TEXT NOT NULL,
    verified INTEGER NOT NULL DEFAULT 0,
    verification_token TEXT,
    token_expires_at INTEGER,
    last_notified INTEGER,
    created_at INTEGER NOT NULL,
    UNIQUE (email, city)
)"#;
const SUBSCRIPTIONS_VERIFIED_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_subscriptions_verified ON subscriptions (verified)";
const SUBSCRIPTIONS_TOKEN_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_subscriptions_token ON subscriptions (verification_token)";

const WEATHER_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS weather (
    city TEXT PRIMARY KEY,
    temperature REAL NOT NULL,
    humidity INTEGER NOT NULL,
    condition TEXT NOT NULL,
    observed_at INTEGER NOT NULL
)"#;

const SUBSCRIPTION_COLUMNS: &str =
    "id, email, city, condition, verified, last_notified, token_expires_at";

/// SQLite repository. Safe to share via Arc; each call opens its own connection.
pub struct SqliteRepo {
    db: Database,
    db_path: PathBuf,
}

impl SqliteRepo {
    /// Connect to (or create) `alerts.db` under `base_dir` and ensure the schema exists.
    pub async fn connect(base_dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        let base = base_dir.as_ref();
        std::fs::create_dir_all(base).map_err(|e| DomainError::Repo(e.to_string()))?;
        let db_path = base.join("alerts.db");
        let path_str = db_path.to_string_lossy();
        let db = libsql::Builder::new_local(path_str.as_ref())
            .build()
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?;
        let conn = db.connect().map_err(|e| DomainError::Repo(e.to_string()))?;

        // PRAGMA returns a row; consume it (execute fails when rows are returned).
        let mut wal_rows = conn
            .query("PRAGMA journal_mode=WAL", ())
            .await
            .map_err(|e| DomainError::Repo(format!("WAL pragma failed: {}", e)))?;
        while wal_rows
            .next()
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?
            .is_some()
        {}

        for ddl in [
            SUBSCRIPTIONS_TABLE,
            SUBSCRIPTIONS_VERIFIED_INDEX,
            SUBSCRIPTIONS_TOKEN_INDEX,
            WEATHER_TABLE,
        ] {
            conn.execute(ddl, ())
                .await
                .map_err(|e| DomainError::Repo(e.to_string()))?;
        }

        info!(path = %db_path.display(), "SQLite connected with WAL mode");

        Ok(Self { db, db_path })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn conn(&self) -> Result<libsql::Connection, DomainError> {
        self.db
            .connect()
            .map_err(|e| DomainError::Repo(e.to_string()))
    }

    fn row_to_subscription(row: &Row) -> Result<Subscription, DomainError> {
        let id: i64 = row.get(0).map_err(|e| DomainError::Repo(e.to_string()))?;
        let email: String = row.get(1).map_err(|e| DomainError::Repo(e.to_string()))?;
        let city: String = row.get(2).map_err(|e| DomainError::Repo(e.to_string()))?;
        let condition: String = row.get(3).map_err(|e| DomainError::Repo(e.to_string()))?;
        let verified: i64 = row.get(4).map_err(|e| DomainError::Repo(e.to_string()))?;
        Ok(Subscription {
            id,
            email,
            city,
            condition,
            verified: verified != 0,
            last_notified: optional_millis(row, 5),
        })
    }
}

/// NULL column -> type error -> None
fn optional_millis(row: &Row, idx: i32) -> Option<DateTime<Utc>> {
    row.get::<i64>(idx)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
}

#[async_trait::async_trait]
impl SubscriptionStore for SqliteRepo {
    async fn list_confirmed(&self) -> Result<Vec<Subscription>, DomainError> {
        let conn = self
            .conn()
            .map_err(|e| DomainError::FetchFailure(e.to_string()))?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM subscriptions WHERE verified = 1 ORDER BY id",
                    SUBSCRIPTION_COLUMNS
                ),
                (),
            )
            .await
            .map_err(|e| DomainError::FetchFailure(e.to_string()))?;
        let mut subscriptions = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DomainError::FetchFailure(e.to_string()))?
        {
            subscriptions.push(Self::row_to_subscription(&row)?);
        }
        Ok(subscriptions)
    }

    async fn record_notified(&self, id: i64, at: DateTime<Utc>) -> Result<(), DomainError> {
        let changed = self
            .conn()?
            .execute(
                "UPDATE subscriptions SET last_notified = ?2 WHERE id = ?1",
                params![id, at.timestamp_millis()],
            )
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?;
        if changed == 0 {
            return Err(DomainError::Repo(format!("subscription {} not found", id)));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl SubscriptionRegistry for SqliteRepo {
    async fn create_pending(&self, sub: &NewSubscription) -> Result<i64, DomainError> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                r#"
                INSERT INTO subscriptions
                    (email, city, condition, verified, verification_token, token_expires_at, created_at)
                VALUES (?1, ?2, ?3, 0, ?4, ?5, ?6)
                ON CONFLICT (email, city) DO NOTHING
                "#,
                params![
                    sub.email.as_str(),
                    sub.city.as_str(),
                    sub.condition.as_str(),
                    sub.verification_token.as_str(),
                    sub.token_expires_at.timestamp_millis(),
                    Utc::now().timestamp_millis()
                ],
            )
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?;
        if changed == 0 {
            return Err(DomainError::DuplicateSubscription {
                email: sub.email.clone(),
                city: sub.city.clone(),
            });
        }
        let id = conn.last_insert_rowid();
        debug!(subscription_id = id, city = %sub.city, "pending subscription inserted");
        Ok(id)
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<PendingConfirmation>, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM subscriptions WHERE verification_token = ?1",
                    SUBSCRIPTION_COLUMNS
                ),
                params![token],
            )
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?;
        let Some(row) = rows
            .next()
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?
        else {
            return Ok(None);
        };
        Ok(Some(PendingConfirmation {
            subscription: Self::row_to_subscription(&row)?,
            token_expires_at: optional_millis(&row, 6),
        }))
    }

    async fn confirm(&self, id: i64) -> Result<(), DomainError> {
        let changed = self
            .conn()?
            .execute(
                r#"
                UPDATE subscriptions
                SET verified = 1, verification_token = NULL, token_expires_at = NULL
                WHERE id = ?1
                "#,
                params![id],
            )
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?;
        if changed == 0 {
            return Err(DomainError::Repo(format!("subscription {} not found", id)));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl WeatherSource for SqliteRepo {
    async fn current_weather(&self, city: &str) -> Result<WeatherSnapshot, DomainError> {
        let fetch = |e: libsql::Error| DomainError::FetchFailure(e.to_string());
        let conn = self
            .conn()
            .map_err(|e| DomainError::FetchFailure(e.to_string()))?;
        let mut rows = conn
            .query(
                r#"
                SELECT city, temperature, humidity, condition, observed_at
                FROM weather
                WHERE city = ?1
                "#,
                params![city],
            )
            .await
            .map_err(fetch)?;

        let Some(row) = rows.next().await.map_err(fetch)? else {
            return Err(DomainError::FetchFailure(format!("city not found: {}", city)));
        };
        let city: String = row.get(0).map_err(fetch)?;
        let temperature: f64 = row.get(1).map_err(fetch)?;
        let humidity: i64 = row.get(2).map_err(fetch)?;
        let condition: String = row.get(3).map_err(fetch)?;
        Ok(WeatherSnapshot {
            city,
            temperature,
            humidity: humidity.clamp(0, 100) as u8,
            condition,
            observed_at: optional_millis(&row, 4).unwrap_or_default(),
        })
    }
}

#[async_trait::async_trait]
impl WeatherStore for SqliteRepo {
    async fn save_weather(&self, weather: &WeatherSnapshot) -> Result<(), DomainError> {
        self.conn()?
            .execute(
                r#"
                INSERT INTO weather (city, temperature, humidity, condition, observed_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT (city) DO UPDATE SET
                    temperature = excluded.temperature,
                    humidity = excluded.humidity,
                    condition = excluded.condition,
                    observed_at = excluded.observed_at
                "#,
                params![
                    weather.city.as_str(),
                    weather.temperature,
                    i64::from(weather.humidity),
                    weather.condition.as_str(),
                    weather.observed_at.timestamp_millis()
                ],
            )
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?;
        Ok(())
    }
}
