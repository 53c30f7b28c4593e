//! Writes the latest weather snapshot for a city.

use crate::domain::{DomainError, WeatherSnapshot};
use crate::ports::WeatherStore;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

pub struct WeatherService {
    store: Arc<dyn WeatherStore>,
}

impl WeatherService {
    pub fn new(store: Arc<dyn WeatherStore>) -> Self {
        Self { store }
    }

    /// Replace the stored snapshot for `city`, stamped with the current time.
    pub async fn update_weather(
        &self,
        city: &str,
        temperature: f64,
        humidity: u8,
        condition: &str,
    ) -> Result<WeatherSnapshot, DomainError> {
        let city = city.trim();
        if city.is_empty() {
            return Err(DomainError::InvalidWeather("city is required".into()));
        }
        if humidity > 100 {
            return Err(DomainError::InvalidWeather(format!(
                "humidity {} is outside 0-100",
                humidity
            )));
        }
        if !temperature.is_finite() {
            return Err(DomainError::InvalidWeather(format!(
                "temperature {} is not a finite number",
                temperature
            )));
        }

        let snapshot = WeatherSnapshot {
            city: city.to_string(),
            temperature,
            humidity,
            condition: condition.trim().to_string(),
            observed_at: Utc::now(),
        };
        self.store.save_weather(&snapshot).await?;
        info!(city, temperature, humidity, condition = %snapshot.condition, "weather updated");
        Ok(snapshot)
    }
}
