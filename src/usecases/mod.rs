//! Application use cases. Orchestrate domain logic via ports.

pub mod alert_scheduler;
pub mod notify_service;
pub mod subscription_service;
pub mod weather_service;

#[cfg(test)]
pub(crate) mod fakes;

pub use alert_scheduler::{AlertScheduler, SchedulePolicy, TickClock, TickReport};
pub use notify_service::{DEFAULT_SEND_TIMEOUT, NotificationService};
pub use subscription_service::{DEFAULT_CONFIRM_URL, SubscriptionService};
pub use weather_service::WeatherService;
