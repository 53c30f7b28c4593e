//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    /// `temp <op>` matched but the threshold is not a signed decimal.
    #[error("malformed threshold {literal:?} in condition {condition:?}")]
    MalformedThreshold { condition: String, literal: String },

    #[error("unknown condition {0:?}")]
    UnknownCondition(String),

    #[error("notifier failed: {0}")]
    NotifierFailure(String),

    /// Weather or subscription lookup failed.
    #[error("fetch failed: {0}")]
    FetchFailure(String),

    #[error("repository error: {0}")]
    Repo(String),

    #[error("invalid subscription: {0}")]
    InvalidSubscription(String),

    #[error("city not found: {0}")]
    CityNotFound(String),

    #[error("duplicate subscription for {email} in {city}")]
    DuplicateSubscription { email: String, city: String },

    #[error("confirmation token not found")]
    TokenNotFound,

    #[error("confirmation token expired")]
    TokenExpired,

    #[error("invalid weather: {0}")]
    InvalidWeather(String),

    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),
}
