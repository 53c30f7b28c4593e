//! Core domain layer. No external I/O dependencies.
//!
//! Entities, the condition DSL, and errors live here. Dependencies flow inward.

pub mod condition;
pub mod entities;
pub mod errors;

pub use condition::{CompareOp, Condition, evaluate, validate_condition};
pub use entities::{
    NewSubscription, Notification, PendingConfirmation, Subscription, WeatherSnapshot,
};
pub use errors::DomainError;
