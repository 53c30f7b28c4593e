//! Port traits. API boundaries for the hexagon.
//!
//! Outbound only: the core calls into weather, storage and delivery infrastructure,
//! and the register/confirm flow writes through the registry and weather store.

pub mod outbound;

pub use outbound::{
    Notifier, SubscriptionRegistry, SubscriptionStore, WeatherSource, WeatherStore,
};
