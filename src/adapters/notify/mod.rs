//! Notifier adapters. Deliver alert messages.
//!
//! `HttpNotifier` posts to a mail relay; `LogNotifier` only logs (no relay configured).

pub mod http_notifier;
pub mod log_notifier;

pub use http_notifier::HttpNotifier;
pub use log_notifier::LogNotifier;
