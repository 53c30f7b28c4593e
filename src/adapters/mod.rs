//! Infrastructure adapters. Implement outbound ports.
//!
//! SQLite storage, mail delivery. Map errors to DomainError.

pub mod notify;
pub mod persistence;
