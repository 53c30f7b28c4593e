//! Log-only notifier for running without a mail relay.

use crate::domain::DomainError;
use crate::ports::Notifier;
use tracing::info;

/// Writes each alert to the log and reports success.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DomainError> {
        info!(to, subject, body, "[LOG] alert not delivered (no relay configured)");
        Ok(())
    }
}
