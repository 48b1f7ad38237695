//! Operator notifications
//!
//! [`Notifier`] is transport-agnostic; the Telegram implementation lives in
//! `bot::telegram`. Delivery is best effort: callers log and swallow errors.

use crate::error::NotifyError;
use async_trait::async_trait;
use tracing::info;

/// Outbound channel for operator-facing status messages
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one text message to the operator.
    async fn notify(&self, text: &str) -> Result<(), NotifyError>;
}

/// Notifier used when no operator chat is configured: writes to the log only
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, text: &str) -> Result<(), NotifyError> {
        info!(notification = %text, "Operator notification");
        Ok(())
    }
}
