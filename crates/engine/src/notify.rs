//! Outbound notification boundary.

use async_trait::async_trait;
use thiserror::Error;

/// Delivery failure reported by a notifier.
#[derive(Debug, Error)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Sends a text notification to a user.
///
/// Delivery is best-effort and at-most-once: the engine logs a failure
/// and moves on, it never retries and never surfaces the failure to the
/// operation that produced the notification.
#[async_trait]
pub trait Notify: Send + Sync {
    async fn notify(&self, user_id: &str, text: &str) -> Result<(), NotifyError>;
}
