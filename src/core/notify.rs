//! Outbound confirmation messages.
//!
//! Delivery is fire-and-forget: [`dispatch`] spawns the send and only logs a failure.
//! A booking or an order is final before any message leaves.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// A message for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Destination address
    pub recipient: String,
    /// Subject line
    pub subject: String,
    /// Plain-text body
    pub body: String,
}

/// Failure reported by a [`Notifier`].
#[derive(Debug, Error)]
#[error("Notification delivery failed: {message}")]
pub struct NotifyError {
    /// Transport-specific detail
    pub message: String,
}

/// Sends notifications through some transport (mail, queue, log).
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers `notification`.
    async fn send(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        info!(
            recipient = %notification.recipient,
            subject = %notification.subject,
            "Notification (log only)"
        );
        debug!(body = %notification.body);
        Ok(())
    }
}

/// Sends `notification` in the background. Failures are logged and dropped.
pub fn dispatch(notifier: Arc<dyn Notifier>, notification: Notification) {
    tokio::spawn(async move {
        let subject = notification.subject.clone();
        if let Err(e) = notifier.send(notification).await {
            warn!(subject = %subject, error = %e, "Failed to send notification");
        }
    });
}

/// Dispatches to `recipient` if the customer has an address on file.
pub fn dispatch_to(
    notifier: &Arc<dyn Notifier>,
    recipient: Option<&str>,
    subject: String,
    body: String,
) {
    match recipient {
        Some(recipient) => dispatch(
            Arc::clone(notifier),
            Notification {
                recipient: recipient.to_string(),
                subject,
                body,
            },
        ),
        None => debug!(subject = %subject, "No recipient address; notification skipped"),
    }
}
