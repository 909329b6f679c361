use crate::domain::ports::{Notification, Notifier};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Collects notifications for assertions in tests.
#[derive(Default, Clone)]
pub struct RecordingNotifier {
    sent: Arc<RwLock<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: Notification) -> Result<()> {
        self.sent.write().await.push(notification);
        Ok(())
    }
}

/// Logs notifications; the delivery mechanism itself is out of scope.
#[derive(Default, Clone)]
pub struct TracingNotifier;

impl TracingNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, notification: Notification) -> Result<()> {
        match &notification {
            Notification::BookingConfirmed { reference, .. } => {
                tracing::info!(reference, "notify: booking confirmed");
            }
            Notification::PayoutStuck {
                payout_id,
                organizer_id,
                processor_reference,
                reason,
                age_hours,
            } => {
                tracing::warn!(
                    payout = %payout_id,
                    organizer = %organizer_id,
                    reference = ?processor_reference,
                    reason = ?reason,
                    age_hours,
                    "notify: payout stuck"
                );
            }
            Notification::RefundProcessed {
                booking_id,
                amount,
                is_partial,
            } => {
                tracing::info!(booking = %booking_id, amount = %amount, partial = is_partial, "notify: refund processed");
            }
        }
        Ok(())
    }
}
