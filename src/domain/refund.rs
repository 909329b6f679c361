use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefundStatus {
    Pending,
    Reviewing,
    Approved,
    Rejected,
    Processed,
    Cancelled,
}

impl RefundStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RefundStatus::Rejected | RefundStatus::Processed | RefundStatus::Cancelled
        )
    }
}

/// A customer's request to reverse part or all of a booking's payment.
/// At most one non-terminal request may exist per booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequest {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub requested_by: Uuid,
    pub requested_amount: Decimal,
    pub approved_amount: Option<Decimal>,
    pub status: RefundStatus,
    pub reason: Option<String>,
    pub reviewer: Option<String>,
    pub review_notes: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}
