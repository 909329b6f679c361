use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    TicketSale,
    Refund,
    Payout,
    Commission,
    Fee,
    Withdrawal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
    Reversed,
}

impl EntryStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EntryStatus::Completed
                | EntryStatus::Failed
                | EntryStatus::Cancelled
                | EntryStatus::Reversed
        )
    }
}

/// One immutable monetary movement.
///
/// Amount fields are filled at completion and never mutated afterwards; a
/// correction is always a new, negated entry linked through `reverses`.
/// Invariant at completion: `net_amount = amount - commission_amount - gateway_fee`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub kind: EntryKind,
    /// Gross amount. Negative for refund entries.
    pub amount: Decimal,
    pub commission_amount: Decimal,
    pub gateway_fee: Decimal,
    pub net_amount: Decimal,
    pub currency: String,
    pub gateway: String,
    pub payment_method: Option<String>,
    pub gateway_reference: Option<String>,
    pub status: EntryStatus,
    pub booking_id: Option<Uuid>,
    pub organizer_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub payout_id: Option<Uuid>,
    /// For refund entries: the completed sale being reversed.
    pub reverses: Option<Uuid>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl LedgerEntry {
    /// Checks the settlement identity to the cent.
    pub fn balances(&self) -> bool {
        (self.amount - self.commission_amount - self.gateway_fee - self.net_amount).abs()
            <= Decimal::new(1, 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_settlement_identity() {
        let entry = LedgerEntry {
            id: Uuid::new_v4(),
            kind: EntryKind::TicketSale,
            amount: dec!(2000),
            commission_amount: dec!(200),
            gateway_fee: dec!(58),
            net_amount: dec!(1742),
            currency: "USD".into(),
            gateway: "paystack".into(),
            payment_method: Some("card".into()),
            gateway_reference: Some("ref-1".into()),
            status: EntryStatus::Completed,
            booking_id: None,
            organizer_id: None,
            user_id: None,
            payout_id: None,
            reverses: None,
            reason: None,
            created_at: Utc::now(),
            completed_at: Some(Utc::now()),
        };
        assert!(entry.balances());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(EntryStatus::Completed.is_terminal());
        assert!(EntryStatus::Reversed.is_terminal());
        assert!(!EntryStatus::Pending.is_terminal());
        assert!(!EntryStatus::Processing.is_terminal());
    }
}
