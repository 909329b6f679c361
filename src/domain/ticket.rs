use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Valid,
    Used,
    Transferred,
    Cancelled,
    Expired,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Valid => "valid",
            TicketStatus::Used => "used",
            TicketStatus::Transferred => "transferred",
            TicketStatus::Cancelled => "cancelled",
            TicketStatus::Expired => "expired",
        }
    }
}

/// Most recent ownership change. Single-hop: the endpoint user ids plus
/// timestamp and reason are enough to reconstruct the chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRecord {
    pub transferred_from: Uuid,
    pub transferred_to: Uuid,
    pub transferred_at: DateTime<Utc>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub used_at: DateTime<Utc>,
    pub used_by: String,
    pub entry_gate: Option<String>,
}

/// One admission unit tied to exactly one booking line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    /// Unique human-presentable code carried by the QR payload.
    pub code: String,
    /// hex(HMAC-SHA256(code ++ event_id, event secret)), fixed at issuance.
    pub security_hash: String,
    pub booking_id: Uuid,
    pub event_id: Uuid,
    /// Position of this ticket within its booking (line index, unit index);
    /// the issuance key that makes re-delivery of a payment callback a no-op.
    pub line_seq: u32,
    pub ticket_type: String,
    pub price: Decimal,
    pub currency: String,
    pub holder_name: String,
    pub holder_email: String,
    pub assigned_to: Uuid,
    pub status: TicketStatus,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub transfer: Option<TransferRecord>,
    pub usage: Option<UsageRecord>,
    pub issued_at: DateTime<Utc>,
}

impl Ticket {
    /// Whether the expiry sweep should move this ticket to `Expired`:
    /// a valid ticket whose validity window has closed, or (without an
    /// explicit window) whose event ended more than 24h ago.
    pub fn expirable_at(&self, now: DateTime<Utc>, event_cutoff: DateTime<Utc>) -> bool {
        if self.status != TicketStatus::Valid {
            return false;
        }
        match self.valid_until {
            Some(until) => until < now,
            None => event_cutoff < now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn ticket(status: TicketStatus, valid_until: Option<DateTime<Utc>>) -> Ticket {
        Ticket {
            id: Uuid::new_v4(),
            code: "TKT-1".into(),
            security_hash: String::new(),
            booking_id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            line_seq: 0,
            ticket_type: "Regular".into(),
            price: dec!(1000),
            currency: "USD".into(),
            holder_name: "Ada".into(),
            holder_email: "ada@example.com".into(),
            assigned_to: Uuid::new_v4(),
            status,
            valid_from: None,
            valid_until,
            transfer: None,
            usage: None,
            issued_at: Utc::now(),
        }
    }

    #[test]
    fn test_expirable_by_window() {
        let now = Utc::now();
        let far_cutoff = now + Duration::days(30);
        let t = ticket(TicketStatus::Valid, Some(now - Duration::hours(1)));
        assert!(t.expirable_at(now, far_cutoff));

        let t = ticket(TicketStatus::Valid, Some(now + Duration::hours(1)));
        assert!(!t.expirable_at(now, far_cutoff));
    }

    #[test]
    fn test_expirable_by_event_end() {
        let now = Utc::now();
        let t = ticket(TicketStatus::Valid, None);
        assert!(t.expirable_at(now, now - Duration::hours(1)));
        assert!(!t.expirable_at(now, now + Duration::hours(1)));
    }

    #[test]
    fn test_used_ticket_never_expires() {
        let now = Utc::now();
        let t = ticket(TicketStatus::Used, Some(now - Duration::hours(1)));
        assert!(!t.expirable_at(now, now - Duration::hours(1)));
    }
}
