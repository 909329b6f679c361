use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Draft,
    Published,
    Cancelled,
    Completed,
}

/// How an event-level commission rate is to be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommissionKind {
    /// Rate is a percentage of the booking subtotal.
    Percentage,
    /// Rate is an absolute amount in the booking currency.
    Fixed,
}

/// One sellable ticket category of an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketTypeConfig {
    pub name: String,
    pub price: Decimal,
    /// Total units this type may ever sell.
    pub quantity: u32,
    pub max_per_order: u32,
    pub sale_start: Option<DateTime<Utc>>,
    pub sale_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub transferable: bool,
}

impl TicketTypeConfig {
    /// Whether `now` falls inside the configured sale window.
    pub fn on_sale_at(&self, now: DateTime<Utc>) -> bool {
        if let Some(start) = self.sale_start
            && now < start
        {
            return false;
        }
        if let Some(end) = self.sale_end
            && now > end
        {
            return false;
        }
        true
    }
}

/// Read-only event configuration supplied by the (out of scope) CRUD layer.
///
/// The engine never writes to this; inventory counters live with the stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub title: String,
    pub status: EventStatus,
    pub event_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub capacity: u32,
    pub currency: String,
    pub ticket_types: Vec<TicketTypeConfig>,
    /// Event-level flat platform fee percentage. Highest-precedence
    /// commission source when set and non-zero.
    pub platform_fee: Option<Decimal>,
    pub commission_rate: Option<Decimal>,
    pub commission_kind: Option<CommissionKind>,
    /// Per-event secret for QR signing and ticket hashes.
    pub qr_secret: String,
}

impl EventConfig {
    pub fn ticket_type(&self, name: &str) -> Option<&TicketTypeConfig> {
        self.ticket_types.iter().find(|t| t.name == name)
    }

    /// The instant tickets with no explicit validity window stop being
    /// scannable: 24 hours after the event ends.
    pub fn tickets_expire_at(&self) -> DateTime<Utc> {
        self.end_date.unwrap_or(self.event_date) + chrono::Duration::hours(24)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizerConfig {
    pub id: Uuid,
    pub name: String,
    /// Organizer-level default commission percentage.
    pub commission_rate: Option<Decimal>,
}
