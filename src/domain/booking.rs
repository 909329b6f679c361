use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minutes an unpaid booking may sit before it stops blocking the
/// (user, event) slot and becomes fair game for the abandonment sweep.
pub const ABANDONMENT_CUTOFF_MINUTES: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Refunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Processing,
    Paid,
}

/// One (ticket type, quantity) line of a booking. `unit_price` is always the
/// server-side configured price, never client input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingLine {
    pub ticket_type: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl BookingLine {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Contact details captured at checkout; tickets inherit these as holder
/// identity unless overridden per ticket.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub reference: String,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub lines: Vec<BookingLine>,
    pub customer: CustomerDetails,
    pub subtotal: Decimal,
    pub service_fee: Decimal,
    pub total_amount: Decimal,
    pub currency: String,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// A live booking blocks further bookings by the same user for the same
    /// event. Confirmed bookings always block; pending ones only until the
    /// abandonment cutoff.
    pub fn blocks_rebooking_at(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            BookingStatus::Confirmed => true,
            BookingStatus::Pending => !self.is_abandoned_at(now),
            BookingStatus::Cancelled | BookingStatus::Refunded => false,
        }
    }

    pub fn is_abandoned_at(&self, now: DateTime<Utc>) -> bool {
        self.status == BookingStatus::Pending
            && self.payment_status != PaymentStatus::Paid
            && now - self.created_at > Duration::minutes(ABANDONMENT_CUTOFF_MINUTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn booking(created_minutes_ago: i64, status: BookingStatus) -> Booking {
        let now = Utc::now();
        let created = now - Duration::minutes(created_minutes_ago);
        Booking {
            id: Uuid::new_v4(),
            reference: "BK-TEST".into(),
            user_id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            lines: vec![BookingLine {
                ticket_type: "Regular".into(),
                quantity: 2,
                unit_price: dec!(1000),
            }],
            customer: CustomerDetails::default(),
            subtotal: dec!(2000),
            service_fee: dec!(0),
            total_amount: dec!(2000),
            currency: "USD".into(),
            status,
            payment_status: PaymentStatus::Unpaid,
            expires_at: created + Duration::minutes(ABANDONMENT_CUTOFF_MINUTES),
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_fresh_pending_blocks_rebooking() {
        let b = booking(5, BookingStatus::Pending);
        assert!(b.blocks_rebooking_at(Utc::now()));
        assert!(!b.is_abandoned_at(Utc::now()));
    }

    #[test]
    fn test_stale_pending_does_not_block() {
        let b = booking(45, BookingStatus::Pending);
        assert!(b.is_abandoned_at(Utc::now()));
        assert!(!b.blocks_rebooking_at(Utc::now()));
    }

    #[test]
    fn test_confirmed_always_blocks() {
        let b = booking(1000, BookingStatus::Confirmed);
        assert!(b.blocks_rebooking_at(Utc::now()));
    }

    #[test]
    fn test_line_totals() {
        let b = booking(0, BookingStatus::Pending);
        assert_eq!(b.total_quantity(), 2);
        assert_eq!(b.lines[0].line_total(), dec!(2000));
    }
}
