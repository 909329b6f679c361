use super::booking::Booking;
use super::event::{EventConfig, OrganizerConfig};
use super::ledger::LedgerEntry;
use super::payout::{Payout, StuckReason};
use super::refund::RefundRequest;
use super::ticket::Ticket;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

pub type EventStoreRef = Arc<dyn EventStore>;
pub type BookingStoreRef = Arc<dyn BookingStore>;
pub type TicketStoreRef = Arc<dyn TicketStore>;
pub type LedgerStoreRef = Arc<dyn LedgerStore>;
pub type PayoutStoreRef = Arc<dyn PayoutStore>;
pub type RefundStoreRef = Arc<dyn RefundStore>;
pub type PaymentGatewayRef = Arc<dyn PaymentGateway>;
pub type NotifierRef = Arc<dyn Notifier>;

/// Read-only access to event and organizer configuration. The engine never
/// mutates configuration; inventory counters live behind [`EventStore`]'s
/// reservation methods instead.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn event(&self, id: Uuid) -> Result<Option<EventConfig>>;
    async fn organizer(&self, id: Uuid) -> Result<Option<OrganizerConfig>>;

    /// Atomically checks capacity (both the event-wide cap and the ticket
    /// type's own quantity) and reserves `quantity` units. Check and
    /// reservation happen in one critical section; under concurrent requests
    /// for the last units exactly one caller wins.
    async fn try_reserve(
        &self,
        event_id: Uuid,
        ticket_type: &str,
        quantity: u32,
    ) -> Result<ReservationOutcome>;

    /// Returns previously reserved units. Idempotent with respect to the
    /// booking lifecycle: callers release exactly what they reserved.
    async fn release(&self, event_id: Uuid, ticket_type: &str, quantity: u32) -> Result<()>;

    /// Converts reserved units into sold ones and bumps the event's
    /// `tickets_sold` and the organizer's lifetime counter.
    async fn commit_sold(&self, event_id: Uuid, ticket_type: &str, quantity: u32) -> Result<()>;

    async fn tickets_sold(&self, event_id: Uuid) -> Result<u32>;
    async fn organizer_lifetime_sales(&self, organizer_id: Uuid) -> Result<u64>;
}

/// Outcome of an atomic reservation attempt. Losing a race for the last
/// ticket and plain sold-out are deliberately indistinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationOutcome {
    Reserved,
    SoldOut,
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn store(&self, booking: Booking) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Booking>>;
    async fn by_reference(&self, reference: &str) -> Result<Option<Booking>>;
    /// Pending or confirmed bookings for a (user, event) pair.
    async fn live_for_user(&self, user_id: Uuid, event_id: Uuid) -> Result<Vec<Booking>>;
    async fn all_pending(&self) -> Result<Vec<Booking>>;
}

#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Inserts a whole booking's tickets in one atomic step: all or none.
    async fn store_batch(&self, tickets: Vec<Ticket>) -> Result<()>;
    async fn store(&self, ticket: Ticket) -> Result<()>;
    async fn by_code(&self, code: &str) -> Result<Option<Ticket>>;
    async fn by_booking(&self, booking_id: Uuid) -> Result<Vec<Ticket>>;
    async fn all_valid(&self) -> Result<Vec<Ticket>>;
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn store(&self, entry: LedgerEntry) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<LedgerEntry>>;
    async fn by_booking(&self, booking_id: Uuid) -> Result<Vec<LedgerEntry>>;
    async fn by_gateway_reference(&self, reference: &str) -> Result<Option<LedgerEntry>>;
    /// Completed entries for an organizer inside a period, any kind.
    async fn completed_for_organizer(
        &self,
        organizer_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>>;
}

#[async_trait]
pub trait PayoutStore: Send + Sync {
    async fn store(&self, payout: Payout) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Payout>>;
    async fn all_active(&self) -> Result<Vec<Payout>>;
}

#[async_trait]
pub trait RefundStore: Send + Sync {
    async fn store(&self, request: RefundRequest) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<RefundRequest>>;
    async fn open_for_booking(&self, booking_id: Uuid) -> Result<Option<RefundRequest>>;
}

#[derive(Debug, Clone)]
pub struct PaymentIntent {
    pub reference: String,
    pub amount: Decimal,
    pub currency: String,
    pub method: String,
}

#[derive(Debug, Clone)]
pub struct GatewayAck {
    pub gateway: String,
    pub gateway_reference: String,
}

/// Provider-reported state of a transfer. Anything the provider cannot
/// answer definitively (including timeouts on our side) is `Inconclusive`
/// and gets re-checked on the next reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    Completed,
    Failed,
    Inconclusive,
}

/// The payment gateway boundary. Responses are untrusted external input;
/// callers validate before any state transition.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initialize_payment(&self, intent: &PaymentIntent) -> Result<GatewayAck>;
    async fn transfer_status(&self, reference: &str) -> Result<TransferStatus>;
}

/// Events the engine emits for out-of-scope delivery (email/SMS/push).
#[derive(Debug, Clone)]
pub enum Notification {
    BookingConfirmed {
        booking_id: Uuid,
        reference: String,
        user_id: Uuid,
    },
    PayoutStuck {
        payout_id: Uuid,
        organizer_id: Uuid,
        processor_reference: Option<String>,
        reason: StuckReason,
        age_hours: i64,
    },
    RefundProcessed {
        booking_id: Uuid,
        amount: Decimal,
        is_partial: bool,
    },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification) -> Result<()>;
}
