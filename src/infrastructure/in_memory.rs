use crate::domain::booking::{Booking, BookingStatus};
use crate::domain::event::{EventConfig, OrganizerConfig};
use crate::domain::ledger::{EntryStatus, LedgerEntry};
use crate::domain::payout::Payout;
use crate::domain::ports::{
    BookingStore, EventStore, LedgerStore, PayoutStore, RefundStore, ReservationOutcome,
    TicketStore,
};
use crate::domain::refund::RefundRequest;
use crate::domain::ticket::{Ticket, TicketStatus};
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default, Clone, Copy)]
struct Inventory {
    quantity: u32,
    reserved: u32,
    sold: u32,
}

impl Inventory {
    fn in_use(&self) -> u32 {
        self.reserved + self.sold
    }
}

struct EventRecord {
    config: EventConfig,
    inventory: HashMap<String, Inventory>,
}

/// In-memory event/organizer store.
///
/// Reservations take one write lock across the whole check-and-increment, so
/// concurrent requests for the last units serialize and exactly one wins.
#[derive(Default, Clone)]
pub struct InMemoryEventStore {
    events: Arc<RwLock<HashMap<Uuid, EventRecord>>>,
    organizers: Arc<RwLock<HashMap<Uuid, OrganizerConfig>>>,
    organizer_sales: Arc<RwLock<HashMap<Uuid, u64>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_event(&self, config: EventConfig) {
        let inventory = config
            .ticket_types
            .iter()
            .map(|t| {
                (
                    t.name.clone(),
                    Inventory {
                        quantity: t.quantity,
                        reserved: 0,
                        sold: 0,
                    },
                )
            })
            .collect();
        self.events
            .write()
            .await
            .insert(config.id, EventRecord { config, inventory });
    }

    pub async fn insert_organizer(&self, config: OrganizerConfig) {
        self.organizers.write().await.insert(config.id, config);
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn event(&self, id: Uuid) -> Result<Option<EventConfig>> {
        let events = self.events.read().await;
        Ok(events.get(&id).map(|r| r.config.clone()))
    }

    async fn organizer(&self, id: Uuid) -> Result<Option<OrganizerConfig>> {
        let organizers = self.organizers.read().await;
        Ok(organizers.get(&id).cloned())
    }

    async fn try_reserve(
        &self,
        event_id: Uuid,
        ticket_type: &str,
        quantity: u32,
    ) -> Result<ReservationOutcome> {
        let mut events = self.events.write().await;
        let record = events
            .get_mut(&event_id)
            .ok_or_else(|| EngineError::NotFound(format!("event {event_id}")))?;

        let event_in_use: u32 = record.inventory.values().map(Inventory::in_use).sum();
        if event_in_use + quantity > record.config.capacity {
            return Ok(ReservationOutcome::SoldOut);
        }
        let inventory = record
            .inventory
            .get_mut(ticket_type)
            .ok_or_else(|| EngineError::NotFound(format!("ticket type {ticket_type}")))?;
        if inventory.in_use() + quantity > inventory.quantity {
            return Ok(ReservationOutcome::SoldOut);
        }
        inventory.reserved += quantity;
        Ok(ReservationOutcome::Reserved)
    }

    async fn release(&self, event_id: Uuid, ticket_type: &str, quantity: u32) -> Result<()> {
        let mut events = self.events.write().await;
        if let Some(record) = events.get_mut(&event_id)
            && let Some(inventory) = record.inventory.get_mut(ticket_type)
        {
            inventory.reserved = inventory.reserved.saturating_sub(quantity);
        }
        Ok(())
    }

    async fn commit_sold(&self, event_id: Uuid, ticket_type: &str, quantity: u32) -> Result<()> {
        let organizer_id = {
            let mut events = self.events.write().await;
            let record = events
                .get_mut(&event_id)
                .ok_or_else(|| EngineError::NotFound(format!("event {event_id}")))?;
            let inventory = record
                .inventory
                .get_mut(ticket_type)
                .ok_or_else(|| EngineError::NotFound(format!("ticket type {ticket_type}")))?;
            inventory.reserved = inventory.reserved.saturating_sub(quantity);
            inventory.sold += quantity;
            record.config.organizer_id
        };
        let mut sales = self.organizer_sales.write().await;
        *sales.entry(organizer_id).or_insert(0) += quantity as u64;
        Ok(())
    }

    async fn tickets_sold(&self, event_id: Uuid) -> Result<u32> {
        let events = self.events.read().await;
        let record = events
            .get(&event_id)
            .ok_or_else(|| EngineError::NotFound(format!("event {event_id}")))?;
        Ok(record.inventory.values().map(|i| i.sold).sum())
    }

    async fn organizer_lifetime_sales(&self, organizer_id: Uuid) -> Result<u64> {
        let sales = self.organizer_sales.read().await;
        Ok(sales.get(&organizer_id).copied().unwrap_or(0))
    }
}

#[derive(Default, Clone)]
pub struct InMemoryBookingStore {
    bookings: Arc<RwLock<HashMap<Uuid, Booking>>>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn store(&self, booking: Booking) -> Result<()> {
        self.bookings.write().await.insert(booking.id, booking);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Booking>> {
        Ok(self.bookings.read().await.get(&id).cloned())
    }

    async fn by_reference(&self, reference: &str) -> Result<Option<Booking>> {
        let bookings = self.bookings.read().await;
        Ok(bookings.values().find(|b| b.reference == reference).cloned())
    }

    async fn live_for_user(&self, user_id: Uuid, event_id: Uuid) -> Result<Vec<Booking>> {
        let bookings = self.bookings.read().await;
        Ok(bookings
            .values()
            .filter(|b| {
                b.user_id == user_id
                    && b.event_id == event_id
                    && matches!(b.status, BookingStatus::Pending | BookingStatus::Confirmed)
            })
            .cloned()
            .collect())
    }

    async fn all_pending(&self) -> Result<Vec<Booking>> {
        let bookings = self.bookings.read().await;
        Ok(bookings
            .values()
            .filter(|b| b.status == BookingStatus::Pending)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryTicketStore {
    tickets: Arc<RwLock<HashMap<String, Ticket>>>,
}

impl InMemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TicketStore for InMemoryTicketStore {
    /// One write lock for the whole batch: all tickets land together, and a
    /// (booking, line_seq) pair that already exists is never inserted twice.
    async fn store_batch(&self, batch: Vec<Ticket>) -> Result<()> {
        let mut tickets = self.tickets.write().await;
        for ticket in batch {
            let already_issued = tickets
                .values()
                .any(|t| t.booking_id == ticket.booking_id && t.line_seq == ticket.line_seq);
            if !already_issued {
                tickets.insert(ticket.code.clone(), ticket);
            }
        }
        Ok(())
    }

    async fn store(&self, ticket: Ticket) -> Result<()> {
        self.tickets.write().await.insert(ticket.code.clone(), ticket);
        Ok(())
    }

    async fn by_code(&self, code: &str) -> Result<Option<Ticket>> {
        Ok(self.tickets.read().await.get(code).cloned())
    }

    async fn by_booking(&self, booking_id: Uuid) -> Result<Vec<Ticket>> {
        let tickets = self.tickets.read().await;
        let mut found: Vec<Ticket> = tickets
            .values()
            .filter(|t| t.booking_id == booking_id)
            .cloned()
            .collect();
        found.sort_by_key(|t| t.line_seq);
        Ok(found)
    }

    async fn all_valid(&self) -> Result<Vec<Ticket>> {
        let tickets = self.tickets.read().await;
        Ok(tickets
            .values()
            .filter(|t| t.status == TicketStatus::Valid)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    entries: Arc<RwLock<HashMap<Uuid, LedgerEntry>>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn store(&self, entry: LedgerEntry) -> Result<()> {
        self.entries.write().await.insert(entry.id, entry);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<LedgerEntry>> {
        Ok(self.entries.read().await.get(&id).cloned())
    }

    async fn by_booking(&self, booking_id: Uuid) -> Result<Vec<LedgerEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .values()
            .filter(|e| e.booking_id == Some(booking_id))
            .cloned()
            .collect())
    }

    async fn by_gateway_reference(&self, reference: &str) -> Result<Option<LedgerEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .values()
            .find(|e| e.gateway_reference.as_deref() == Some(reference))
            .cloned())
    }

    async fn completed_for_organizer(
        &self,
        organizer_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .values()
            .filter(|e| {
                e.organizer_id == Some(organizer_id)
                    && e.status == EntryStatus::Completed
                    && e.completed_at
                        .map(|t| t >= from && t <= to)
                        .unwrap_or(false)
            })
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryPayoutStore {
    payouts: Arc<RwLock<HashMap<Uuid, Payout>>>,
}

impl InMemoryPayoutStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PayoutStore for InMemoryPayoutStore {
    async fn store(&self, payout: Payout) -> Result<()> {
        self.payouts.write().await.insert(payout.id, payout);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Payout>> {
        Ok(self.payouts.read().await.get(&id).cloned())
    }

    async fn all_active(&self) -> Result<Vec<Payout>> {
        let payouts = self.payouts.read().await;
        Ok(payouts
            .values()
            .filter(|p| !p.status.is_terminal())
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryRefundStore {
    requests: Arc<RwLock<HashMap<Uuid, RefundRequest>>>,
}

impl InMemoryRefundStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefundStore for InMemoryRefundStore {
    async fn store(&self, request: RefundRequest) -> Result<()> {
        self.requests.write().await.insert(request.id, request);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<RefundRequest>> {
        Ok(self.requests.read().await.get(&id).cloned())
    }

    async fn open_for_booking(&self, booking_id: Uuid) -> Result<Option<RefundRequest>> {
        let requests = self.requests.read().await;
        Ok(requests
            .values()
            .find(|r| r.booking_id == booking_id && !r.status.is_terminal())
            .cloned())
    }
}
