use crate::application::commission;
use crate::application::qr::ticket_security_hash;
use crate::domain::booking::{Booking, BookingStatus, PaymentStatus};
use crate::domain::ledger::{EntryKind, EntryStatus, LedgerEntry};
use crate::domain::ports::{
    BookingStoreRef, EventStoreRef, LedgerStoreRef, Notification, NotifierRef, PaymentGatewayRef,
    PaymentIntent, TicketStoreRef,
};
use crate::domain::ticket::{Ticket, TicketStatus};
use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::time::Duration;
use uuid::Uuid;

/// How long a gateway call may block before we fail closed.
const GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);

/// A gateway's payment callback, already signature-checked by the transport
/// layer. Status and amount are still validated here before any state moves.
#[derive(Debug, Clone)]
pub struct GatewayCallback {
    pub gateway_reference: String,
    pub amount: Decimal,
    pub currency: String,
}

/// Drives a booking through payment: gateway initialization, the completion
/// callback (idempotent under at-least-once delivery), and exactly-once
/// ticket issuance.
pub struct PaymentService {
    events: EventStoreRef,
    bookings: BookingStoreRef,
    tickets: TicketStoreRef,
    ledger: LedgerStoreRef,
    gateway: PaymentGatewayRef,
    notifier: NotifierRef,
}

impl PaymentService {
    pub fn new(
        events: EventStoreRef,
        bookings: BookingStoreRef,
        tickets: TicketStoreRef,
        ledger: LedgerStoreRef,
        gateway: PaymentGatewayRef,
        notifier: NotifierRef,
    ) -> Self {
        Self {
            events,
            bookings,
            tickets,
            ledger,
            gateway,
            notifier,
        }
    }

    /// Opens a payment intent with the gateway and records the pending ledger
    /// entry. On gateway failure or timeout nothing is persisted.
    pub async fn initialize(
        &self,
        booking_reference: &str,
        method: &str,
        now: DateTime<Utc>,
    ) -> Result<LedgerEntry> {
        let mut booking = self.booking_by_reference(booking_reference).await?;
        if booking.status != BookingStatus::Pending {
            return Err(EngineError::InvalidTransition(format!(
                "booking {} is {:?}, not payable",
                booking.reference, booking.status
            )));
        }
        if booking.is_abandoned_at(now) {
            return Err(EngineError::InvalidTransition(format!(
                "booking {} has expired",
                booking.reference
            )));
        }

        let intent = PaymentIntent {
            reference: booking.reference.clone(),
            amount: booking.total_amount,
            currency: booking.currency.clone(),
            method: method.to_string(),
        };
        let ack = tokio::time::timeout(GATEWAY_TIMEOUT, self.gateway.initialize_payment(&intent))
            .await
            .map_err(|_| EngineError::Gateway("payment initialization timed out".into()))??;

        let entry = LedgerEntry {
            id: Uuid::new_v4(),
            kind: EntryKind::TicketSale,
            amount: booking.total_amount,
            commission_amount: Decimal::ZERO,
            gateway_fee: Decimal::ZERO,
            net_amount: Decimal::ZERO,
            currency: booking.currency.clone(),
            gateway: ack.gateway,
            payment_method: Some(method.to_string()),
            gateway_reference: Some(ack.gateway_reference),
            status: EntryStatus::Pending,
            booking_id: Some(booking.id),
            organizer_id: None,
            user_id: Some(booking.user_id),
            payout_id: None,
            reverses: None,
            reason: None,
            created_at: now,
            completed_at: None,
        };
        self.ledger.store(entry.clone()).await?;

        booking.payment_status = PaymentStatus::Processing;
        booking.updated_at = now;
        self.bookings.store(booking).await?;
        Ok(entry)
    }

    /// Handles a successful payment callback.
    ///
    /// Safe under duplicate delivery: a booking that already has tickets is a
    /// no-op success returning the existing set. Otherwise the fee breakdown
    /// is computed, the ledger entry completed, the booking confirmed, and
    /// all tickets issued in one atomic batch.
    pub async fn complete(
        &self,
        callback: GatewayCallback,
        now: DateTime<Utc>,
    ) -> Result<Vec<Ticket>> {
        let mut entry = self
            .ledger
            .by_gateway_reference(&callback.gateway_reference)
            .await?
            .ok_or_else(|| {
                EngineError::NotFound(format!("transaction {}", callback.gateway_reference))
            })?;
        let booking_id = entry
            .booking_id
            .ok_or_else(|| EngineError::Storage(format!("entry {} has no booking", entry.id)))?;
        let mut booking = self
            .bookings
            .get(booking_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("booking {booking_id}")))?;

        // Duplicate webhook delivery: already ticketed means already done.
        let existing = self.tickets.by_booking(booking.id).await?;
        if entry.status == EntryStatus::Completed || !existing.is_empty() {
            tracing::info!(reference = %booking.reference, "duplicate completion ignored");
            return Ok(existing);
        }

        // A cancelled booking no longer holds its reservation; issuing from a
        // late success callback would oversell.
        if booking.status != BookingStatus::Pending {
            return Err(EngineError::InvalidTransition(format!(
                "booking {} is {:?}; late payment needs manual review",
                booking.reference, booking.status
            )));
        }

        if callback.amount != entry.amount || callback.currency != entry.currency {
            return Err(EngineError::Gateway(format!(
                "callback amount {} {} does not match transaction {} {}",
                callback.amount, callback.currency, entry.amount, entry.currency
            )));
        }

        let event = self
            .events
            .event(booking.event_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("event {}", booking.event_id)))?;
        let organizer = self
            .events
            .organizer(event.organizer_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("organizer {}", event.organizer_id)))?;

        let method = entry.payment_method.as_deref().unwrap_or("card");
        let fees = commission::breakdown(
            &event,
            &organizer,
            booking.subtotal,
            entry.amount,
            method,
        );
        entry.commission_amount = fees.commission.amount;
        entry.gateway_fee = fees.gateway_fee;
        entry.net_amount = fees.net;
        entry.organizer_id = Some(event.organizer_id);
        entry.status = EntryStatus::Completed;
        entry.completed_at = Some(now);
        self.ledger.store(entry.clone()).await?;

        booking.status = BookingStatus::Confirmed;
        booking.payment_status = PaymentStatus::Paid;
        booking.updated_at = now;
        self.bookings.store(booking.clone()).await?;

        let tickets = self.issue_tickets(&booking, &event.qr_secret, now);
        self.tickets.store_batch(tickets.clone()).await?;
        for line in &booking.lines {
            self.events
                .commit_sold(booking.event_id, &line.ticket_type, line.quantity)
                .await?;
        }

        self.notifier
            .notify(Notification::BookingConfirmed {
                booking_id: booking.id,
                reference: booking.reference.clone(),
                user_id: booking.user_id,
            })
            .await?;
        tracing::info!(
            reference = %booking.reference,
            tickets = tickets.len(),
            net = %entry.net_amount,
            "payment completed, tickets issued"
        );
        Ok(tickets)
    }

    /// Handles a failed payment callback. A completed transaction is never
    /// rolled back by a late failure report.
    pub async fn fail(&self, gateway_reference: &str, now: DateTime<Utc>) -> Result<()> {
        let mut entry = self
            .ledger
            .by_gateway_reference(gateway_reference)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("transaction {gateway_reference}")))?;
        if entry.status == EntryStatus::Completed {
            tracing::warn!(gateway_reference, "failure callback for completed transaction ignored");
            return Ok(());
        }
        entry.status = EntryStatus::Failed;
        self.ledger.store(entry.clone()).await?;

        if let Some(booking_id) = entry.booking_id
            && let Some(mut booking) = self.bookings.get(booking_id).await?
        {
            booking.payment_status = PaymentStatus::Unpaid;
            booking.updated_at = now;
            self.bookings.store(booking).await?;
        }
        Ok(())
    }

    fn issue_tickets(&self, booking: &Booking, qr_secret: &str, now: DateTime<Utc>) -> Vec<Ticket> {
        let mut tickets = Vec::with_capacity(booking.total_quantity() as usize);
        let mut seq = 0u32;
        for line in &booking.lines {
            for _ in 0..line.quantity {
                let code = new_ticket_code();
                let security_hash = ticket_security_hash(&code, booking.event_id, qr_secret);
                tickets.push(Ticket {
                    id: Uuid::new_v4(),
                    code,
                    security_hash,
                    booking_id: booking.id,
                    event_id: booking.event_id,
                    line_seq: seq,
                    ticket_type: line.ticket_type.clone(),
                    price: line.unit_price,
                    currency: booking.currency.clone(),
                    holder_name: booking.customer.name.clone(),
                    holder_email: booking.customer.email.clone(),
                    assigned_to: booking.user_id,
                    status: TicketStatus::Valid,
                    valid_from: None,
                    valid_until: None,
                    transfer: None,
                    usage: None,
                    issued_at: now,
                });
                seq += 1;
            }
        }
        tickets
    }

    async fn booking_by_reference(&self, reference: &str) -> Result<Booking> {
        self.bookings
            .by_reference(reference)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("booking {reference}")))
    }
}

fn new_ticket_code() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("TKT-{}", &id[..12].to_uppercase())
}
