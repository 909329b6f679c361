use crate::domain::booking::{
    Booking, BookingLine, BookingStatus, CustomerDetails, PaymentStatus,
};
use crate::domain::event::EventConfig;
use crate::domain::money::{percentage_of, round_money};
use crate::domain::ports::{BookingStoreRef, EventStoreRef, ReservationOutcome};
use crate::error::{EngineError, Rejection, Result};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// One requested line of a checkout.
///
/// `claimed_unit_price` is whatever the client sent for display purposes; it
/// is never used for pricing. The booked price always comes from the event's
/// stored ticket-type configuration.
#[derive(Debug, Clone)]
pub struct BookingLineRequest {
    pub ticket_type: String,
    pub quantity: u32,
    pub claimed_unit_price: Option<Decimal>,
}

#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub lines: Vec<BookingLineRequest>,
    pub customer: CustomerDetails,
}

/// Creates and cancels bookings. Validation is all-at-once (the caller gets
/// every reason, not just the first), and the capacity check is delegated to
/// the store's atomic reservation so there is no gap between check and claim.
pub struct BookingService {
    events: EventStoreRef,
    bookings: BookingStoreRef,
    /// Buyer-side service fee, percent of the subtotal.
    service_fee_rate: Decimal,
}

impl BookingService {
    pub fn new(events: EventStoreRef, bookings: BookingStoreRef) -> Self {
        Self {
            events,
            bookings,
            service_fee_rate: Decimal::ZERO,
        }
    }

    pub fn with_service_fee(mut self, rate: Decimal) -> Self {
        self.service_fee_rate = rate;
        self
    }

    pub async fn create(&self, request: BookingRequest, now: DateTime<Utc>) -> Result<Booking> {
        let event = self
            .events
            .event(request.event_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("event {}", request.event_id)))?;

        let mut reasons = self.validate(&event, &request, now);

        // One live booking per (user, event). A stale pending booking stops
        // blocking and is cancelled to make way for the new attempt.
        for existing in self
            .bookings
            .live_for_user(request.user_id, request.event_id)
            .await?
        {
            if existing.is_abandoned_at(now) {
                self.cancel_internal(existing, now).await?;
            } else if existing.blocks_rebooking_at(now) {
                reasons.push(Rejection::DuplicateBooking {
                    reference: existing.reference.clone(),
                });
            }
        }

        if !reasons.is_empty() {
            return Err(EngineError::Rejected(reasons));
        }

        // Atomic check-and-reserve per line; on a lost race, roll back the
        // lines already claimed. A race loss surfaces exactly like sold-out.
        let mut reserved: Vec<&BookingLineRequest> = Vec::new();
        for line in &request.lines {
            match self
                .events
                .try_reserve(event.id, &line.ticket_type, line.quantity)
                .await?
            {
                ReservationOutcome::Reserved => reserved.push(line),
                ReservationOutcome::SoldOut => {
                    for done in reserved {
                        self.events
                            .release(event.id, &done.ticket_type, done.quantity)
                            .await?;
                    }
                    return Err(EngineError::rejected(Rejection::SoldOut));
                }
            }
        }

        let lines: Vec<BookingLine> = request
            .lines
            .iter()
            .map(|line| BookingLine {
                ticket_type: line.ticket_type.clone(),
                quantity: line.quantity,
                // Server-side price only; the claimed price is ignored.
                unit_price: event
                    .ticket_type(&line.ticket_type)
                    .map(|t| t.price)
                    .unwrap_or_default(),
            })
            .collect();

        let subtotal = round_money(lines.iter().map(|l| l.line_total()).sum());
        let service_fee = percentage_of(subtotal, self.service_fee_rate);

        let booking = Booking {
            id: Uuid::new_v4(),
            reference: new_reference(),
            user_id: request.user_id,
            event_id: request.event_id,
            lines,
            customer: request.customer,
            subtotal,
            service_fee,
            total_amount: subtotal + service_fee,
            currency: event.currency.clone(),
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            expires_at: now
                + Duration::minutes(crate::domain::booking::ABANDONMENT_CUTOFF_MINUTES),
            created_at: now,
            updated_at: now,
        };
        self.bookings.store(booking.clone()).await?;
        tracing::info!(reference = %booking.reference, event = %event.id, "booking created");
        Ok(booking)
    }

    fn validate(
        &self,
        event: &EventConfig,
        request: &BookingRequest,
        now: DateTime<Utc>,
    ) -> Vec<Rejection> {
        let mut reasons = Vec::new();

        if event.status != crate::domain::event::EventStatus::Published {
            reasons.push(Rejection::EventNotPublished);
        }
        if event.event_date < now {
            reasons.push(Rejection::EventInPast);
        }
        if request.lines.is_empty() {
            reasons.push(Rejection::ZeroQuantity);
        }

        for line in &request.lines {
            if line.quantity == 0 {
                reasons.push(Rejection::ZeroQuantity);
                continue;
            }
            let Some(ticket_type) = event.ticket_type(&line.ticket_type) else {
                reasons.push(Rejection::UnknownTicketType {
                    name: line.ticket_type.clone(),
                });
                continue;
            };
            if line.quantity > ticket_type.max_per_order {
                reasons.push(Rejection::OverOrderLimit {
                    name: ticket_type.name.clone(),
                    requested: line.quantity,
                    max: ticket_type.max_per_order,
                });
            }
            if let Some(start) = ticket_type.sale_start
                && now < start
            {
                reasons.push(Rejection::SaleNotStarted {
                    name: ticket_type.name.clone(),
                });
            } else if let Some(end) = ticket_type.sale_end
                && now > end
            {
                reasons.push(Rejection::SaleEnded {
                    name: ticket_type.name.clone(),
                });
            }
        }

        reasons
    }

    /// User-initiated cancellation of an unpaid booking. Idempotent on
    /// already-cancelled bookings; paid bookings go through the refund flow.
    pub async fn cancel(&self, reference: &str, now: DateTime<Utc>) -> Result<Booking> {
        let booking = self
            .bookings
            .by_reference(reference)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("booking {reference}")))?;
        match booking.status {
            BookingStatus::Cancelled => Ok(booking),
            BookingStatus::Pending => self.cancel_internal(booking, now).await,
            BookingStatus::Confirmed | BookingStatus::Refunded => {
                Err(EngineError::InvalidTransition(format!(
                    "booking {} is {:?} and cannot be cancelled directly",
                    booking.reference, booking.status
                )))
            }
        }
    }

    /// Cancels abandoned pending bookings and frees their reserved inventory.
    /// Safe to re-run; already-cancelled bookings are skipped.
    pub async fn sweep_abandoned(&self, now: DateTime<Utc>) -> Result<u32> {
        let mut swept = 0;
        for booking in self.bookings.all_pending().await? {
            if booking.is_abandoned_at(now) {
                self.cancel_internal(booking, now).await?;
                swept += 1;
            }
        }
        if swept > 0 {
            tracing::info!(swept, "abandoned bookings cancelled");
        }
        Ok(swept)
    }

    async fn cancel_internal(&self, mut booking: Booking, now: DateTime<Utc>) -> Result<Booking> {
        for line in &booking.lines {
            self.events
                .release(booking.event_id, &line.ticket_type, line.quantity)
                .await?;
        }
        booking.status = BookingStatus::Cancelled;
        booking.updated_at = now;
        self.bookings.store(booking.clone()).await?;
        tracing::info!(reference = %booking.reference, "booking cancelled");
        Ok(booking)
    }
}

fn new_reference() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("BK-{}", &id[..12].to_uppercase())
}
