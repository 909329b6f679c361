use crate::application::commission::apportion_refund;
use crate::domain::booking::{BookingStatus, PaymentStatus};
use crate::domain::ledger::{EntryKind, EntryStatus, LedgerEntry};
use crate::domain::ports::{
    BookingStoreRef, LedgerStoreRef, Notification, NotifierRef, RefundStoreRef, TicketStoreRef,
};
use crate::domain::refund::{RefundRequest, RefundStatus};
use crate::domain::ticket::TicketStatus;
use crate::error::{EngineError, Rejection, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Customer refunds: request, review, and the settlement-side processing
/// that writes the negated ledger entry.
pub struct RefundService {
    bookings: BookingStoreRef,
    tickets: TicketStoreRef,
    ledger: LedgerStoreRef,
    refunds: RefundStoreRef,
    notifier: NotifierRef,
}

impl RefundService {
    pub fn new(
        bookings: BookingStoreRef,
        tickets: TicketStoreRef,
        ledger: LedgerStoreRef,
        refunds: RefundStoreRef,
        notifier: NotifierRef,
    ) -> Self {
        Self {
            bookings,
            tickets,
            ledger,
            refunds,
            notifier,
        }
    }

    pub async fn request(
        &self,
        booking_reference: &str,
        requested_by: Uuid,
        amount: Decimal,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<RefundRequest> {
        let booking = self
            .bookings
            .by_reference(booking_reference)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("booking {booking_reference}")))?;

        let mut reasons = Vec::new();
        if booking.payment_status != PaymentStatus::Paid {
            reasons.push(Rejection::BookingNotPaid);
        }
        if amount <= Decimal::ZERO {
            reasons.push(Rejection::NonPositiveAmount);
        } else if amount > booking.total_amount {
            reasons.push(Rejection::RefundOverTotal);
        }
        if self.refunds.open_for_booking(booking.id).await?.is_some() {
            reasons.push(Rejection::RefundAlreadyOpen);
        }
        if !reasons.is_empty() {
            return Err(EngineError::Rejected(reasons));
        }

        let request = RefundRequest {
            id: Uuid::new_v4(),
            booking_id: booking.id,
            requested_by,
            requested_amount: amount,
            approved_amount: None,
            status: RefundStatus::Pending,
            reason,
            reviewer: None,
            review_notes: None,
            requested_at: now,
            resolved_at: None,
        };
        self.refunds.store(request.clone()).await?;
        Ok(request)
    }

    pub async fn review(&self, id: Uuid, reviewer: &str) -> Result<RefundRequest> {
        let mut request = self.get(id).await?;
        self.expect_status(&request, &[RefundStatus::Pending])?;
        request.status = RefundStatus::Reviewing;
        request.reviewer = Some(reviewer.to_string());
        self.refunds.store(request.clone()).await?;
        Ok(request)
    }

    pub async fn approve(
        &self,
        id: Uuid,
        approved_amount: Option<Decimal>,
        reviewer: &str,
    ) -> Result<RefundRequest> {
        let mut request = self.get(id).await?;
        self.expect_status(&request, &[RefundStatus::Pending, RefundStatus::Reviewing])?;
        let amount = approved_amount.unwrap_or(request.requested_amount);
        if amount <= Decimal::ZERO {
            return Err(EngineError::rejected(Rejection::NonPositiveAmount));
        }
        if amount > request.requested_amount {
            return Err(EngineError::rejected(Rejection::RefundOverTotal));
        }
        request.status = RefundStatus::Approved;
        request.approved_amount = Some(amount);
        request.reviewer = Some(reviewer.to_string());
        self.refunds.store(request.clone()).await?;
        Ok(request)
    }

    pub async fn reject(
        &self,
        id: Uuid,
        reviewer: &str,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<RefundRequest> {
        let mut request = self.get(id).await?;
        self.expect_status(&request, &[RefundStatus::Pending, RefundStatus::Reviewing])?;
        request.status = RefundStatus::Rejected;
        request.reviewer = Some(reviewer.to_string());
        request.review_notes = notes;
        request.resolved_at = Some(now);
        self.refunds.store(request.clone()).await?;
        Ok(request)
    }

    pub async fn cancel(&self, id: Uuid, now: DateTime<Utc>) -> Result<RefundRequest> {
        let mut request = self.get(id).await?;
        if request.status.is_terminal() {
            return Err(EngineError::InvalidTransition(format!(
                "refund request {} is already {:?}",
                request.id, request.status
            )));
        }
        request.status = RefundStatus::Cancelled;
        request.resolved_at = Some(now);
        self.refunds.store(request.clone()).await?;
        Ok(request)
    }

    /// Executes an approved refund: apportions the original sale, writes the
    /// fully negated ledger entry linked to it, and on a full refund marks
    /// the booking refunded and cancels its tickets.
    pub async fn process(&self, id: Uuid, now: DateTime<Utc>) -> Result<LedgerEntry> {
        let mut request = self.get(id).await?;
        self.expect_status(&request, &[RefundStatus::Approved])?;
        let amount = request
            .approved_amount
            .unwrap_or(request.requested_amount);

        let mut booking = self
            .bookings
            .get(request.booking_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("booking {}", request.booking_id)))?;
        let original = self
            .ledger
            .by_booking(booking.id)
            .await?
            .into_iter()
            .find(|e| e.kind == EntryKind::TicketSale && e.status == EntryStatus::Completed)
            .ok_or_else(|| {
                EngineError::NotFound(format!("completed sale for booking {}", booking.reference))
            })?;

        let split = apportion_refund(&original, amount);
        let entry = LedgerEntry {
            id: Uuid::new_v4(),
            kind: EntryKind::Refund,
            amount: -split.amount,
            commission_amount: -split.commission_refund,
            gateway_fee: -split.gateway_fee_refund,
            net_amount: -split.net_refund,
            currency: original.currency.clone(),
            gateway: original.gateway.clone(),
            payment_method: original.payment_method.clone(),
            gateway_reference: None,
            status: EntryStatus::Completed,
            booking_id: Some(booking.id),
            organizer_id: original.organizer_id,
            user_id: Some(request.requested_by),
            payout_id: None,
            reverses: Some(original.id),
            reason: request.reason.clone(),
            created_at: now,
            completed_at: Some(now),
        };
        self.ledger.store(entry.clone()).await?;

        if !split.is_partial {
            booking.status = BookingStatus::Refunded;
            booking.updated_at = now;
            self.bookings.store(booking.clone()).await?;
            for mut ticket in self.tickets.by_booking(booking.id).await? {
                if matches!(ticket.status, TicketStatus::Valid | TicketStatus::Transferred) {
                    ticket.status = TicketStatus::Cancelled;
                    self.tickets.store(ticket).await?;
                }
            }
        }

        request.status = RefundStatus::Processed;
        request.resolved_at = Some(now);
        self.refunds.store(request).await?;

        self.notifier
            .notify(Notification::RefundProcessed {
                booking_id: booking.id,
                amount: split.amount,
                is_partial: split.is_partial,
            })
            .await?;
        tracing::info!(
            reference = %booking.reference,
            amount = %split.amount,
            partial = split.is_partial,
            "refund processed"
        );
        Ok(entry)
    }

    async fn get(&self, id: Uuid) -> Result<RefundRequest> {
        self.refunds
            .get(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("refund request {id}")))
    }

    fn expect_status(&self, request: &RefundRequest, allowed: &[RefundStatus]) -> Result<()> {
        if allowed.contains(&request.status) {
            Ok(())
        } else {
            Err(EngineError::InvalidTransition(format!(
                "refund request {} is {:?}",
                request.id, request.status
            )))
        }
    }
}
