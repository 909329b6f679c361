#![allow(dead_code)]

use boxoffice::application::booking::{BookingLineRequest, BookingRequest};
use boxoffice::application::engine::{Marketplace, MarketplaceStores};
use boxoffice::application::payment::GatewayCallback;
use boxoffice::domain::booking::{Booking, CustomerDetails};
use boxoffice::domain::event::{EventConfig, EventStatus, OrganizerConfig, TicketTypeConfig};
use boxoffice::domain::ticket::Ticket;
use boxoffice::error::Result;
use boxoffice::infrastructure::gateway::FakeGateway;
use boxoffice::infrastructure::in_memory::{
    InMemoryBookingStore, InMemoryEventStore, InMemoryLedgerStore, InMemoryPayoutStore,
    InMemoryRefundStore, InMemoryTicketStore,
};
use boxoffice::infrastructure::notifier::RecordingNotifier;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use uuid::Uuid;

pub struct Fixture {
    pub marketplace: Marketplace,
    pub events: Arc<InMemoryEventStore>,
    pub bookings: Arc<InMemoryBookingStore>,
    pub tickets: Arc<InMemoryTicketStore>,
    pub ledger: Arc<InMemoryLedgerStore>,
    pub payouts: Arc<InMemoryPayoutStore>,
    pub refunds: Arc<InMemoryRefundStore>,
    pub gateway: Arc<FakeGateway>,
    pub notifier: Arc<RecordingNotifier>,
    pub organizer: OrganizerConfig,
    pub event: EventConfig,
}

/// Default stage: one organizer at 8% commission, one published event a week
/// out with 50 Regular (1000) and 10 VIP (5000) tickets.
pub fn default_event(organizer_id: Uuid) -> EventConfig {
    EventConfig {
        id: Uuid::new_v4(),
        organizer_id,
        title: "Harbour Lights Festival".into(),
        status: EventStatus::Published,
        event_date: Utc::now() + Duration::days(7),
        end_date: None,
        capacity: 60,
        currency: "USD".into(),
        ticket_types: vec![
            TicketTypeConfig {
                name: "Regular".into(),
                price: dec!(1000),
                quantity: 50,
                max_per_order: 4,
                sale_start: None,
                sale_end: None,
                transferable: true,
            },
            TicketTypeConfig {
                name: "VIP".into(),
                price: dec!(5000),
                quantity: 10,
                max_per_order: 2,
                sale_start: None,
                sale_end: None,
                transferable: false,
            },
        ],
        platform_fee: None,
        commission_rate: None,
        commission_kind: None,
        qr_secret: "per-event-secret".into(),
    }
}

pub async fn fixture() -> Fixture {
    let organizer = OrganizerConfig {
        id: Uuid::new_v4(),
        name: "Harbour Events".into(),
        commission_rate: Some(dec!(8)),
    };
    let event = default_event(organizer.id);
    fixture_with(organizer, event).await
}

pub async fn fixture_with(organizer: OrganizerConfig, event: EventConfig) -> Fixture {
    let events = Arc::new(InMemoryEventStore::new());
    events.insert_organizer(organizer.clone()).await;
    events.insert_event(event.clone()).await;

    let bookings = Arc::new(InMemoryBookingStore::new());
    let tickets = Arc::new(InMemoryTicketStore::new());
    let ledger = Arc::new(InMemoryLedgerStore::new());
    let payouts = Arc::new(InMemoryPayoutStore::new());
    let refunds = Arc::new(InMemoryRefundStore::new());
    let gateway = Arc::new(FakeGateway::new());
    let notifier = Arc::new(RecordingNotifier::new());

    let marketplace = Marketplace::new(
        MarketplaceStores {
            events: events.clone(),
            bookings: bookings.clone(),
            tickets: tickets.clone(),
            ledger: ledger.clone(),
            payouts: payouts.clone(),
            refunds: refunds.clone(),
        },
        gateway.clone(),
        notifier.clone(),
        Decimal::ZERO,
    );

    Fixture {
        marketplace,
        events,
        bookings,
        tickets,
        ledger,
        payouts,
        refunds,
        gateway,
        notifier,
        organizer,
        event,
    }
}

pub fn line(ticket_type: &str, quantity: u32) -> BookingLineRequest {
    BookingLineRequest {
        ticket_type: ticket_type.into(),
        quantity,
        claimed_unit_price: None,
    }
}

pub fn request(user: Uuid, event: &EventConfig, lines: Vec<BookingLineRequest>) -> BookingRequest {
    BookingRequest {
        user_id: user,
        event_id: event.id,
        lines,
        customer: CustomerDetails {
            name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            phone: None,
        },
    }
}

pub async fn book(
    fixture: &Fixture,
    user: Uuid,
    ticket_type: &str,
    quantity: u32,
) -> Result<Booking> {
    fixture
        .marketplace
        .bookings
        .create(
            request(user, &fixture.event, vec![line(ticket_type, quantity)]),
            Utc::now(),
        )
        .await
}

/// Initializes and completes payment for a booking, returning the issued
/// tickets and the gateway reference used.
pub async fn pay(fixture: &Fixture, booking: &Booking, method: &str) -> (Vec<Ticket>, String) {
    let entry = fixture
        .marketplace
        .payments
        .initialize(&booking.reference, method, Utc::now())
        .await
        .expect("payment initialization");
    let gateway_reference = entry.gateway_reference.clone().expect("gateway reference");
    let tickets = fixture
        .marketplace
        .payments
        .complete(
            GatewayCallback {
                gateway_reference: gateway_reference.clone(),
                amount: entry.amount,
                currency: entry.currency.clone(),
            },
            Utc::now(),
        )
        .await
        .expect("payment completion");
    (tickets, gateway_reference)
}

pub fn far_future() -> DateTime<Utc> {
    // Fixed far-future bound so repeated calls are deterministic (idempotency
    // tests compare summaries produced from this value).
    DateTime::from_timestamp(253402300799, 0).expect("valid far-future timestamp")
}
