use crate::application::booking::BookingService;
use crate::application::payment::PaymentService;
use crate::application::qr::QrService;
use crate::application::reconciliation::ReconciliationService;
use crate::application::refund::RefundService;
use crate::application::settlement::SettlementService;
use crate::application::ticket::TicketService;
use crate::domain::ports::{
    BookingStoreRef, EventStoreRef, LedgerStoreRef, NotifierRef, PaymentGatewayRef,
    PayoutStoreRef, RefundStoreRef, TicketStoreRef,
};
use rust_decimal::Decimal;

/// The assembled engine: every service wired over one set of stores.
///
/// Construction is the only place the port implementations meet the
/// services; callers interact with the service fields directly.
pub struct Marketplace {
    pub bookings: BookingService,
    pub payments: PaymentService,
    pub tickets: TicketService,
    pub refunds: RefundService,
    pub settlement: SettlementService,
    pub reconciliation: ReconciliationService,
    pub qr: QrService,
}

pub struct MarketplaceStores {
    pub events: EventStoreRef,
    pub bookings: BookingStoreRef,
    pub tickets: TicketStoreRef,
    pub ledger: LedgerStoreRef,
    pub payouts: PayoutStoreRef,
    pub refunds: RefundStoreRef,
}

impl Marketplace {
    pub fn new(
        stores: MarketplaceStores,
        gateway: PaymentGatewayRef,
        notifier: NotifierRef,
        service_fee_rate: Decimal,
    ) -> Self {
        Self {
            bookings: BookingService::new(stores.events.clone(), stores.bookings.clone())
                .with_service_fee(service_fee_rate),
            payments: PaymentService::new(
                stores.events.clone(),
                stores.bookings.clone(),
                stores.tickets.clone(),
                stores.ledger.clone(),
                gateway.clone(),
                notifier.clone(),
            ),
            tickets: TicketService::new(stores.events.clone(), stores.tickets.clone()),
            refunds: RefundService::new(
                stores.bookings.clone(),
                stores.tickets.clone(),
                stores.ledger.clone(),
                stores.refunds.clone(),
                notifier.clone(),
            ),
            settlement: SettlementService::new(stores.ledger.clone(), stores.payouts.clone()),
            reconciliation: ReconciliationService::new(
                stores.payouts.clone(),
                gateway,
                notifier,
            ),
            qr: QrService::new(stores.events.clone(), stores.tickets),
        }
    }
}
