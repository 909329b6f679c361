use boxoffice::application::booking::{BookingLineRequest, BookingRequest};
use boxoffice::application::engine::{Marketplace, MarketplaceStores};
use boxoffice::application::payment::GatewayCallback;
use boxoffice::domain::booking::CustomerDetails;
use boxoffice::domain::ports::BookingStoreRef;
use boxoffice::error::{EngineError, Result as EngineResult};
use boxoffice::infrastructure::gateway::FakeGateway;
use boxoffice::infrastructure::in_memory::{
    InMemoryBookingStore, InMemoryEventStore, InMemoryLedgerStore, InMemoryPayoutStore,
    InMemoryRefundStore, InMemoryTicketStore,
};
use boxoffice::infrastructure::notifier::TracingNotifier;
use boxoffice::interfaces::config;
use boxoffice::interfaces::csv::command_reader::{Command, CommandReader, CommandType};
use boxoffice::interfaces::csv::report_writer::{SettlementRow, SettlementWriter};
use chrono::{DateTime, Utc};
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Marketplace configuration (events and organizers) as JSON
    config: PathBuf,

    /// Command stream CSV to replay
    commands: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::load(&cli.config).into_diagnostic()?;

    let events = Arc::new(InMemoryEventStore::new());
    for organizer in &config.organizers {
        events.insert_organizer(organizer.clone()).await;
    }
    for event in &config.events {
        events.insert_event(event.clone()).await;
    }
    let bookings: BookingStoreRef = Arc::new(InMemoryBookingStore::new());
    let marketplace = Marketplace::new(
        MarketplaceStores {
            events,
            bookings: bookings.clone(),
            tickets: Arc::new(InMemoryTicketStore::new()),
            ledger: Arc::new(InMemoryLedgerStore::new()),
            payouts: Arc::new(InMemoryPayoutStore::new()),
            refunds: Arc::new(InMemoryRefundStore::new()),
        },
        Arc::new(FakeGateway::new()),
        Arc::new(TracingNotifier::new()),
        config.service_fee_rate,
    );

    // Booking aliases chosen by the stream map to generated references.
    let mut aliases: HashMap<String, String> = HashMap::new();

    let file = File::open(&cli.commands).into_diagnostic()?;
    let reader = CommandReader::new(file);
    for command_result in reader.commands() {
        match command_result {
            Ok(command) => {
                if let Err(e) = apply(&marketplace, &bookings, &mut aliases, command).await {
                    eprintln!("Error processing command: {e}");
                }
            }
            Err(e) => {
                eprintln!("Error reading command: {e}");
            }
        }
    }

    let now = Utc::now();
    let mut rows = Vec::with_capacity(config.organizers.len());
    for organizer in &config.organizers {
        let summary = marketplace
            .settlement
            .revenue_summary(organizer.id, DateTime::UNIX_EPOCH, now)
            .await
            .into_diagnostic()?;
        rows.push(SettlementRow::from_summary(&organizer.name, &summary));
    }

    let stdout = io::stdout();
    let mut writer = SettlementWriter::new(stdout.lock());
    writer.write_report(rows).into_diagnostic()?;
    Ok(())
}

async fn apply(
    marketplace: &Marketplace,
    bookings: &BookingStoreRef,
    aliases: &mut HashMap<String, String>,
    command: Command,
) -> EngineResult<()> {
    let now = Utc::now();
    match command.r#type {
        CommandType::Book => {
            let user = require(command.user, "user")?;
            let event = require(command.event, "event")?;
            let ticket_type = require(command.ticket_type.clone(), "ticket_type")?;
            let quantity = require(command.quantity, "quantity")?;
            let booking = marketplace
                .bookings
                .create(
                    BookingRequest {
                        user_id: user,
                        event_id: event,
                        lines: vec![BookingLineRequest {
                            ticket_type,
                            quantity,
                            claimed_unit_price: command.amount,
                        }],
                        customer: CustomerDetails {
                            name: format!("customer-{user}"),
                            email: format!("{user}@example.invalid"),
                            phone: None,
                        },
                    },
                    now,
                )
                .await?;
            if let Some(alias) = command.reference {
                aliases.insert(alias, booking.reference.clone());
            }
        }
        CommandType::Pay => {
            let reference = resolve(aliases, command.reference.as_deref())?;
            let method = command.method.as_deref().unwrap_or("card");
            let entry = marketplace.payments.initialize(&reference, method, now).await?;
            let gateway_reference = entry
                .gateway_reference
                .ok_or_else(|| EngineError::Gateway("no gateway reference issued".into()))?;
            marketplace
                .payments
                .complete(
                    GatewayCallback {
                        gateway_reference,
                        amount: entry.amount,
                        currency: entry.currency,
                    },
                    Utc::now(),
                )
                .await?;
        }
        CommandType::Fail => {
            let reference = resolve(aliases, command.reference.as_deref())?;
            let method = command.method.as_deref().unwrap_or("card");
            let entry = marketplace.payments.initialize(&reference, method, now).await?;
            let gateway_reference = entry
                .gateway_reference
                .ok_or_else(|| EngineError::Gateway("no gateway reference issued".into()))?;
            marketplace.payments.fail(&gateway_reference, Utc::now()).await?;
        }
        CommandType::Cancel => {
            let reference = resolve(aliases, command.reference.as_deref())?;
            marketplace.bookings.cancel(&reference, now).await?;
        }
        CommandType::Refund => {
            let reference = resolve(aliases, command.reference.as_deref())?;
            let user = require(command.user, "user")?;
            let amount = match command.amount {
                Some(amount) => amount,
                None => {
                    let booking = bookings
                        .by_reference(&reference)
                        .await?
                        .ok_or_else(|| EngineError::NotFound(format!("booking {reference}")))?;
                    booking.total_amount
                }
            };
            let request = marketplace
                .refunds
                .request(&reference, user, amount, None, now)
                .await?;
            marketplace
                .refunds
                .approve(request.id, None, "replay")
                .await?;
            marketplace.refunds.process(request.id, Utc::now()).await?;
        }
        CommandType::Payout => {
            let organizer = require(command.user, "user")?;
            marketplace
                .settlement
                .request_payout(organizer, DateTime::UNIX_EPOCH, now, now)
                .await?;
        }
    }
    Ok(())
}

fn require<T>(value: Option<T>, column: &str) -> EngineResult<T> {
    value.ok_or_else(|| EngineError::Storage(format!("missing required column {column}")))
}

fn resolve(aliases: &HashMap<String, String>, alias: Option<&str>) -> EngineResult<String> {
    let alias = alias.ok_or_else(|| EngineError::Storage("missing required column reference".into()))?;
    Ok(aliases
        .get(alias)
        .cloned()
        .unwrap_or_else(|| alias.to_string()))
}
