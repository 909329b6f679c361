use crate::domain::ports::{EventStoreRef, TicketStoreRef};
use crate::domain::ticket::{Ticket, TicketStatus, TransferRecord, UsageRecord};
use crate::error::{EngineError, Rejection, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

/// Ticket lifecycle operations past issuance: transfer, entry scan, expiry.
pub struct TicketService {
    events: EventStoreRef,
    tickets: TicketStoreRef,
}

impl TicketService {
    pub fn new(events: EventStoreRef, tickets: TicketStoreRef) -> Self {
        Self { events, tickets }
    }

    /// Moves ownership to `recipient`. Only valid tickets of a transferable
    /// type move; the lineage record keeps the hop traceable. Multi-hop
    /// chains are not supported: a transferred ticket does not transfer again.
    pub async fn transfer(
        &self,
        ticket_code: &str,
        recipient: Uuid,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Ticket> {
        let mut ticket = self.ticket_by_code(ticket_code).await?;
        if ticket.status != TicketStatus::Valid {
            return Err(EngineError::rejected(Rejection::TicketNotUsable {
                status: ticket.status.as_str().into(),
            }));
        }
        let event = self
            .events
            .event(ticket.event_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("event {}", ticket.event_id)))?;
        let transferable = event
            .ticket_type(&ticket.ticket_type)
            .map(|t| t.transferable)
            .unwrap_or(false);
        if !transferable {
            return Err(EngineError::rejected(Rejection::NotTransferable));
        }
        if recipient == ticket.assigned_to {
            return Err(EngineError::rejected(Rejection::TransferToSelf));
        }

        ticket.transfer = Some(TransferRecord {
            transferred_from: ticket.assigned_to,
            transferred_to: recipient,
            transferred_at: now,
            reason,
        });
        ticket.assigned_to = recipient;
        ticket.status = TicketStatus::Transferred;
        self.tickets.store(ticket.clone()).await?;
        tracing::info!(code = %ticket.code, to = %recipient, "ticket transferred");
        Ok(ticket)
    }

    /// Marks a ticket used at the gate. Anything but a valid, in-window
    /// ticket is refused.
    pub async fn use_ticket(
        &self,
        ticket_code: &str,
        used_by: &str,
        entry_gate: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Ticket> {
        let mut ticket = self.ticket_by_code(ticket_code).await?;
        if ticket.status != TicketStatus::Valid {
            return Err(EngineError::rejected(Rejection::TicketNotUsable {
                status: ticket.status.as_str().into(),
            }));
        }
        if let Some(until) = ticket.valid_until
            && until < now
        {
            return Err(EngineError::rejected(Rejection::TicketNotUsable {
                status: "expired".into(),
            }));
        }
        if let Some(from) = ticket.valid_from
            && now < from
        {
            return Err(EngineError::rejected(Rejection::TicketNotUsable {
                status: "not yet valid".into(),
            }));
        }

        ticket.status = TicketStatus::Used;
        ticket.usage = Some(UsageRecord {
            used_at: now,
            used_by: used_by.to_string(),
            entry_gate,
        });
        self.tickets.store(ticket.clone()).await?;
        Ok(ticket)
    }

    /// Expires valid tickets whose window has closed, or whose event ended
    /// more than 24h ago. Idempotent; safe to re-run.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u32> {
        let mut cutoffs: HashMap<Uuid, DateTime<Utc>> = HashMap::new();
        let mut swept = 0;
        for mut ticket in self.tickets.all_valid().await? {
            let cutoff = match cutoffs.get(&ticket.event_id) {
                Some(c) => *c,
                None => {
                    let event = self
                        .events
                        .event(ticket.event_id)
                        .await?
                        .ok_or_else(|| {
                            EngineError::NotFound(format!("event {}", ticket.event_id))
                        })?;
                    let c = event.tickets_expire_at();
                    cutoffs.insert(ticket.event_id, c);
                    c
                }
            };
            if ticket.expirable_at(now, cutoff) {
                ticket.status = TicketStatus::Expired;
                self.tickets.store(ticket).await?;
                swept += 1;
            }
        }
        if swept > 0 {
            tracing::info!(swept, "tickets expired");
        }
        Ok(swept)
    }

    async fn ticket_by_code(&self, code: &str) -> Result<Ticket> {
        self.tickets
            .by_code(code)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("ticket {code}")))
    }
}
