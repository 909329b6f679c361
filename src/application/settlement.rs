use crate::domain::ledger::{EntryKind, LedgerEntry};
use crate::domain::payout::{Payout, PayoutStatus};
use crate::domain::ports::{LedgerStoreRef, PayoutStoreRef};
use crate::error::{EngineError, Rejection, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// An organizer's settled position over a period. Pure aggregation over the
/// ledger: recomputing over the same entries yields the same numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct RevenueSummary {
    pub organizer_id: Uuid,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub gross_revenue: Decimal,
    pub total_refunds: Decimal,
    pub adjusted_revenue: Decimal,
    pub total_commission: Decimal,
    pub total_gateway_fees: Decimal,
    pub net_revenue: Decimal,
    pub entry_ids: Vec<Uuid>,
}

/// Aggregates completed ledger entries into summaries and payouts, and walks
/// payouts through approval and submission.
pub struct SettlementService {
    ledger: LedgerStoreRef,
    payouts: PayoutStoreRef,
}

impl SettlementService {
    pub fn new(ledger: LedgerStoreRef, payouts: PayoutStoreRef) -> Self {
        Self { ledger, payouts }
    }

    pub async fn revenue_summary(
        &self,
        organizer_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<RevenueSummary> {
        let entries = self
            .ledger
            .completed_for_organizer(organizer_id, from, to)
            .await?;

        let mut summary = RevenueSummary {
            organizer_id,
            from,
            to,
            gross_revenue: Decimal::ZERO,
            total_refunds: Decimal::ZERO,
            adjusted_revenue: Decimal::ZERO,
            total_commission: Decimal::ZERO,
            total_gateway_fees: Decimal::ZERO,
            net_revenue: Decimal::ZERO,
            entry_ids: Vec::new(),
        };
        for entry in &entries {
            match entry.kind {
                EntryKind::TicketSale => {
                    summary.gross_revenue += entry.amount;
                    summary.total_commission += entry.commission_amount;
                    summary.total_gateway_fees += entry.gateway_fee;
                    summary.net_revenue += entry.net_amount;
                    summary.entry_ids.push(entry.id);
                }
                EntryKind::Refund => {
                    // Refund entries are stored negated; aggregate absolutes.
                    summary.total_refunds += entry.amount.abs();
                    summary.total_commission -= entry.commission_amount.abs();
                    summary.net_revenue -= entry.net_amount.abs();
                    summary.entry_ids.push(entry.id);
                }
                _ => {}
            }
        }
        summary.adjusted_revenue = summary.gross_revenue - summary.total_refunds;
        Ok(summary)
    }

    /// Opens a payout for everything the organizer netted in the period.
    ///
    /// Mapping into the payout's invariant `net = gross - commission - fee`:
    /// gross is the refund-adjusted revenue, commission the platform's net
    /// cut, and the processing fee the gateway fees already withheld.
    pub async fn request_payout(
        &self,
        organizer_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Payout> {
        let summary = self.revenue_summary(organizer_id, from, to).await?;
        if summary.net_revenue <= Decimal::ZERO {
            return Err(EngineError::rejected(Rejection::NothingToSettle));
        }
        let currency = self
            .currency_of(&summary)
            .await?
            .unwrap_or_else(|| "USD".into());

        let payout = Payout {
            id: Uuid::new_v4(),
            organizer_id,
            gross_amount: summary.adjusted_revenue,
            commission: summary.total_commission,
            processing_fee: summary.total_gateway_fees,
            net_amount: summary.net_revenue,
            currency,
            status: PayoutStatus::Pending,
            entry_ids: summary.entry_ids,
            processor_reference: None,
            requested_at: now,
            approved_at: None,
            processed_at: None,
            completed_at: None,
            stuck_flagged_at: None,
            failure_reason: None,
        };
        self.payouts.store(payout.clone()).await?;
        tracing::info!(
            organizer = %organizer_id,
            net = %payout.net_amount,
            "payout requested"
        );
        Ok(payout)
    }

    pub async fn approve(&self, id: Uuid, now: DateTime<Utc>) -> Result<Payout> {
        self.transition(id, PayoutStatus::Approved, now).await
    }

    pub async fn reject(&self, id: Uuid, reason: &str, now: DateTime<Utc>) -> Result<Payout> {
        let mut payout = self.get(id).await?;
        payout.transition(PayoutStatus::Rejected, now)?;
        payout.failure_reason = Some(reason.to_string());
        self.payouts.store(payout.clone()).await?;
        Ok(payout)
    }

    /// Hands the payout to the transfer provider. The provider reference may
    /// arrive later; reconciliation flags payouts that never get one.
    pub async fn submit(
        &self,
        id: Uuid,
        processor_reference: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Payout> {
        let mut payout = self.get(id).await?;
        payout.transition(PayoutStatus::Processing, now)?;
        payout.processor_reference = processor_reference;
        self.payouts.store(payout.clone()).await?;
        Ok(payout)
    }

    async fn transition(&self, id: Uuid, next: PayoutStatus, now: DateTime<Utc>) -> Result<Payout> {
        let mut payout = self.get(id).await?;
        payout.transition(next, now)?;
        self.payouts.store(payout.clone()).await?;
        Ok(payout)
    }

    async fn get(&self, id: Uuid) -> Result<Payout> {
        self.payouts
            .get(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("payout {id}")))
    }

    async fn currency_of(&self, summary: &RevenueSummary) -> Result<Option<String>> {
        let Some(first) = summary.entry_ids.first() else {
            return Ok(None);
        };
        Ok(self
            .ledger
            .get(*first)
            .await?
            .map(|e: LedgerEntry| e.currency))
    }
}
