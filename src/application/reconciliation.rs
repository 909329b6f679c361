use crate::domain::payout::{Payout, PayoutStatus, StuckReason};
use crate::domain::ports::{
    Notification, NotifierRef, PaymentGatewayRef, PayoutStoreRef, TransferStatus,
};
use crate::error::Result;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// How long a transfer-status query may block before it counts as
/// inconclusive for this pass.
const TRANSFER_STATUS_TIMEOUT: Duration = Duration::from_secs(10);

/// Counters for one reconciliation pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub examined: u32,
    pub expired: u32,
    pub completed: u32,
    pub failed: u32,
    pub flagged_stuck: u32,
}

/// Periodic comparison of payout state against the transfer provider.
///
/// A failing record never fails the pass: it is logged and the sweep moves
/// on. Ambiguous provider answers change nothing and are retried next pass.
pub struct ReconciliationService {
    payouts: PayoutStoreRef,
    gateway: PaymentGatewayRef,
    notifier: NotifierRef,
}

impl ReconciliationService {
    pub fn new(payouts: PayoutStoreRef, gateway: PaymentGatewayRef, notifier: NotifierRef) -> Self {
        Self {
            payouts,
            gateway,
            notifier,
        }
    }

    pub async fn reconcile(&self, now: DateTime<Utc>) -> Result<ReconcileOutcome> {
        let mut outcome = ReconcileOutcome::default();
        for payout in self.payouts.all_active().await? {
            outcome.examined += 1;
            let id = payout.id;
            if let Err(err) = self.reconcile_one(payout, now, &mut outcome).await {
                tracing::warn!(payout = %id, error = %err, "reconciliation skipped record");
            }
        }
        tracing::info!(
            examined = outcome.examined,
            expired = outcome.expired,
            completed = outcome.completed,
            failed = outcome.failed,
            stuck = outcome.flagged_stuck,
            "reconciliation pass finished"
        );
        Ok(outcome)
    }

    async fn reconcile_one(
        &self,
        mut payout: Payout,
        now: DateTime<Utc>,
        outcome: &mut ReconcileOutcome,
    ) -> Result<()> {
        if payout.approval_expired_at(now) {
            payout.transition(PayoutStatus::Expired, now)?;
            self.payouts.store(payout).await?;
            outcome.expired += 1;
            return Ok(());
        }

        if payout.status == PayoutStatus::Processing
            && let Some(reference) = payout.processor_reference.clone()
        {
            match self.query_transfer(&reference).await {
                TransferStatus::Completed => {
                    payout.transition(PayoutStatus::Completed, now)?;
                    self.payouts.store(payout).await?;
                    outcome.completed += 1;
                    return Ok(());
                }
                TransferStatus::Failed => {
                    payout.transition(PayoutStatus::Failed, now)?;
                    payout.failure_reason = Some("transfer failed or reversed".into());
                    self.payouts.store(payout).await?;
                    outcome.failed += 1;
                    return Ok(());
                }
                TransferStatus::Inconclusive => {
                    // No transition; fall through to stuck classification.
                }
            }
        }

        if let Some(reason) = payout.classify_stuck(now)
            && payout.stuck_flagged_at.is_none()
        {
            payout.stuck_flagged_at = Some(now);
            self.payouts.store(payout.clone()).await?;
            self.notifier
                .notify(Notification::PayoutStuck {
                    payout_id: payout.id,
                    organizer_id: payout.organizer_id,
                    processor_reference: payout.processor_reference.clone(),
                    reason,
                    age_hours: stuck_age_hours(&payout, reason, now),
                })
                .await?;
            outcome.flagged_stuck += 1;
        }
        Ok(())
    }

    /// Fail-closed status query: provider errors and timeouts both come back
    /// inconclusive and are re-checked on the next pass.
    async fn query_transfer(&self, reference: &str) -> TransferStatus {
        match tokio::time::timeout(
            TRANSFER_STATUS_TIMEOUT,
            self.gateway.transfer_status(reference),
        )
        .await
        {
            Ok(Ok(status)) => status,
            Ok(Err(err)) => {
                tracing::warn!(reference, error = %err, "transfer status query failed");
                TransferStatus::Inconclusive
            }
            Err(_) => {
                tracing::warn!(reference, "transfer status query timed out");
                TransferStatus::Inconclusive
            }
        }
    }
}

fn stuck_age_hours(payout: &Payout, reason: StuckReason, now: DateTime<Utc>) -> i64 {
    let since = match reason {
        StuckReason::AwaitingSubmission => payout.approved_at,
        StuckReason::MissingProviderReference | StuckReason::InconclusiveProvider => {
            payout.processed_at
        }
    };
    since.map(|t| (now - t).num_hours()).unwrap_or(0)
}
