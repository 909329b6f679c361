use crate::error::{EngineError, Result};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Days a payout may sit unapproved before the reconciliation sweep expires it.
pub const APPROVAL_WINDOW_DAYS: i64 = 30;
/// Hours an approved payout may wait for submission before it is flagged stuck.
pub const APPROVED_STUCK_HOURS: i64 = 24;
/// Hours a processing payout may lack a provider reference before flagging.
pub const PROCESSING_STUCK_HOURS: i64 = 48;
/// Hours a processing payout may stay inconclusive before flagging.
pub const INCONCLUSIVE_STUCK_HOURS: i64 = 72;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoutStatus {
    Pending,
    Approved,
    Processing,
    Completed,
    Failed,
    Rejected,
    Expired,
}

impl PayoutStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PayoutStatus::Completed
                | PayoutStatus::Failed
                | PayoutStatus::Rejected
                | PayoutStatus::Expired
        )
    }

    /// The transition table. Forward-only, except that any non-terminal
    /// state may be failed via manual override.
    pub fn can_transition_to(&self, next: PayoutStatus) -> bool {
        use PayoutStatus::*;
        matches!(
            (self, next),
            (Pending, Approved)
                | (Pending, Rejected)
                | (Pending, Expired)
                | (Pending, Failed)
                | (Approved, Processing)
                | (Approved, Failed)
                | (Processing, Completed)
                | (Processing, Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutStatus::Pending => "pending",
            PayoutStatus::Approved => "approved",
            PayoutStatus::Processing => "processing",
            PayoutStatus::Completed => "completed",
            PayoutStatus::Failed => "failed",
            PayoutStatus::Rejected => "rejected",
            PayoutStatus::Expired => "expired",
        }
    }
}

/// Why a payout was classified stuck. An alarm, not a state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StuckReason {
    /// Approved more than 24h ago without moving to processing.
    AwaitingSubmission,
    /// Processing more than 48h without a provider reference.
    MissingProviderReference,
    /// Processing more than 72h with only inconclusive provider answers.
    InconclusiveProvider,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payout {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub gross_amount: Decimal,
    pub commission: Decimal,
    pub processing_fee: Decimal,
    pub net_amount: Decimal,
    pub currency: String,
    pub status: PayoutStatus,
    /// Completed ledger entries this payout settles.
    pub entry_ids: Vec<Uuid>,
    pub processor_reference: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Set the first time the payout classifies as stuck, so repeated
    /// reconciliation passes raise exactly one alert.
    pub stuck_flagged_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
}

impl Payout {
    /// Moves to `next` if the transition table allows it, stamping the
    /// matching timestamp.
    pub fn transition(&mut self, next: PayoutStatus, now: DateTime<Utc>) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(EngineError::InvalidTransition(format!(
                "payout {}: {} -> {}",
                self.id,
                self.status.as_str(),
                next.as_str()
            )));
        }
        self.status = next;
        match next {
            PayoutStatus::Approved => self.approved_at = Some(now),
            PayoutStatus::Processing => self.processed_at = Some(now),
            PayoutStatus::Completed => self.completed_at = Some(now),
            _ => {}
        }
        Ok(())
    }

    /// Pure stuck classification; notification is the caller's concern.
    pub fn classify_stuck(&self, now: DateTime<Utc>) -> Option<StuckReason> {
        match self.status {
            PayoutStatus::Approved => {
                let approved_at = self.approved_at?;
                (now - approved_at > Duration::hours(APPROVED_STUCK_HOURS))
                    .then_some(StuckReason::AwaitingSubmission)
            }
            PayoutStatus::Processing => {
                let processed_at = self.processed_at?;
                let age = now - processed_at;
                if self.processor_reference.is_none()
                    && age > Duration::hours(PROCESSING_STUCK_HOURS)
                {
                    Some(StuckReason::MissingProviderReference)
                } else if age > Duration::hours(INCONCLUSIVE_STUCK_HOURS) {
                    Some(StuckReason::InconclusiveProvider)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Whether the approval window has lapsed with the payout still pending.
    pub fn approval_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == PayoutStatus::Pending
            && now - self.requested_at > Duration::days(APPROVAL_WINDOW_DAYS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn payout(status: PayoutStatus) -> Payout {
        Payout {
            id: Uuid::new_v4(),
            organizer_id: Uuid::new_v4(),
            gross_amount: dec!(1000),
            commission: dec!(100),
            processing_fee: dec!(15),
            net_amount: dec!(885),
            currency: "USD".into(),
            status,
            entry_ids: vec![],
            processor_reference: None,
            requested_at: Utc::now(),
            approved_at: None,
            processed_at: None,
            completed_at: None,
            stuck_flagged_at: None,
            failure_reason: None,
        }
    }

    #[test]
    fn test_happy_path_transitions() {
        let now = Utc::now();
        let mut p = payout(PayoutStatus::Pending);
        p.transition(PayoutStatus::Approved, now).unwrap();
        p.transition(PayoutStatus::Processing, now).unwrap();
        p.transition(PayoutStatus::Completed, now).unwrap();
        assert_eq!(p.status, PayoutStatus::Completed);
        assert!(p.approved_at.is_some());
        assert!(p.completed_at.is_some());
    }

    #[test]
    fn test_illegal_transitions_rejected() {
        let now = Utc::now();
        let mut p = payout(PayoutStatus::Pending);
        assert!(matches!(
            p.transition(PayoutStatus::Completed, now),
            Err(EngineError::InvalidTransition(_))
        ));

        let mut p = payout(PayoutStatus::Completed);
        assert!(p.transition(PayoutStatus::Failed, now).is_err());
    }

    #[test]
    fn test_any_non_terminal_can_fail() {
        let now = Utc::now();
        for status in [
            PayoutStatus::Pending,
            PayoutStatus::Approved,
            PayoutStatus::Processing,
        ] {
            let mut p = payout(status);
            p.transition(PayoutStatus::Failed, now).unwrap();
            assert_eq!(p.status, PayoutStatus::Failed);
        }
    }

    #[test]
    fn test_stuck_approved_after_24h() {
        let now = Utc::now();
        let mut p = payout(PayoutStatus::Approved);
        p.approved_at = Some(now - Duration::hours(25));
        assert_eq!(p.classify_stuck(now), Some(StuckReason::AwaitingSubmission));

        p.approved_at = Some(now - Duration::hours(23));
        assert_eq!(p.classify_stuck(now), None);
    }

    #[test]
    fn test_stuck_processing_variants() {
        let now = Utc::now();
        let mut p = payout(PayoutStatus::Processing);
        p.processed_at = Some(now - Duration::hours(49));
        assert_eq!(
            p.classify_stuck(now),
            Some(StuckReason::MissingProviderReference)
        );

        p.processor_reference = Some("tr_1".into());
        assert_eq!(p.classify_stuck(now), None);

        p.processed_at = Some(now - Duration::hours(73));
        assert_eq!(
            p.classify_stuck(now),
            Some(StuckReason::InconclusiveProvider)
        );
    }

    #[test]
    fn test_approval_window_expiry() {
        let now = Utc::now();
        let mut p = payout(PayoutStatus::Pending);
        p.requested_at = now - Duration::days(31);
        assert!(p.approval_expired_at(now));

        p.requested_at = now - Duration::days(29);
        assert!(!p.approval_expired_at(now));
    }
}
