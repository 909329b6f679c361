use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Reasons a booking (or ticket operation) can be refused.
///
/// These are business outcomes, not faults: the caller gets the full list of
/// everything that was wrong with the request, never a partial application.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("event is not open for sales")]
    EventNotPublished,
    #[error("event has already taken place")]
    EventInPast,
    #[error("unknown ticket type \"{name}\"")]
    UnknownTicketType { name: String },
    #[error("quantity {requested} exceeds the per-order limit of {max} for \"{name}\"")]
    OverOrderLimit { name: String, requested: u32, max: u32 },
    #[error("sales for \"{name}\" haven't started")]
    SaleNotStarted { name: String },
    #[error("sales for \"{name}\" have ended")]
    SaleEnded { name: String },
    #[error("not enough tickets left")]
    SoldOut,
    #[error("a pending booking already exists for this event (reference {reference})")]
    DuplicateBooking { reference: String },
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    #[error("ticket is not transferable")]
    NotTransferable,
    #[error("cannot transfer a ticket to its current holder")]
    TransferToSelf,
    #[error("ticket is {status} and cannot be used")]
    TicketNotUsable { status: String },
    #[error("refund amount exceeds the booking total")]
    RefundOverTotal,
    #[error("a refund request is already open for this booking")]
    RefundAlreadyOpen,
    #[error("amount must be positive")]
    NonPositiveAmount,
    #[error("booking has not been paid")]
    BookingNotPaid,
    #[error("no settled revenue in the period")]
    NothingToSettle,
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// The request was understood and refused; reasons are exhaustive.
    #[error("rejected: {}", format_rejections(.0))]
    Rejected(Vec<Rejection>),

    #[error("not found: {0}")]
    NotFound(String),

    /// Gateway failure or ambiguous response. Retryable; no financial state
    /// was changed.
    #[error("gateway error: {0}")]
    Gateway(String),

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("invalid QR payload: {0}")]
    InvalidQr(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    pub fn rejected(reason: Rejection) -> Self {
        Self::Rejected(vec![reason])
    }

    /// The itemized rejection list, if this is a business rejection.
    pub fn rejections(&self) -> Option<&[Rejection]> {
        match self {
            Self::Rejected(reasons) => Some(reasons),
            _ => None,
        }
    }
}

fn format_rejections(reasons: &[Rejection]) -> String {
    reasons
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_lists_every_reason() {
        let err = EngineError::Rejected(vec![
            Rejection::ZeroQuantity,
            Rejection::UnknownTicketType { name: "VIP".into() },
        ]);
        let msg = err.to_string();
        assert!(msg.contains("quantity must be at least 1"));
        assert!(msg.contains("unknown ticket type \"VIP\""));
    }

    #[test]
    fn test_duplicate_booking_echoes_reference() {
        let err = EngineError::rejected(Rejection::DuplicateBooking {
            reference: "BK-42".into(),
        });
        assert!(err.to_string().contains("BK-42"));
        assert_eq!(err.rejections().unwrap().len(), 1);
    }
}
