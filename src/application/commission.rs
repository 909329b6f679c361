use crate::domain::event::{CommissionKind, EventConfig, OrganizerConfig};
use crate::domain::ledger::LedgerEntry;
use crate::domain::money::{percentage_of, round_money};
use rust_decimal::Decimal;
use serde::Serialize;

/// Which configuration source won the precedence cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommissionSource {
    EventPlatformFee,
    EventCommission,
    OrganizerCommission,
    Default,
}

/// Platform commission applied when no configuration source matches.
pub const DEFAULT_COMMISSION_RATE: Decimal = Decimal::TEN;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommissionBreakdown {
    /// Commission in the booking currency, rounded to 2 dp.
    pub amount: Decimal,
    pub rate: Decimal,
    pub kind: CommissionKind,
    pub source: CommissionSource,
}

type Resolver = fn(&EventConfig, &OrganizerConfig, Decimal) -> Option<CommissionBreakdown>;

/// Precedence order. First `Some` wins; inconsistent configuration at any
/// level falls through to the next rather than erroring.
const RESOLVERS: [Resolver; 3] = [
    resolve_event_platform_fee,
    resolve_event_commission,
    resolve_organizer_commission,
];

/// Resolves the platform's cut of `subtotal`. Never fails: worst case the
/// hardcoded default applies.
pub fn resolve_commission(
    event: &EventConfig,
    organizer: &OrganizerConfig,
    subtotal: Decimal,
) -> CommissionBreakdown {
    RESOLVERS
        .iter()
        .find_map(|resolve| resolve(event, organizer, subtotal))
        .unwrap_or_else(|| CommissionBreakdown {
            amount: percentage_of(subtotal, DEFAULT_COMMISSION_RATE),
            rate: DEFAULT_COMMISSION_RATE,
            kind: CommissionKind::Percentage,
            source: CommissionSource::Default,
        })
}

fn resolve_event_platform_fee(
    event: &EventConfig,
    _organizer: &OrganizerConfig,
    subtotal: Decimal,
) -> Option<CommissionBreakdown> {
    let rate = event.platform_fee?;
    if rate <= Decimal::ZERO {
        return None;
    }
    Some(CommissionBreakdown {
        amount: percentage_of(subtotal, rate),
        rate,
        kind: CommissionKind::Percentage,
        source: CommissionSource::EventPlatformFee,
    })
}

fn resolve_event_commission(
    event: &EventConfig,
    _organizer: &OrganizerConfig,
    subtotal: Decimal,
) -> Option<CommissionBreakdown> {
    // Rate without kind (or kind without rate) is inconsistent configuration:
    // fall through.
    let rate = event.commission_rate?;
    let kind = event.commission_kind?;
    if rate < Decimal::ZERO {
        return None;
    }
    let amount = match kind {
        CommissionKind::Percentage => percentage_of(subtotal, rate),
        CommissionKind::Fixed => round_money(rate),
    };
    Some(CommissionBreakdown {
        amount,
        rate,
        kind,
        source: CommissionSource::EventCommission,
    })
}

fn resolve_organizer_commission(
    _event: &EventConfig,
    organizer: &OrganizerConfig,
    subtotal: Decimal,
) -> Option<CommissionBreakdown> {
    let rate = organizer.commission_rate?;
    if rate < Decimal::ZERO {
        return None;
    }
    Some(CommissionBreakdown {
        amount: percentage_of(subtotal, rate),
        rate,
        kind: CommissionKind::Percentage,
        source: CommissionSource::OrganizerCommission,
    })
}

/// Gateway fee rate by payment method, percent of gross.
pub fn gateway_fee_rate(method: &str) -> Decimal {
    match method {
        "mobile_money" | "momo" => Decimal::new(15, 1),
        "card" => Decimal::new(29, 1),
        "bank_transfer" | "bank" => Decimal::new(15, 1),
        other => {
            // Unrecognized channels price at the card rate, as the gateway does.
            tracing::warn!(method = other, "unknown payment method, using card rate");
            Decimal::new(29, 1)
        }
    }
}

pub fn gateway_fee(method: &str, gross: Decimal) -> Decimal {
    percentage_of(gross, gateway_fee_rate(method))
}

/// The full per-sale split: commission on the subtotal, gateway fee on the
/// gross, and what the organizer nets.
#[derive(Debug, Clone, PartialEq)]
pub struct FeeBreakdown {
    pub commission: CommissionBreakdown,
    pub gateway_fee: Decimal,
    pub net: Decimal,
}

pub fn breakdown(
    event: &EventConfig,
    organizer: &OrganizerConfig,
    subtotal: Decimal,
    gross: Decimal,
    method: &str,
) -> FeeBreakdown {
    let commission = resolve_commission(event, organizer, subtotal);
    let fee = gateway_fee(method, gross);
    let net = round_money(gross - fee - commission.amount);
    FeeBreakdown {
        commission,
        gateway_fee: fee,
        net,
    }
}

/// How a refund of `amount` against a completed sale splits.
///
/// Commission comes back proportionally; the gateway's processing fee never
/// does.
#[derive(Debug, Clone, PartialEq)]
pub struct RefundBreakdown {
    pub amount: Decimal,
    pub commission_refund: Decimal,
    pub gateway_fee_refund: Decimal,
    pub net_refund: Decimal,
    pub is_partial: bool,
}

pub fn apportion_refund(original: &LedgerEntry, amount: Decimal) -> RefundBreakdown {
    let commission_refund = if original.amount.is_zero() {
        Decimal::ZERO
    } else {
        round_money(original.commission_amount * amount / original.amount)
    };
    RefundBreakdown {
        amount,
        commission_refund,
        gateway_fee_refund: Decimal::ZERO,
        net_refund: round_money(amount - commission_refund),
        is_partial: amount < original.amount,
    }
}
