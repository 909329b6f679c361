use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a monetary value to 2 decimal places, half-up.
///
/// Every amount that leaves a calculation (commission, fees, refund shares)
/// goes through this so that the settlement identity
/// `net = gross - commission - fee` holds to the cent.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `rate` percent of `amount`, rounded to 2 decimal places.
pub fn percentage_of(amount: Decimal, rate: Decimal) -> Decimal {
    round_money(amount * rate / Decimal::ONE_HUNDRED)
}
