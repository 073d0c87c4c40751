//! Fixed-point money helpers.
//!
//! All amounts are `rust_decimal::Decimal`; nothing here touches binary
//! floating point. Amounts leave the process as two-place decimal strings.

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places money is stored and transported with.
pub const MONEY_SCALE: u32 = 2;

pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// `unit_price × quantity`, rounded to cents.
pub fn line_subtotal(unit_price: Decimal, quantity: Decimal) -> Decimal {
    round_money(unit_price * quantity)
}

/// Exact sum, rounded once at the end.
pub fn sum_money<I>(values: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    round_money(values.into_iter().sum())
}

pub fn differs_beyond(left: Decimal, right: Decimal, threshold: Decimal) -> bool {
    (left - right).abs() > threshold
}

/// Wire form: `"1234.50"`.
pub fn to_wire(value: Decimal) -> String {
    round_money(value).to_string()
}
