use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::{round_money, sum_money};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteTotals {
    pub total_amount: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
}

/// Quote-level amounts from item subtotals.
///
/// With a `discount_rate` (payable ratio) the final amount is the rounded
/// product and the discount is whatever it takes off. Without one, a fixed
/// `discount_amount` is subtracted and the final amount floors at zero.
pub fn compute_totals<I>(
    subtotals: I,
    discount_rate: Option<Decimal>,
    discount_amount: Decimal,
) -> QuoteTotals
where
    I: IntoIterator<Item = Decimal>,
{
    let total_amount = sum_money(subtotals);
    match discount_rate {
        Some(rate) => {
            let final_amount = round_money(total_amount * rate);
            QuoteTotals {
                total_amount,
                discount_amount: round_money(total_amount - final_amount),
                final_amount,
            }
        }
        None => {
            let discount_amount = round_money(discount_amount);
            QuoteTotals {
                total_amount,
                discount_amount,
                final_amount: round_money((total_amount - discount_amount).max(Decimal::ZERO)),
            }
        }
    }
}
