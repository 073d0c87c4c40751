use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::product::ProductId;
use crate::domain::quote::{Quote, QuoteId, QuoteItem, QuoteItemId, QuoteStatus};
use crate::errors::DomainError;
use crate::money::{differs_beyond, line_subtotal, round_money};

/// Validity window granted by a price refresh when the caller names none.
pub const DEFAULT_VALID_DAYS: u32 = 7;

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpirationVerdict {
    /// Status is already `Expired`; nothing to write.
    AlreadyExpired,
    /// Validity has lapsed on an expirable status; flip to `Expired`.
    Overdue,
    Current,
}

pub fn evaluate_expiration(quote: &Quote, now: DateTime<Utc>) -> ExpirationVerdict {
    if quote.status == QuoteStatus::Expired {
        return ExpirationVerdict::AlreadyExpired;
    }
    match quote.valid_until {
        Some(valid_until) if valid_until < now && quote.status.is_expirable() => {
            ExpirationVerdict::Overdue
        }
        _ => ExpirationVerdict::Current,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpirationCheck {
    pub quote_id: QuoteId,
    pub expired: bool,
    /// True only when this call moved the quote to `Expired`.
    pub transitioned: bool,
    pub status: QuoteStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpirationInfo {
    pub quote_id: QuoteId,
    pub status: QuoteStatus,
    pub is_expired: bool,
    pub valid_until: Option<DateTime<Utc>>,
    /// Whole days until `valid_until`, rounded up; negative once lapsed.
    pub days_remaining: Option<i64>,
}

pub fn expiration_info(quote: &Quote, now: DateTime<Utc>) -> ExpirationInfo {
    let is_expired = evaluate_expiration(quote, now) != ExpirationVerdict::Current;
    ExpirationInfo {
        quote_id: quote.id.clone(),
        status: quote.status,
        is_expired,
        valid_until: quote.valid_until,
        days_remaining: quote.valid_until.map(|valid_until| days_until(valid_until, now)),
    }
}

fn days_until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let seconds = (deadline - now).num_seconds();
    -(-seconds).div_euclid(SECONDS_PER_DAY)
}

pub fn extended_validity(now: DateTime<Utc>, valid_days: u32) -> DateTime<Utc> {
    now + Duration::days(i64::from(valid_days))
}

pub fn ensure_refreshable(quote: &Quote) -> Result<(), DomainError> {
    match quote.status {
        QuoteStatus::Expired | QuoteStatus::Draft => Ok(()),
        status => Err(DomainError::InvalidState {
            quote_id: quote.id.clone(),
            status,
            operation: "refresh prices of",
        }),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceChange {
    pub item_id: QuoteItemId,
    pub old_price: Decimal,
    pub new_price: Decimal,
}

/// New price and subtotal for an item whose catalog price moved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepricedItem {
    pub change: PriceChange,
    pub subtotal: Decimal,
}

/// Product ids to look up, de-duplicated, in first-seen order.
pub fn priced_product_ids(items: &[QuoteItem]) -> Vec<ProductId> {
    let mut ids: Vec<ProductId> = Vec::new();
    for product_id in items.iter().filter_map(|item| item.product_id.as_ref()) {
        if !ids.contains(product_id) {
            ids.push(product_id.clone());
        }
    }
    ids
}

/// Items whose catalog price differs from the recorded unit price by more
/// than `threshold`. Items without a product or without a catalog entry keep
/// their price.
pub fn reprice_items(
    items: &[QuoteItem],
    prices: &HashMap<ProductId, Decimal>,
    threshold: Decimal,
) -> Vec<RepricedItem> {
    items
        .iter()
        .filter_map(|item| {
            let current = prices.get(item.product_id.as_ref()?)?;
            if !differs_beyond(*current, item.unit_price, threshold) {
                return None;
            }
            let new_price = round_money(*current);
            Some(RepricedItem {
                change: PriceChange {
                    item_id: item.id.clone(),
                    old_price: item.unit_price,
                    new_price,
                },
                subtotal: line_subtotal(new_price, item.quantity),
            })
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshOutcome {
    pub quote_id: QuoteId,
    pub changes: Vec<PriceChange>,
    pub total_amount: Decimal,
    pub final_amount: Decimal,
    pub valid_until: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub processed: u64,
    pub expired: u64,
}
