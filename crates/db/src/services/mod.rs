//! Transactional quote operations. Each public method runs in at most one
//! transaction; an error drops the transaction and rolls everything back.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection, Transaction};

use slideboard_core::catalog::PriceCatalog;
use slideboard_core::config::QuoteEngineSettings;
use slideboard_core::domain::quote::{Quote, QuoteId, TenantId};
use slideboard_core::errors::{ApplicationError, DomainError};
use slideboard_core::money::line_subtotal;
use slideboard_core::quoting::totals::{compute_totals, QuoteTotals};
use slideboard_core::risk::{DiscountRiskEvaluator, RiskEvaluator};

use crate::repositories::quote::{fetch_items, fetch_quote, update_item_pricing, update_totals};
use crate::repositories::{RepositoryError, SqlProductRepository};
use crate::DbPool;

mod expiration;
mod measurement_import;
mod submission;
mod versions;

pub struct QuoteEngine {
    pool: DbPool,
    settings: QuoteEngineSettings,
    catalog: Arc<dyn PriceCatalog>,
    risk: Arc<dyn RiskEvaluator>,
}

impl QuoteEngine {
    /// Engine priced from the `product` table with the default discount policy.
    pub fn new(pool: DbPool, settings: QuoteEngineSettings) -> Self {
        Self {
            catalog: Arc::new(SqlProductRepository::new(pool.clone())),
            risk: Arc::new(DiscountRiskEvaluator::default()),
            pool,
            settings,
        }
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn PriceCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_risk_evaluator(mut self, risk: Arc<dyn RiskEvaluator>) -> Self {
        self.risk = risk;
        self
    }

    pub fn settings(&self) -> &QuoteEngineSettings {
        &self.settings
    }

    pub async fn recompute_quote_totals(
        &self,
        quote_id: &QuoteId,
        tenant_id: &TenantId,
    ) -> Result<QuoteTotals, ApplicationError> {
        let now = Utc::now();
        let mut tx = begin(&self.pool).await?;
        let quote = require_quote(&mut tx, tenant_id, quote_id).await?;
        let totals = recompute_totals_in(&mut tx, &quote, now).await?;
        commit(tx).await?;
        Ok(totals)
    }
}

pub(crate) async fn begin(pool: &DbPool) -> Result<Transaction<'static, Sqlite>, ApplicationError> {
    Ok(pool.begin().await.map_err(RepositoryError::from)?)
}

pub(crate) async fn commit(tx: Transaction<'static, Sqlite>) -> Result<(), ApplicationError> {
    Ok(tx.commit().await.map_err(RepositoryError::from)?)
}

pub(crate) async fn acquire(pool: &DbPool) -> Result<PoolConnection<Sqlite>, ApplicationError> {
    Ok(pool.acquire().await.map_err(RepositoryError::from)?)
}

pub(crate) async fn require_quote(
    conn: &mut SqliteConnection,
    tenant_id: &TenantId,
    quote_id: &QuoteId,
) -> Result<Quote, ApplicationError> {
    fetch_quote(conn, tenant_id, quote_id)
        .await?
        .ok_or_else(|| DomainError::quote_not_found(quote_id).into())
}

/// Re-derives each item subtotal from price and quantity, then the quote's
/// totals from the subtotals, writing back whatever drifted.
pub(crate) async fn recompute_totals_in(
    conn: &mut SqliteConnection,
    quote: &Quote,
    now: DateTime<Utc>,
) -> Result<QuoteTotals, ApplicationError> {
    let items = fetch_items(conn, &quote.tenant_id, &quote.id).await?;
    let mut subtotals = Vec::with_capacity(items.len());
    for item in &items {
        let subtotal = line_subtotal(item.unit_price, item.quantity);
        if subtotal != item.subtotal {
            update_item_pricing(conn, &quote.tenant_id, &item.id, item.unit_price, subtotal, now)
                .await?;
        }
        subtotals.push(subtotal);
    }

    let totals = compute_totals(subtotals, quote.discount_rate, quote.discount_amount);
    update_totals(conn, &quote.tenant_id, &quote.id, &totals, now).await?;
    Ok(totals)
}
