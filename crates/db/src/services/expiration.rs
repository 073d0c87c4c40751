use std::collections::HashMap;

use chrono::Utc;
use tracing::info;

use slideboard_core::domain::quote::{QuoteId, QuoteStatus, TenantId};
use slideboard_core::errors::{ApplicationError, DomainError};
use slideboard_core::quoting::expiration::{
    ensure_refreshable, evaluate_expiration, expiration_info, extended_validity,
    priced_product_ids, reprice_items, ExpirationCheck, ExpirationInfo, ExpirationVerdict,
    RefreshOutcome, SweepReport,
};

use super::{acquire, begin, commit, recompute_totals_in, require_quote, QuoteEngine};
use crate::repositories::quote::{
    expire_overdue, fetch_items, overdue_quote_ids, reopen_as_draft, update_item_pricing,
    update_status,
};

impl QuoteEngine {
    /// Expires `quote_id` if its validity lapsed. Already-expired quotes are
    /// reported without a write.
    pub async fn check_and_expire_quote(
        &self,
        quote_id: &QuoteId,
        tenant_id: &TenantId,
    ) -> Result<ExpirationCheck, ApplicationError> {
        let now = Utc::now();
        let mut tx = begin(&self.pool).await?;
        let quote = require_quote(&mut tx, tenant_id, quote_id).await?;

        let check = match evaluate_expiration(&quote, now) {
            ExpirationVerdict::AlreadyExpired => ExpirationCheck {
                quote_id: quote_id.clone(),
                expired: true,
                transitioned: false,
                status: QuoteStatus::Expired,
            },
            ExpirationVerdict::Overdue => {
                update_status(&mut tx, tenant_id, quote_id, QuoteStatus::Expired, now).await?;
                ExpirationCheck {
                    quote_id: quote_id.clone(),
                    expired: true,
                    transitioned: true,
                    status: QuoteStatus::Expired,
                }
            }
            ExpirationVerdict::Current => ExpirationCheck {
                quote_id: quote_id.clone(),
                expired: false,
                transitioned: false,
                status: quote.status,
            },
        };
        commit(tx).await?;

        if check.transitioned {
            info!(
                event_name = "quote.expired",
                tenant_id = %tenant_id.0,
                quote_id = %quote_id.0,
                previous_status = %quote.status,
                "quote expired"
            );
        }
        Ok(check)
    }

    /// Expires every overdue open quote, for one tenant or (with `None`) all of them.
    pub async fn expire_all_overdue_quotes(
        &self,
        tenant_id: Option<&TenantId>,
    ) -> Result<SweepReport, ApplicationError> {
        let now = Utc::now();
        let mut tx = begin(&self.pool).await?;

        let candidates = overdue_quote_ids(&mut tx, tenant_id, now).await?;
        let expired = if candidates.is_empty() {
            0
        } else {
            expire_overdue(&mut tx, tenant_id, now).await?
        };
        commit(tx).await?;

        let report = SweepReport { processed: candidates.len() as u64, expired };
        info!(
            event_name = "quote.expiration.sweep",
            tenant_id = tenant_id.map_or("*", |id| id.0.as_str()),
            processed = report.processed,
            expired = report.expired,
            "overdue quotes swept"
        );
        Ok(report)
    }

    /// Reprices an EXPIRED or DRAFT quote from the catalog and reopens it as a
    /// DRAFT valid for `valid_days` (the configured default when `None`).
    pub async fn refresh_expired_quote_prices(
        &self,
        quote_id: &QuoteId,
        tenant_id: &TenantId,
        valid_days: Option<u32>,
    ) -> Result<RefreshOutcome, ApplicationError> {
        let valid_days = valid_days.unwrap_or(self.settings.default_valid_days);
        if valid_days == 0 {
            return Err(DomainError::InvariantViolation(
                "a refreshed quote must stay valid for at least one day".to_string(),
            )
            .into());
        }

        // Catalog lookup happens before the transaction so a catalog backed by
        // this same pool never waits on the connection the transaction holds.
        let product_ids = {
            let mut conn = acquire(&self.pool).await?;
            let quote = require_quote(&mut conn, tenant_id, quote_id).await?;
            ensure_refreshable(&quote)?;
            priced_product_ids(&fetch_items(&mut conn, tenant_id, quote_id).await?)
        };
        let prices = if product_ids.is_empty() {
            HashMap::new()
        } else {
            self.catalog.current_prices(tenant_id, &product_ids).await?
        };

        let now = Utc::now();
        let mut tx = begin(&self.pool).await?;
        let quote = require_quote(&mut tx, tenant_id, quote_id).await?;
        ensure_refreshable(&quote)?;
        let items = fetch_items(&mut tx, tenant_id, quote_id).await?;
        if priced_product_ids(&items).iter().any(|product_id| !product_ids.contains(product_id)) {
            return Err(ApplicationError::Conflict(format!(
                "quote {} gained priced items during the catalog lookup",
                quote_id.0
            )));
        }

        let repriced = reprice_items(&items, &prices, self.settings.price_change_threshold);
        for item in &repriced {
            update_item_pricing(
                &mut tx,
                tenant_id,
                &item.change.item_id,
                item.change.new_price,
                item.subtotal,
                now,
            )
            .await?;
        }

        let totals = recompute_totals_in(&mut tx, &quote, now).await?;
        let valid_until = extended_validity(now, valid_days);
        reopen_as_draft(&mut tx, tenant_id, quote_id, valid_until, now).await?;
        commit(tx).await?;

        info!(
            event_name = "quote.prices.refreshed",
            tenant_id = %tenant_id.0,
            quote_id = %quote_id.0,
            previous_status = %quote.status,
            changed_items = repriced.len(),
            total_amount = %totals.total_amount,
            valid_until = %valid_until,
            "quote prices refreshed"
        );
        Ok(RefreshOutcome {
            quote_id: quote_id.clone(),
            changes: repriced.into_iter().map(|item| item.change).collect(),
            total_amount: totals.total_amount,
            final_amount: totals.final_amount,
            valid_until,
        })
    }

    pub async fn get_expiration_info(
        &self,
        quote_id: &QuoteId,
        tenant_id: &TenantId,
    ) -> Result<ExpirationInfo, ApplicationError> {
        let mut conn = acquire(&self.pool).await?;
        let quote = require_quote(&mut conn, tenant_id, quote_id).await?;
        Ok(expiration_info(&quote, Utc::now()))
    }
}
