use chrono::Utc;
use tracing::info;

use slideboard_core::domain::quote::{QuoteId, TenantId};
use slideboard_core::errors::ApplicationError;
use slideboard_core::quoting::submission::{plan_submission, SubmissionOutcome};

use super::{begin, commit, require_quote, QuoteEngine};
use crate::repositories::quote::{fetch_items, update_status};

impl QuoteEngine {
    /// Sends a DRAFT to the customer, or to approval when the risk check asks for it.
    pub async fn submit_quote(
        &self,
        quote_id: &QuoteId,
        tenant_id: &TenantId,
    ) -> Result<SubmissionOutcome, ApplicationError> {
        let now = Utc::now();
        let mut tx = begin(&self.pool).await?;
        let quote = require_quote(&mut tx, tenant_id, quote_id).await?;
        let items = fetch_items(&mut tx, tenant_id, quote_id).await?;

        let outcome = plan_submission(&quote, &items, self.risk.as_ref(), now)?;
        update_status(&mut tx, tenant_id, quote_id, outcome.status, now).await?;
        commit(tx).await?;

        info!(
            event_name = "quote.submitted",
            tenant_id = %tenant_id.0,
            quote_id = %quote_id.0,
            status = %outcome.status,
            reasons = outcome.reasons.len(),
            "quote submitted"
        );
        Ok(outcome)
    }
}
