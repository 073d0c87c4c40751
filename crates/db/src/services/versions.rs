use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::info;

use slideboard_core::domain::quote::{CustomerId, Quote, QuoteId, QuoteTree, TenantId, UserId};
use slideboard_core::errors::{ApplicationError, DomainError};
use slideboard_core::quoting::clone::{plan_tree_copy, TreeCopy};
use slideboard_core::quoting::expiration::extended_validity;
use slideboard_core::quoting::versioning::{
    ensure_single_active, plan_independent_copy, plan_next_version,
};

use super::{acquire, begin, commit, require_quote, QuoteEngine};
use crate::repositories::quote::{
    activate, backfill_root, deactivate_family, fetch_family, fetch_tree, insert_item,
    insert_quote, insert_room,
};
use crate::repositories::RepositoryError;

impl QuoteEngine {
    /// Makes `quote_id` the single active version of its family.
    pub async fn activate_version(
        &self,
        quote_id: &QuoteId,
        tenant_id: &TenantId,
    ) -> Result<Quote, ApplicationError> {
        let now = Utc::now();
        let mut tx = begin(&self.pool).await?;

        let quote = require_quote(&mut tx, tenant_id, quote_id).await?;
        quote.check_lineage()?;
        let root = quote.family_root();

        deactivate_family(&mut tx, tenant_id, &root, now).await?;
        activate(&mut tx, tenant_id, quote_id, now).await?;

        let family = fetch_family(&mut tx, tenant_id, &root).await?;
        let active = ensure_single_active(&family)?.clone();
        commit(tx).await?;

        info!(
            event_name = "quote.version.activated",
            tenant_id = %tenant_id.0,
            quote_id = %quote_id.0,
            root_quote_id = %root.0,
            version = active.version,
            family_size = family.len(),
            "quote version activated"
        );
        Ok(active)
    }

    /// Branches a new active DRAFT version from `quote_id`, copying its tree.
    pub async fn create_next_version(
        &self,
        quote_id: &QuoteId,
        user_id: &UserId,
        tenant_id: &TenantId,
    ) -> Result<Quote, ApplicationError> {
        let now = Utc::now();
        let mut tx = begin(&self.pool).await?;

        let source = require_tree(&mut tx, tenant_id, quote_id).await?;
        let root = source.quote.family_root();
        backfill_root(&mut tx, tenant_id, &root).await?;
        let family = fetch_family(&mut tx, tenant_id, &root).await?;

        let valid_until = extended_validity(now, self.settings.default_valid_days);
        let next = plan_next_version(&source.quote, &family, user_id, Some(valid_until), now)?;

        deactivate_family(&mut tx, tenant_id, &root, now).await?;
        insert_quote(&mut tx, &next).await?;
        let copy = plan_tree_copy(&source, &next.id, tenant_id, now);
        insert_copy(&mut tx, &copy).await?;
        commit(tx).await?;

        info!(
            event_name = "quote.version.created",
            tenant_id = %tenant_id.0,
            quote_id = %next.id.0,
            source_quote_id = %quote_id.0,
            root_quote_id = %root.0,
            version = next.version,
            rooms = copy.rooms.len(),
            items = copy.items.len(),
            "quote version created"
        );
        Ok(next)
    }

    /// Copies `quote_id` into a brand-new family, optionally for another customer.
    pub async fn copy_quote(
        &self,
        quote_id: &QuoteId,
        user_id: &UserId,
        tenant_id: &TenantId,
        target_customer_id: Option<&CustomerId>,
    ) -> Result<Quote, ApplicationError> {
        let now = Utc::now();
        let mut tx = begin(&self.pool).await?;

        let source = require_tree(&mut tx, tenant_id, quote_id).await?;
        let valid_until = extended_validity(now, self.settings.default_valid_days);
        let copy_head = plan_independent_copy(
            &source.quote,
            target_customer_id,
            user_id,
            Some(valid_until),
            now,
        );

        insert_quote(&mut tx, &copy_head).await?;
        let copy = plan_tree_copy(&source, &copy_head.id, tenant_id, now);
        insert_copy(&mut tx, &copy).await?;
        commit(tx).await?;

        info!(
            event_name = "quote.copied",
            tenant_id = %tenant_id.0,
            quote_id = %copy_head.id.0,
            source_quote_id = %quote_id.0,
            customer_id = %copy_head.customer_id.0,
            rooms = copy.rooms.len(),
            items = copy.items.len(),
            "quote copied into a new family"
        );
        Ok(copy_head)
    }

    /// The whole family of `quote_id`, oldest version first.
    pub async fn list_versions(
        &self,
        quote_id: &QuoteId,
        tenant_id: &TenantId,
    ) -> Result<Vec<Quote>, ApplicationError> {
        let mut conn = acquire(&self.pool).await?;
        let quote = require_quote(&mut conn, tenant_id, quote_id).await?;
        Ok(fetch_family(&mut conn, tenant_id, &quote.family_root()).await?)
    }
}

async fn require_tree(
    conn: &mut SqliteConnection,
    tenant_id: &TenantId,
    quote_id: &QuoteId,
) -> Result<QuoteTree, ApplicationError> {
    fetch_tree(conn, tenant_id, quote_id)
        .await?
        .ok_or_else(|| DomainError::quote_not_found(quote_id).into())
}

async fn insert_copy(conn: &mut SqliteConnection, copy: &TreeCopy) -> Result<(), RepositoryError> {
    for room in &copy.rooms {
        insert_room(conn, room).await?;
    }
    for item in &copy.items {
        insert_item(conn, item).await?;
    }
    Ok(())
}
