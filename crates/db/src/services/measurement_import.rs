use std::collections::HashMap;

use chrono::Utc;
use tracing::{info, warn};

use slideboard_core::domain::measure::{MeasureSheet, MeasureSheetId, MeasureTaskId};
use slideboard_core::domain::quote::{
    QuoteId, QuoteItem, QuoteItemId, QuoteRoom, QuoteRoomId, TenantId,
};
use slideboard_core::errors::{ApplicationError, DomainError};
use slideboard_core::money::line_subtotal;
use slideboard_core::quoting::reconcile::{
    batch_actions, preview_import, ImportAction, ImportOutcome, ImportPreview,
};

use super::{acquire, begin, commit, recompute_totals_in, require_quote, QuoteEngine};
use crate::repositories::measure::{fetch_latest_sheet, fetch_sheet};
use crate::repositories::quote::{
    fetch_rooms, fetch_tree, insert_item, insert_room, next_item_sort_order,
    next_room_sort_order, update_item_dimensions,
};

impl QuoteEngine {
    /// Diffs the task's most recent measurement sheet against the quote. No writes.
    pub async fn preview_measurement_import(
        &self,
        quote_id: &QuoteId,
        task_id: &MeasureTaskId,
        tenant_id: &TenantId,
    ) -> Result<ImportPreview, ApplicationError> {
        let mut conn = acquire(&self.pool).await?;
        let sheet = fetch_latest_sheet(&mut conn, tenant_id, task_id).await?.ok_or_else(|| {
            DomainError::NotFound { entity: "measurement sheet for task", id: task_id.0.clone() }
        })?;
        drop(conn);
        self.preview_against(quote_id, tenant_id, &sheet).await
    }

    /// Same as [`Self::preview_measurement_import`] against a designated sheet.
    pub async fn preview_measurement_import_from_sheet(
        &self,
        quote_id: &QuoteId,
        sheet_id: &MeasureSheetId,
        tenant_id: &TenantId,
    ) -> Result<ImportPreview, ApplicationError> {
        let mut conn = acquire(&self.pool).await?;
        let sheet = fetch_sheet(&mut conn, tenant_id, sheet_id).await?.ok_or_else(|| {
            DomainError::NotFound { entity: "measurement sheet", id: sheet_id.0.clone() }
        })?;
        drop(conn);
        self.preview_against(quote_id, tenant_id, &sheet).await
    }

    async fn preview_against(
        &self,
        quote_id: &QuoteId,
        tenant_id: &TenantId,
        sheet: &MeasureSheet,
    ) -> Result<ImportPreview, ApplicationError> {
        let mut conn = acquire(&self.pool).await?;
        let tree = fetch_tree(&mut conn, tenant_id, quote_id)
            .await?
            .ok_or_else(|| DomainError::quote_not_found(quote_id))?;

        let preview = preview_import(&tree, sheet, self.settings.measure_tolerance);
        info!(
            event_name = "quote.measure_import.previewed",
            tenant_id = %tenant_id.0,
            quote_id = %quote_id.0,
            sheet_id = %sheet.id.0,
            created = preview.summary.created,
            updated = preview.summary.updated,
            ignored = preview.summary.ignored,
            "measurement import previewed"
        );
        Ok(preview)
    }

    /// Applies a reviewed action list in one transaction: rooms first (by name,
    /// once each), then new items, then dimension updates, then totals.
    pub async fn execute_measurement_import(
        &self,
        quote_id: &QuoteId,
        actions: &[ImportAction],
        tenant_id: &TenantId,
    ) -> Result<ImportOutcome, ApplicationError> {
        let now = Utc::now();
        let mut tx = begin(&self.pool).await?;
        let quote = require_quote(&mut tx, tenant_id, quote_id).await?;

        let mut room_ids: HashMap<String, QuoteRoomId> = HashMap::new();
        for room in fetch_rooms(&mut tx, tenant_id, quote_id).await? {
            room_ids.entry(room.name).or_insert(room.id);
        }

        let batch = batch_actions(actions);
        let mut count: u64 = 0;

        let mut room_order = next_room_sort_order(&mut tx, tenant_id, quote_id).await?;
        for draft in batch.rooms {
            if room_ids.contains_key(&draft.name) {
                continue;
            }
            let room = QuoteRoom {
                id: QuoteRoomId::generate(),
                tenant_id: tenant_id.clone(),
                quote_id: quote_id.clone(),
                name: draft.name.clone(),
                measure_room_id: None,
                sort_order: room_order,
                created_at: now,
                updated_at: now,
            };
            insert_room(&mut tx, &room).await?;
            room_ids.insert(room.name, room.id);
            room_order += 1;
            count += 1;
        }

        let mut item_order = next_item_sort_order(&mut tx, tenant_id, quote_id).await?;
        for draft in batch.items {
            let Some(room_id) = room_ids.get(&draft.room_name) else {
                warn!(
                    event_name = "quote.measure_import.skipped_item",
                    tenant_id = %tenant_id.0,
                    quote_id = %quote_id.0,
                    room_name = %draft.room_name,
                    product_name = %draft.product_name,
                    "no room resolves for measured item; skipping"
                );
                continue;
            };
            let item = QuoteItem {
                id: QuoteItemId::generate(),
                tenant_id: tenant_id.clone(),
                quote_id: quote_id.clone(),
                room_id: Some(room_id.clone()),
                parent_id: None,
                category: draft.category,
                product_id: None,
                product_name: draft.product_name.clone(),
                unit: draft.unit.clone(),
                unit_price: draft.unit_price,
                quantity: draft.quantity,
                width: Some(draft.width),
                height: Some(draft.height),
                subtotal: line_subtotal(draft.unit_price, draft.quantity),
                attributes: draft.attributes.clone(),
                sort_order: item_order,
                created_at: now,
                updated_at: now,
            };
            insert_item(&mut tx, &item).await?;
            item_order += 1;
            count += 1;
        }

        for patch in batch.updates {
            count += update_item_dimensions(
                &mut tx,
                tenant_id,
                quote_id,
                &patch.item_id,
                patch.width,
                patch.height,
                now,
            )
            .await?;
        }

        let totals = recompute_totals_in(&mut tx, &quote, now).await?;
        commit(tx).await?;

        info!(
            event_name = "quote.measure_import.executed",
            tenant_id = %tenant_id.0,
            quote_id = %quote_id.0,
            actions = actions.len(),
            applied = count,
            total_amount = %totals.total_amount,
            "measurement import executed"
        );
        Ok(ImportOutcome { success: true, count })
    }
}
