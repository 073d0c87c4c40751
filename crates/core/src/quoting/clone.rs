use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::domain::quote::{
    QuoteId, QuoteItem, QuoteItemId, QuoteRoom, QuoteRoomId, QuoteTree, TenantId,
};

/// Rows produced by copying a quote's room/item tree under a new owner.
///
/// `items` is ordered so that every item appears after the item its
/// `parent_id` points at; inserting in order never dangles a reference.
#[derive(Clone, Debug, PartialEq)]
pub struct TreeCopy {
    pub rooms: Vec<QuoteRoom>,
    pub items: Vec<QuoteItem>,
    pub room_ids: HashMap<QuoteRoomId, QuoteRoomId>,
    pub item_ids: HashMap<QuoteItemId, QuoteItemId>,
}

/// Source items ordered parents-first. Roots come first in their original
/// order, then each following level. Items whose parent never appears (points
/// outside the quote, or sits on a cycle) trail at the end in original order.
pub fn parent_first_order(items: &[QuoteItem]) -> Vec<&QuoteItem> {
    let known: HashSet<&QuoteItemId> = items.iter().map(|item| &item.id).collect();
    let mut placed: HashSet<&QuoteItemId> = HashSet::with_capacity(items.len());
    let mut ordered = Vec::with_capacity(items.len());

    let mut level: Vec<&QuoteItem> = items
        .iter()
        .filter(|item| item.parent_id.as_ref().map_or(true, |parent| !known.contains(parent)))
        .collect();

    while !level.is_empty() {
        for item in &level {
            placed.insert(&item.id);
        }
        ordered.extend(level.iter().copied());
        level = items
            .iter()
            .filter(|item| !placed.contains(&item.id))
            .filter(|item| item.parent_id.as_ref().is_some_and(|parent| placed.contains(parent)))
            .collect();
    }

    ordered.extend(items.iter().filter(|item| !placed.contains(&item.id)));
    ordered
}

/// Copies `source`'s rooms and items into `target_quote` with fresh ids.
///
/// Room and parent references are remapped through the ids assigned so far;
/// a reference with no mapping becomes `None`. Money fields are carried as
/// `Decimal` values, never through floating point.
pub fn plan_tree_copy(
    source: &QuoteTree,
    target_quote: &QuoteId,
    tenant_id: &TenantId,
    now: DateTime<Utc>,
) -> TreeCopy {
    let mut room_ids = HashMap::with_capacity(source.rooms.len());
    let rooms = source
        .rooms
        .iter()
        .map(|room| {
            let id = QuoteRoomId::generate();
            room_ids.insert(room.id.clone(), id.clone());
            QuoteRoom {
                id,
                tenant_id: tenant_id.clone(),
                quote_id: target_quote.clone(),
                name: room.name.clone(),
                measure_room_id: room.measure_room_id.clone(),
                sort_order: room.sort_order,
                created_at: now,
                updated_at: now,
            }
        })
        .collect();

    let mut item_ids: HashMap<QuoteItemId, QuoteItemId> =
        HashMap::with_capacity(source.items.len());
    let mut items = Vec::with_capacity(source.items.len());
    for item in parent_first_order(&source.items) {
        let id = QuoteItemId::generate();
        let copied = QuoteItem {
            id: id.clone(),
            tenant_id: tenant_id.clone(),
            quote_id: target_quote.clone(),
            room_id: item.room_id.as_ref().and_then(|room| room_ids.get(room).cloned()),
            parent_id: item.parent_id.as_ref().and_then(|parent| item_ids.get(parent).cloned()),
            category: item.category,
            product_id: item.product_id.clone(),
            product_name: item.product_name.clone(),
            unit: item.unit.clone(),
            unit_price: item.unit_price,
            quantity: item.quantity,
            width: item.width,
            height: item.height,
            subtotal: item.subtotal,
            attributes: item.attributes.clone(),
            sort_order: item.sort_order,
            created_at: now,
            updated_at: now,
        };
        item_ids.insert(item.id.clone(), id);
        items.push(copied);
    }

    TreeCopy { rooms, items, room_ids, item_ids }
}
