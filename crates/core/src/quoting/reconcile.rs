//! Measurement reconciliation.
//!
//! Diffs a measurement sheet against a quote's rooms and items and proposes
//! edits for a person to review. Matching is greedy: within a room the first
//! unclaimed item whose product name equals the window type, or whose category
//! equals the inferred category, is paired with the measurement, and each quote
//! item is claimed at most once per pass. This is not an optimal assignment;
//! several same-category items in one room pair up in listing order.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::measure::{MeasureItem, MeasureSheet, MeasureSheetId};
use crate::domain::product::{infer_category, ProductCategory};
use crate::domain::quote::{QuoteItem, QuoteItemId, QuoteTree};

/// Default per-axis tolerance in millimetres.
pub const DEFAULT_TOLERANCE_MM: i64 = 5;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDiff {
    pub field: String,
    pub old_value: Option<Decimal>,
    pub new_value: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomDraft {
    pub name: String,
}

/// Provisional quote item built from a measurement row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemDraft {
    pub room_name: String,
    pub category: ProductCategory,
    pub product_name: String,
    pub unit: Option<String>,
    pub unit_price: Decimal,
    pub quantity: Decimal,
    pub width: Decimal,
    pub height: Decimal,
    pub attributes: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPatch {
    pub item_id: QuoteItemId,
    pub width: Decimal,
    pub height: Decimal,
}

/// A reviewable edit. Serialized with a `type` tag of `CREATE_ROOM`,
/// `CREATE_ITEM` or `UPDATE_ITEM` so the list can round-trip through a UI.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportAction {
    CreateRoom { description: String, data: RoomDraft, measure_item: MeasureItem },
    CreateItem { description: String, data: ItemDraft, measure_item: MeasureItem },
    UpdateItem {
        description: String,
        data: ItemPatch,
        measure_item: MeasureItem,
        diff: Vec<FieldDiff>,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
    pub ignored: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImportPreview {
    pub sheet_id: MeasureSheetId,
    pub actions: Vec<ImportAction>,
    pub summary: ImportSummary,
}

/// Result of applying a reviewed action list. `count` covers rooms and items
/// created plus items whose dimensions were written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub success: bool,
    pub count: u64,
}

/// Proposes the edits that would bring `tree` in line with `sheet`. Pure.
pub fn preview_import(
    tree: &QuoteTree,
    sheet: &MeasureSheet,
    tolerance: Decimal,
) -> ImportPreview {
    let mut rooms: HashMap<&str, Vec<&QuoteItem>> = HashMap::with_capacity(tree.rooms.len());
    for room in &tree.rooms {
        rooms.entry(room.name.as_str()).or_default().extend(tree.items_in_room(&room.id));
    }

    let mut claimed: HashSet<&QuoteItemId> = HashSet::new();
    let mut actions = Vec::new();
    let mut summary = ImportSummary::default();

    for measured in &sheet.items {
        let category = infer_category(&measured.window_type);
        let Some(candidates) = rooms.get(measured.room_name.as_str()) else {
            actions.push(ImportAction::CreateRoom {
                description: format!("Create room \"{}\"", measured.room_name),
                data: RoomDraft { name: measured.room_name.clone() },
                measure_item: measured.clone(),
            });
            actions.push(create_item(measured, category, "new room"));
            rooms.insert(measured.room_name.as_str(), Vec::new());
            summary.created += 1;
            continue;
        };

        let matched = candidates.iter().copied().find(|item| {
            !claimed.contains(&item.id)
                && (item.product_name == measured.window_type || item.category == category)
        });

        match matched {
            Some(item) => {
                claimed.insert(&item.id);
                let diff = dimension_diff(item, measured, tolerance);
                if diff.is_empty() {
                    summary.ignored += 1;
                    continue;
                }
                actions.push(ImportAction::UpdateItem {
                    description: describe_update(item, measured, &diff),
                    data: ItemPatch {
                        item_id: item.id.clone(),
                        width: measured.width,
                        height: measured.height,
                    },
                    measure_item: measured.clone(),
                    diff,
                });
                summary.updated += 1;
            }
            None => {
                actions.push(create_item(measured, category, "existing room"));
                summary.created += 1;
            }
        }
    }

    ImportPreview { sheet_id: sheet.id.clone(), actions, summary }
}

/// Width/height differences beyond `tolerance`. A missing quote dimension
/// always differs.
pub fn dimension_diff(
    item: &QuoteItem,
    measured: &MeasureItem,
    tolerance: Decimal,
) -> Vec<FieldDiff> {
    [("width", item.width, measured.width), ("height", item.height, measured.height)]
        .into_iter()
        .filter(|(_, current, new_value)| match current {
            Some(current) => (*new_value - *current).abs() > tolerance,
            None => true,
        })
        .map(|(field, old_value, new_value)| FieldDiff {
            field: field.to_string(),
            old_value,
            new_value,
        })
        .collect()
}

fn create_item(measured: &MeasureItem, category: ProductCategory, target: &str) -> ImportAction {
    ImportAction::CreateItem {
        description: format!(
            "Add {} {}x{} to {} \"{}\"",
            measured.window_type, measured.width, measured.height, target, measured.room_name
        ),
        data: ItemDraft {
            room_name: measured.room_name.clone(),
            category,
            product_name: measured.window_type.clone(),
            unit: Some("m".to_string()),
            unit_price: Decimal::ZERO,
            quantity: Decimal::ONE,
            width: measured.width,
            height: measured.height,
            attributes: measured.provenance(),
        },
        measure_item: measured.clone(),
    }
}

fn describe_update(item: &QuoteItem, measured: &MeasureItem, diff: &[FieldDiff]) -> String {
    let changes: Vec<String> = diff
        .iter()
        .map(|change| match change.old_value {
            Some(old) => format!("{} {} -> {}", change.field, old, change.new_value),
            None => format!("{} unset -> {}", change.field, change.new_value),
        })
        .collect();
    format!("Update {} in \"{}\": {}", item.product_name, measured.room_name, changes.join(", "))
}

/// Actions grouped in execution order: rooms, then new items, then updates.
/// Room drafts are de-duplicated by name so a replayed list creates each room once.
#[derive(Debug, Default, PartialEq)]
pub struct ImportBatch<'a> {
    pub rooms: Vec<&'a RoomDraft>,
    pub items: Vec<&'a ItemDraft>,
    pub updates: Vec<&'a ItemPatch>,
}

pub fn batch_actions(actions: &[ImportAction]) -> ImportBatch<'_> {
    let mut batch = ImportBatch::default();
    let mut room_names: HashSet<&str> = HashSet::new();
    for action in actions {
        match action {
            ImportAction::CreateRoom { data, .. } => {
                if room_names.insert(data.name.as_str()) {
                    batch.rooms.push(data);
                }
            }
            ImportAction::CreateItem { data, .. } => batch.items.push(data),
            ImportAction::UpdateItem { data, .. } => batch.updates.push(data),
        }
    }
    batch
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::domain::measure::{
        MeasureItem, MeasureItemId, MeasureSheet, MeasureSheetId, MeasureTaskId,
    };
    use crate::domain::product::ProductCategory;
    use crate::domain::quote::{
        CustomerId, Quote, QuoteId, QuoteItem, QuoteItemId, QuoteRoom, QuoteRoomId, QuoteStatus,
        QuoteTree, TenantId, UserId,
    };

    use super::{
        batch_actions, preview_import, ImportAction, ImportSummary, DEFAULT_TOLERANCE_MM,
    };

    fn tolerance() -> Decimal {
        Decimal::from(DEFAULT_TOLERANCE_MM)
    }

    fn tree(rooms: &[(&str, &str)], items: Vec<QuoteItem>) -> QuoteTree {
        let now = Utc::now();
        QuoteTree {
            quote: Quote {
                id: QuoteId("Q-1".to_string()),
                tenant_id: TenantId("t-1".to_string()),
                customer_id: CustomerId("c-1".to_string()),
                quote_no: "QT1".to_string(),
                version: 1,
                status: QuoteStatus::Draft,
                is_active: true,
                parent_quote_id: None,
                root_quote_id: None,
                title: None,
                total_amount: Decimal::ZERO,
                discount_rate: None,
                discount_amount: Decimal::ZERO,
                final_amount: Decimal::ZERO,
                valid_until: None,
                notes: None,
                created_by: UserId("u-1".to_string()),
                created_at: now,
                updated_at: now,
            },
            rooms: rooms
                .iter()
                .map(|(id, name)| QuoteRoom {
                    id: QuoteRoomId(id.to_string()),
                    tenant_id: TenantId("t-1".to_string()),
                    quote_id: QuoteId("Q-1".to_string()),
                    name: name.to_string(),
                    measure_room_id: None,
                    sort_order: 0,
                    created_at: now,
                    updated_at: now,
                })
                .collect(),
            items,
        }
    }

    fn quote_item(id: &str, room: &str, name: &str, width: i64, height: i64) -> QuoteItem {
        let now = Utc::now();
        QuoteItem {
            id: QuoteItemId(id.to_string()),
            tenant_id: TenantId("t-1".to_string()),
            quote_id: QuoteId("Q-1".to_string()),
            room_id: Some(QuoteRoomId(room.to_string())),
            parent_id: None,
            category: ProductCategory::Wallpaper,
            product_id: None,
            product_name: name.to_string(),
            unit: Some("m".to_string()),
            unit_price: Decimal::new(8800, 2),
            quantity: Decimal::ONE,
            width: Some(Decimal::from(width)),
            height: Some(Decimal::from(height)),
            subtotal: Decimal::new(8800, 2),
            attributes: serde_json::json!({}),
            sort_order: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn measured(id: &str, room: &str, window_type: &str, width: i64, height: i64) -> MeasureItem {
        MeasureItem {
            id: MeasureItemId(id.to_string()),
            room_name: room.to_string(),
            window_type: window_type.to_string(),
            width: Decimal::from(width),
            height: Decimal::from(height),
            install_type: None,
            bracket_dist: None,
            wall_material: None,
            has_box: false,
            box_depth: None,
            is_electric: false,
            remark: None,
        }
    }

    fn sheet(items: Vec<MeasureItem>) -> MeasureSheet {
        MeasureSheet {
            id: MeasureSheetId("S-1".to_string()),
            tenant_id: TenantId("t-1".to_string()),
            task_id: MeasureTaskId("T-1".to_string()),
            round: 1,
            variant: "A".to_string(),
            created_at: Utc::now(),
            items,
        }
    }

    #[test]
    fn difference_of_exactly_tolerance_is_ignored() {
        let tree =
            tree(&[("R-1", "Living room")], vec![quote_item("I-1", "R-1", "STRAIGHT", 3000, 2500)]);
        let sheet = sheet(vec![measured("M-1", "Living room", "STRAIGHT", 3005, 2495)]);
        let preview = preview_import(&tree, &sheet, tolerance());

        assert!(preview.actions.is_empty());
        assert_eq!(preview.summary, ImportSummary { created: 0, updated: 0, ignored: 1 });
    }

    #[test]
    fn difference_beyond_tolerance_emits_width_diff() {
        let tree =
            tree(&[("R-1", "Living room")], vec![quote_item("I-1", "R-1", "STRAIGHT", 3000, 2500)]);
        let sheet = sheet(vec![measured("M-1", "Living room", "STRAIGHT", 3006, 2500)]);
        let preview = preview_import(&tree, &sheet, tolerance());

        assert_eq!(preview.summary, ImportSummary { created: 0, updated: 1, ignored: 0 });
        match &preview.actions[..] {
            [ImportAction::UpdateItem { data, diff, .. }] => {
                assert_eq!(data.item_id.0, "I-1");
                assert_eq!(diff.len(), 1);
                assert_eq!(diff[0].field, "width");
                assert_eq!(diff[0].old_value, Some(Decimal::from(3000)));
                assert_eq!(diff[0].new_value, Decimal::from(3006));
            }
            other => panic!("expected a single update, got {other:?}"),
        }
    }

    #[test]
    fn new_room_is_created_once_for_several_measurements() {
        let tree = tree(&[], vec![]);
        let preview = preview_import(
            &tree,
            &sheet(vec![
                measured("M-1", "Bedroom", "STRAIGHT", 1800, 2400),
                measured("M-2", "Bedroom", "L_SHAPE", 2200, 2400),
            ]),
            tolerance(),
        );

        let kinds: Vec<&str> = preview
            .actions
            .iter()
            .map(|action| match action {
                ImportAction::CreateRoom { .. } => "room",
                ImportAction::CreateItem { .. } => "item",
                ImportAction::UpdateItem { .. } => "update",
            })
            .collect();
        assert_eq!(kinds, vec!["room", "item", "item"]);
        assert_eq!(preview.summary, ImportSummary { created: 2, updated: 0, ignored: 0 });
    }

    #[test]
    fn each_quote_item_matches_at_most_once() {
        let tree =
            tree(&[("R-1", "Study")], vec![quote_item("I-1", "R-1", "STRAIGHT", 1500, 1200)]);
        let preview = preview_import(
            &tree,
            &sheet(vec![
                measured("M-1", "Study", "STRAIGHT", 1500, 1200),
                measured("M-2", "Study", "STRAIGHT", 1500, 1200),
            ]),
            tolerance(),
        );

        assert_eq!(preview.summary, ImportSummary { created: 1, updated: 0, ignored: 1 });
        assert!(matches!(
            &preview.actions[..],
            [ImportAction::CreateItem { data, measure_item, .. }]
                if data.room_name == "Study" && measure_item.id.0 == "M-2"
        ));
    }

    #[test]
    fn category_match_pairs_when_names_differ() {
        let mut item = quote_item("I-1", "R-1", "Blackout linen", 2000, 2600);
        item.category = ProductCategory::CurtainFabric;
        let tree = tree(&[("R-1", "Living room")], vec![item]);
        let sheet = sheet(vec![measured("M-1", "Living room", "U_SHAPE", 2100, 2600)]);
        let preview = preview_import(&tree, &sheet, tolerance());

        assert_eq!(preview.summary.updated, 1);
    }

    #[test]
    fn missing_dimension_always_differs() {
        let mut item = quote_item("I-1", "R-1", "STRAIGHT", 0, 2500);
        item.width = None;
        let tree = tree(&[("R-1", "Living room")], vec![item]);
        let sheet = sheet(vec![measured("M-1", "Living room", "STRAIGHT", 3000, 2500)]);
        let preview = preview_import(&tree, &sheet, tolerance());

        match &preview.actions[..] {
            [ImportAction::UpdateItem { diff, .. }] => {
                assert_eq!(diff.len(), 1);
                assert_eq!(diff[0].old_value, None);
            }
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn actions_serialize_with_type_tag() {
        let preview = preview_import(
            &tree(&[], vec![]),
            &sheet(vec![measured("M-1", "Kitchen", "ARC", 900, 1100)]),
            tolerance(),
        );
        let json = serde_json::to_value(&preview.actions).expect("serialize actions");
        assert_eq!(json[0]["type"], "CREATE_ROOM");
        assert_eq!(json[1]["type"], "CREATE_ITEM");
        assert_eq!(json[1]["data"]["category"], "CURTAIN_FABRIC");
        assert_eq!(json[1]["data"]["width"], "900");

        let back: Vec<ImportAction> = serde_json::from_value(json).expect("deserialize actions");
        assert_eq!(back, preview.actions);
    }

    #[test]
    fn batch_orders_and_dedupes_rooms() {
        let preview = preview_import(
            &tree(&[], vec![]),
            &sheet(vec![measured("M-1", "Kitchen", "ARC", 900, 1100)]),
            tolerance(),
        );
        let mut replayed = preview.actions.clone();
        replayed.extend(preview.actions.clone());

        let batch = batch_actions(&replayed);
        assert_eq!(batch.rooms.len(), 1);
        assert_eq!(batch.items.len(), 2);
        assert!(batch.updates.is_empty());
    }
}
