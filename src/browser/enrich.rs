//! Best-effort detail enrichment for items already on screen.
//!
//! Failures never reach the caller: a batch that fails is logged and skipped,
//! and the primary results stay exactly as they were.

use crate::catalog::{CatalogApi, Item, ItemId};
use futures::future::join_all;
use std::collections::HashMap;
use tracing::debug;

/// Upper bound on ids per detail request.
pub const DETAIL_BATCH: usize = 50;

/// Fetch detail records for `ids`, batching requests concurrently.
pub async fn fetch_details(api: &dyn CatalogApi, ids: &[ItemId]) -> Vec<Item> {
    let batches = ids.chunks(DETAIL_BATCH).map(|batch| async move {
        match api.item_details(batch).await {
            Ok(details) => details,
            Err(e) => {
                debug!(error = %e, batch = batch.len(), "item detail enrichment failed, skipping");
                Vec::new()
            }
        }
    });
    join_all(batches).await.into_iter().flatten().collect()
}

/// Overlay `details` onto matching items in place. Returns how many items
/// were updated; details for ids not present are ignored.
pub fn apply_details(items: &mut [Item], details: Vec<Item>) -> usize {
    let by_id: HashMap<ItemId, Item> = details
        .into_iter()
        .map(|detail| (detail.id().clone(), detail))
        .collect();

    let mut updated = 0;
    for item in items.iter_mut() {
        if let Some(detail) = by_id.get(item.id()) {
            item.absorb(detail);
            updated += 1;
        }
    }
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_matching_items_are_updated() {
        let mut items = vec![Item::named("1", "Pipe"), Item::named("2", "Grips")];
        let details = vec![
            Item::from_value(json!({"id": "2", "image": "grips.jpg"})).unwrap(),
            Item::from_value(json!({"id": "9", "image": "other.jpg"})).unwrap(),
        ];

        assert_eq!(apply_details(&mut items, details), 1);
        assert_eq!(items[0].field("image"), None);
        assert_eq!(items[1].field("image"), Some(&json!("grips.jpg")));
        assert_eq!(items[1].name(), Some("Grips"));
    }
}
