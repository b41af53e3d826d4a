//! Append-and-deduplicate for accumulated result lists.

use crate::catalog::{Item, ItemId};
use std::collections::HashSet;

/// Append `incoming` to `previous`, dropping any item whose id has already
/// been seen. The first occurrence wins, so items already on screen keep
/// their position. Linear in the combined length.
pub fn merge(previous: Vec<Item>, incoming: Vec<Item>) -> Vec<Item> {
    let mut merged = previous;
    merged.reserve(incoming.len());
    merge_counted(&mut merged, incoming);
    merged
}

/// Remove duplicates within a single list, keeping first occurrences.
pub fn dedup(items: Vec<Item>) -> Vec<Item> {
    let mut out = Vec::with_capacity(items.len());
    merge_counted(&mut out, items);
    out
}

/// In-place variant of [`merge`]. Returns the number of items added.
pub fn merge_counted(list: &mut Vec<Item>, incoming: Vec<Item>) -> usize {
    let mut seen: HashSet<ItemId> = list.iter().map(|item| item.id().clone()).collect();
    let before = list.len();
    list.extend(
        incoming
            .into_iter()
            .filter(|item| seen.insert(item.id().clone())),
    );
    list.len() - before
}
