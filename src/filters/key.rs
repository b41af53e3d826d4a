//! Canonical cache keys for filter/sort/page-size combinations.
//!
//! The key is a query-string-like rendering of the state: unset fields are
//! omitted, sets are joined in sorted order and values are percent-encoded, so
//! the same logical state always renders the same string.

use super::{FilterState, Range, SearchType, SortKey};
use std::fmt;

/// Cache key for one page of results.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key for a continuation page reached through `cursor`. The cursor is
    /// percent-encoded so a token containing `&` or `=` cannot collide with
    /// another key.
    pub fn with_cursor(&self, cursor: &str) -> Self {
        Self(format!("{}&cursor={}", self.0, urlencoding::encode(cursor)))
    }

    /// Key for a search layered on top of this filter key.
    pub fn for_search(&self, search_type: SearchType, term: &str) -> Self {
        Self(format!(
            "{}&{}={}",
            self.0,
            search_type.param(),
            urlencoding::encode(term.trim())
        ))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

/// Build the base cache key for `filters`, `sort` and `page_size`.
pub fn build_key(filters: &FilterState, sort: SortKey, page_size: u32) -> CacheKey {
    let mut parts: Vec<String> = Vec::with_capacity(12);

    push_set(&mut parts, "brands", filters.brands.iter());
    push_set(&mut parts, "types", filters.item_types.iter());
    push_range(&mut parts, "price", &filters.price);
    push_range(&mut parts, "weight", &filters.weight);
    push_range(&mut parts, "length", &filters.length);
    push_range(&mut parts, "width", &filters.width);
    push_range(&mut parts, "height", &filters.height);

    if let Some(days) = filters.new_within_days {
        parts.push(format!("new={days}"));
    }
    if let Some(days) = filters.updated_within_days {
        parts.push(format!("updated={days}"));
    }
    if filters.in_stock_only {
        parts.push("in_stock=1".to_owned());
    }

    parts.push(format!("sort={sort}"));
    parts.push(format!("limit={page_size}"));

    CacheKey(parts.join("&"))
}

fn push_set<'a>(parts: &mut Vec<String>, name: &str, values: impl Iterator<Item = &'a String>) {
    let joined = values
        .map(|v| urlencoding::encode(v).into_owned())
        .collect::<Vec<_>>()
        .join(",");
    if !joined.is_empty() {
        parts.push(format!("{name}={joined}"));
    }
}

fn push_range(parts: &mut Vec<String>, name: &str, range: &Range) {
    let range = Range::new(range.min, range.max);
    if !range.is_set() {
        return;
    }
    let bound = |b: Option<f64>| b.map(|v| v.to_string()).unwrap_or_default();
    parts.push(format!("{name}={}..{}", bound(range.min), bound(range.max)));
}
