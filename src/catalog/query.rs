//! Translation of filter state into the upstream query contract.

use crate::filters::{FilterState, Range, SearchType, SortKey};
use chrono::{DateTime, Days, Utc};

/// A fully specified request against the catalog items endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogQuery {
    pub filters: FilterState,
    pub sort: SortKey,
    pub page_size: u32,
    pub cursor: Option<String>,
    pub search: Option<(SearchType, String)>,
}

impl CatalogQuery {
    pub fn new(filters: FilterState, sort: SortKey, page_size: u32) -> Self {
        Self {
            filters,
            sort,
            page_size,
            cursor: None,
            search: None,
        }
    }

    pub fn with_cursor(mut self, cursor: Option<String>) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn with_search(mut self, search_type: SearchType, term: impl Into<String>) -> Self {
        self.search = Some((search_type, term.into()));
        self
    }

    /// Query parameters relative to `now` (used for the date windows).
    pub fn params_at(&self, now: DateTime<Utc>) -> Vec<(&'static str, String)> {
        let f = &self.filters;
        let mut params = vec![
            ("limit", self.page_size.to_string()),
            ("sort", self.sort.as_str().to_owned()),
        ];

        if !f.brands.is_empty() {
            params.push(("brands", join(f.brands.iter())));
        }
        if !f.item_types.is_empty() {
            params.push(("item_types", join(f.item_types.iter())));
        }

        push_range(&mut params, ("price_min", "price_max"), &f.price);
        push_range(&mut params, ("weight_min", "weight_max"), &f.weight);
        push_range(&mut params, ("length_min", "length_max"), &f.length);
        push_range(&mut params, ("width_min", "width_max"), &f.width);
        push_range(&mut params, ("height_min", "height_max"), &f.height);

        if let Some(date) = f.new_within_days.and_then(|d| days_before(now, d)) {
            params.push(("created_after", date));
        }
        if let Some(date) = f.updated_within_days.and_then(|d| days_before(now, d)) {
            params.push(("updated_after", date));
        }
        if f.in_stock_only {
            params.push(("in_stock", "true".to_owned()));
        }
        if let Some(cursor) = &self.cursor {
            params.push(("cursor", cursor.clone()));
        }
        if let Some((search_type, term)) = &self.search {
            params.push((search_type.param(), term.trim().to_owned()));
        }

        params
    }

    pub fn params(&self) -> Vec<(&'static str, String)> {
        self.params_at(Utc::now())
    }
}

fn join<'a>(values: impl Iterator<Item = &'a String>) -> String {
    values.map(String::as_str).collect::<Vec<_>>().join(",")
}

fn push_range(
    params: &mut Vec<(&'static str, String)>,
    (min_name, max_name): (&'static str, &'static str),
    range: &Range,
) {
    let (min, max) = range.ordered();
    if let Some(min) = min {
        params.push((min_name, min.to_string()));
    }
    if let Some(max) = max {
        params.push((max_name, max.to_string()));
    }
}

fn days_before(now: DateTime<Utc>, days: u32) -> Option<String> {
    now.checked_sub_days(Days::new(u64::from(days)))
        .map(|d| d.date_naive().format("%Y-%m-%d").to_string())
}
