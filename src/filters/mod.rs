//! Filter and sort state for catalog browsing.
//!
//! [`FilterState`] is an immutable value: every change produces a new value,
//! and the browser resets its accumulated results whenever the value changes.
//! Brand and item-type selections are kept in `BTreeSet`s so that structurally
//! equal states always iterate (and therefore serialize) in the same order.

pub mod key;

pub use key::{CacheKey, build_key};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Storefront default for the "in stock only" toggle.
///
/// Applied by [`FilterState::default`] and therefore by "clear all filters".
pub const DEFAULT_IN_STOCK_ONLY: bool = true;

/// An optional numeric range. Either bound may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Range {
    /// Non-finite bounds are dropped and `-0.0` becomes `0.0`, so equal
    /// ranges always render the same key.
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            min: clean_bound(min),
            max: clean_bound(max),
        }
    }

    pub const fn unbounded() -> Self {
        Self {
            min: None,
            max: None,
        }
    }

    /// True when at least one bound is set.
    pub fn is_set(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }

    /// Bounds in ascending order. A range entered backwards (min > max) is
    /// swapped rather than rejected.
    pub fn ordered(&self) -> (Option<f64>, Option<f64>) {
        match (self.min, self.max) {
            (Some(lo), Some(hi)) if lo > hi => (Some(hi), Some(lo)),
            bounds => bounds,
        }
    }
}

fn clean_bound(bound: Option<f64>) -> Option<f64> {
    bound
        .filter(|v| v.is_finite())
        .map(|v| if v == 0.0 { 0.0 } else { v })
}

/// Result ordering understood by the upstream catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    NameAsc,
    NameDesc,
    Newest,
    Oldest,
    RecentlyUpdated,
}

impl SortKey {
    /// Wire value used in both the upstream query and the cache key.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NameAsc => "name_asc",
            Self::NameDesc => "name_desc",
            Self::Newest => "newest",
            Self::Oldest => "oldest",
            Self::RecentlyUpdated => "recently_updated",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "name_asc" => Ok(Self::NameAsc),
            "name_desc" => Ok(Self::NameDesc),
            "newest" => Ok(Self::Newest),
            "oldest" => Ok(Self::Oldest),
            "recently_updated" => Ok(Self::RecentlyUpdated),
            other => Err(format!("unknown sort key: {other}")),
        }
    }
}

/// Which field a free-text search targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    #[default]
    Name,
    Sku,
}

impl SearchType {
    /// Upstream query parameter carrying the search term.
    pub fn param(self) -> &'static str {
        match self {
            Self::Name => "search",
            Self::Sku => "sku",
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Name => "name",
            Self::Sku => "sku",
        })
    }
}

/// The complete set of narrowing criteria selected by the shopper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    pub brands: BTreeSet<String>,
    pub item_types: BTreeSet<String>,
    pub price: Range,
    pub weight: Range,
    pub length: Range,
    pub width: Range,
    pub height: Range,
    /// Only items created within this many days.
    pub new_within_days: Option<u32>,
    /// Only items updated within this many days.
    pub updated_within_days: Option<u32>,
    pub in_stock_only: bool,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            brands: BTreeSet::new(),
            item_types: BTreeSet::new(),
            price: Range::unbounded(),
            weight: Range::unbounded(),
            length: Range::unbounded(),
            width: Range::unbounded(),
            height: Range::unbounded(),
            new_within_days: None,
            updated_within_days: None,
            in_stock_only: DEFAULT_IN_STOCK_ONLY,
        }
    }
}

impl FilterState {
    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        let brand = brand.into();
        let brand = brand.trim();
        if !brand.is_empty() {
            self.brands.insert(brand.to_owned());
        }
        self
    }

    pub fn with_item_type(mut self, item_type: impl Into<String>) -> Self {
        let item_type = item_type.into();
        let item_type = item_type.trim();
        if !item_type.is_empty() {
            self.item_types.insert(item_type.to_owned());
        }
        self
    }

    pub fn with_price(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.price = Range::new(min, max);
        self
    }

    pub fn with_weight(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.weight = Range::new(min, max);
        self
    }

    pub fn with_dimensions(mut self, length: Range, width: Range, height: Range) -> Self {
        self.length = Range::new(length.min, length.max);
        self.width = Range::new(width.min, width.max);
        self.height = Range::new(height.min, height.max);
        self
    }

    pub fn with_new_within_days(mut self, days: Option<u32>) -> Self {
        self.new_within_days = days.filter(|&d| d > 0);
        self
    }

    pub fn with_updated_within_days(mut self, days: Option<u32>) -> Self {
        self.updated_within_days = days.filter(|&d| d > 0);
        self
    }

    pub fn with_in_stock_only(mut self, in_stock_only: bool) -> Self {
        self.in_stock_only = in_stock_only;
        self
    }

    /// True when nothing but defaults is selected.
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}
